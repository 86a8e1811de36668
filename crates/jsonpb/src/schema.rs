//! Schema binding: turns a [`prost_reflect::MessageDescriptor`] into the
//! name→field lookup tables the driver needs, built once up front so the hot
//! path never walks descriptor metadata linearly.
//!
//! Grounded on the reflective dispatch in the gRPC dynamic-message bridge
//! (`json_to_dynamic_message_with_depth` and friends), which resolves JSON
//! member names against `MessageDescriptor::fields()` on every object; here
//! that resolution is precomputed once per reachable message type instead of
//! repeated per member.

use std::collections::HashMap;

use prost_reflect::{FieldDescriptor, Kind, MessageDescriptor};

/// Maps both the JSON name (`lowerCamelCase`) and the raw proto field name
/// (`snake_case`) of every field of one message type to its descriptor,
/// kept separate so a lookup can choose whether to accept the proto
/// spelling.
#[derive(Debug, Clone, Default)]
pub(crate) struct NameTable {
    by_json_name: HashMap<String, FieldDescriptor>,
    by_proto_name: HashMap<String, FieldDescriptor>,
}

impl NameTable {
    fn build(message: &MessageDescriptor) -> Self {
        let mut by_json_name = HashMap::new();
        let mut by_proto_name = HashMap::new();
        for field in message.fields() {
            by_json_name.insert(field.json_name().to_owned(), field.clone());
            by_proto_name.insert(field.name().to_owned(), field);
        }
        Self {
            by_json_name,
            by_proto_name,
        }
    }

    /// Looks up a field by JSON member name, additionally accepting the raw
    /// proto (`snake_case`) spelling when `allow_proto_names` is set.
    pub(crate) fn get(&self, name: &str, allow_proto_names: bool) -> Option<&FieldDescriptor> {
        self.by_json_name
            .get(name)
            .or_else(|| if allow_proto_names { self.by_proto_name.get(name) } else { None })
    }
}

/// The complete set of field-lookup tables for a message type and every
/// message type reachable from it, built once at parser construction.
#[derive(Debug, Clone, Default)]
pub(crate) struct SchemaBinding {
    tables: HashMap<String, NameTable>,
}

impl SchemaBinding {
    /// Recursively walks every message type reachable from `root` (including
    /// through repeated/map fields and nested messages) and builds a name
    /// table for each. Cycles (a message that (transitively) contains
    /// itself) are handled by only visiting each full name once.
    pub(crate) fn new(root: &MessageDescriptor) -> Self {
        let mut tables = HashMap::new();
        let mut visited = std::collections::HashSet::new();
        Self::visit(root, &mut tables, &mut visited);
        tracing::debug!(
            root = %root.full_name(),
            message_types = tables.len(),
            "built schema bindings"
        );
        Self { tables }
    }

    fn visit(
        message: &MessageDescriptor,
        tables: &mut HashMap<String, NameTable>,
        visited: &mut std::collections::HashSet<String>,
    ) {
        let full_name = message.full_name().to_owned();
        if !visited.insert(full_name.clone()) {
            return;
        }
        tables.insert(full_name, NameTable::build(message));

        for field in message.fields() {
            if let Kind::Message(inner) = field.kind() {
                Self::visit(&inner, tables, visited);
            }
        }
    }

    /// Returns the name table for `message`, building one on demand if
    /// `message` wasn't reachable from the root at construction time (this
    /// can happen for a synthetic map-entry message or a type introduced via
    /// `google.protobuf.Any`, neither of which this parser resolves through
    /// reflection alone).
    pub(crate) fn table_for(&self, message: &MessageDescriptor) -> NameTable {
        self.tables
            .get(message.full_name())
            .cloned()
            .unwrap_or_else(|| NameTable::build(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost_reflect::DescriptorPool;

    fn test_pool() -> DescriptorPool {
        let bytes = include_bytes!(concat!(env!("OUT_DIR"), "/test_messages.bin"));
        DescriptorPool::decode(bytes.as_ref()).unwrap()
    }

    #[test]
    fn resolves_both_name_spellings() {
        let pool = test_pool();
        let scalars = pool.get_message_by_name("jsonpb.test.Scalars").unwrap();
        let binding = SchemaBinding::new(&scalars);
        let table = binding.table_for(&scalars);
        assert!(table.get("i32", true).is_some());
        assert!(table.get("rawBytes", true).is_none()); // not a real field
        assert!(table.get("raw", true).is_some());
        assert!(table.get("i32", false).is_some(), "i32 has no distinct json spelling");
    }

    #[test]
    fn walks_nested_messages() {
        let pool = test_pool();
        let with_nested = pool.get_message_by_name("jsonpb.test.WithNested").unwrap();
        let binding = SchemaBinding::new(&with_nested);
        let scalars = pool.get_message_by_name("jsonpb.test.Scalars").unwrap();
        let table = binding.table_for(&scalars);
        assert!(table.get("i64", true).is_some());
    }
}
