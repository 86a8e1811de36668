//! The reference [`ProtoSink`] implementation: builds a
//! [`prost_reflect::DynamicMessage`] tree in memory.
//!
//! Grounded on `json_to_dynamic_message_with_depth` in the gRPC dynamic
//! bridge, which builds the same kind of tree by direct field assignment;
//! here the assignment is driven by sink events rather than by walking a
//! `serde_json::Value` directly.

use prost_reflect::{DynamicMessage, FieldDescriptor, MapKey, MessageDescriptor, Value};

use crate::sink::{ProtoSink, ScalarValue};

enum Attach {
    Root,
    Field {
        parent: usize,
        field: FieldDescriptor,
        map_key: Option<MapKey>,
    },
}

struct Frame {
    message: DynamicMessage,
    attach: Attach,
}

/// Builds a single [`DynamicMessage`] from a stream of sink events, then
/// hands it back to the caller via [`Self::into_message`].
pub struct DynamicMessageSink {
    frames: Vec<Option<Frame>>,
    root: Option<DynamicMessage>,
}

impl DynamicMessageSink {
    /// Creates an empty sink. Call [`ProtoSink::begin`] to start the parse.
    #[must_use]
    pub fn new() -> Self {
        Self {
            frames: Vec::new(),
            root: None,
        }
    }

    /// Consumes the sink, returning the message it built.
    ///
    /// # Panics
    /// Panics if the parse never completed (no matching `pop_message` for
    /// the root `begin`). A correctly driven parser never leaves the sink in
    /// this state.
    #[must_use]
    pub fn into_message(self) -> DynamicMessage {
        self.root.expect("sink was never finished")
    }
}

impl Default for DynamicMessageSink {
    fn default() -> Self {
        Self::new()
    }
}

fn scalar_to_value(value: ScalarValue) -> Value {
    match value {
        ScalarValue::I32(v) => Value::I32(v),
        ScalarValue::I64(v) => Value::I64(v),
        ScalarValue::U32(v) => Value::U32(v),
        ScalarValue::U64(v) => Value::U64(v),
        ScalarValue::F32(v) => Value::F32(v),
        ScalarValue::F64(v) => Value::F64(v),
        ScalarValue::Bool(v) => Value::Bool(v),
        ScalarValue::String(v) => Value::String(v),
        ScalarValue::Bytes(v) => Value::Bytes(v.into()),
        ScalarValue::EnumNumber(v) => Value::EnumNumber(v),
    }
}

fn attach_value(
    parent: &mut DynamicMessage,
    field: &FieldDescriptor,
    map_key: Option<MapKey>,
    value: Value,
) {
    if let Some(key) = map_key {
        let slot = parent.get_field_mut(field);
        if let Value::Map(map) = slot {
            map.insert(key, value);
        }
    } else if field.is_list() {
        let slot = parent.get_field_mut(field);
        if let Value::List(list) = slot {
            list.push(value);
        }
    } else {
        parent.set_field(field, value);
    }
}

impl ProtoSink for DynamicMessageSink {
    type Cursor = usize;

    fn begin(&mut self, message: &MessageDescriptor) -> Self::Cursor {
        self.frames.push(Some(Frame {
            message: DynamicMessage::new(message.clone()),
            attach: Attach::Root,
        }));
        self.frames.len() - 1
    }

    fn push_message(
        &mut self,
        parent: Self::Cursor,
        field: &FieldDescriptor,
        map_key: Option<MapKey>,
    ) -> Self::Cursor {
        let inner = match field.kind() {
            prost_reflect::Kind::Message(m) => m,
            _ => unreachable!("push_message called on a non-message field"),
        };
        self.frames.push(Some(Frame {
            message: DynamicMessage::new(inner),
            attach: Attach::Field {
                parent,
                field: field.clone(),
                map_key,
            },
        }));
        self.frames.len() - 1
    }

    fn pop_message(&mut self, cursor: Self::Cursor) {
        let frame = self.frames[cursor]
            .take()
            .expect("pop_message called twice on the same cursor");
        match frame.attach {
            Attach::Root => self.root = Some(frame.message),
            Attach::Field {
                parent,
                field,
                map_key,
            } => {
                let parent_msg = &mut self.frames[parent]
                    .as_mut()
                    .expect("parent frame popped before child")
                    .message;
                attach_value(parent_msg, &field, map_key, Value::Message(frame.message));
            }
        }
    }

    fn put_scalar(
        &mut self,
        cursor: Self::Cursor,
        field: &FieldDescriptor,
        map_key: Option<MapKey>,
        value: ScalarValue,
    ) {
        let frame = self.frames[cursor]
            .as_mut()
            .expect("put_scalar on a popped cursor");
        attach_value(&mut frame.message, field, map_key, scalar_to_value(value));
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
    fn builds_a_flat_message() {
        let pool = test_pool();
        let scalars = pool.get_message_by_name("jsonpb.test.Scalars").unwrap();
        let mut sink = DynamicMessageSink::new();
        let root = sink.begin(&scalars);
        let field = scalars.get_field_by_name("x").unwrap();
        sink.put_scalar(root, &field, None, ScalarValue::String("hi".to_owned()));
        sink.pop_message(root);
        let msg = sink.into_message();
        assert_eq!(
            msg.get_field(&field).as_ref(),
            &Value::String("hi".to_owned())
        );
    }
}
