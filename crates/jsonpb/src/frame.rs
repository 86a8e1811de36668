//! The parse stack: one entry per currently-open JSON container, carrying
//! enough protobuf context to resolve the next token without re-walking the
//! schema.
//!
//! Grounded on the `jsonparser_frame` struct in the original implementation
//! (`m`, `name_table`, `is_map`, `is_mapentry`) and on `parser/mod.rs`'s
//! `PathCtx`, which plays the same per-scope bookkeeping role for the
//! teacher's own value tree. Unlike the original, a frame here never holds
//! partial token bytes: the driver retains the whole input and re-scans a
//! token from its start byte whenever a chunk boundary lands inside it, so
//! there is no partial-name or partial-number state to carry between calls.

use prost_reflect::{FieldDescriptor, MapKey, MessageDescriptor};

use crate::schema::NameTable;

/// Where a JSON object scope (a message body, or a map's entry set)
/// currently is in its grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MemberState {
    /// Just opened, or just consumed a `,`: a `"` or a closing `}` is legal.
    BeforeKey,
    /// A member name was just closed: a `:` is expected next.
    AfterKey,
    /// A `:` was just consumed: a value is expected next.
    BeforeValue,
    /// A value was just closed: a `,` or `}` is expected next.
    AfterValue,
}

/// Where a JSON array scope currently is in its grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ElementState {
    /// Just opened, or just consumed a `,`: a value (or, only when no
    /// element has been seen yet, a closing `]`) is legal.
    BeforeValue,
    /// A value was just closed: a `,` or `]` is expected next.
    AfterValue,
}

/// One open message body: the root, a singular message field's value, one
/// element of a repeated message field, or the value half of a
/// message-valued map entry. Plain user messages only: `Struct`, `Value`,
/// and `ListValue` bodies are represented directly as [`MapScope`]/
/// [`ArrayScope`] instead (see `driver::begin_struct` and friends), since
/// their JSON grammar isn't the generic name-to-field one this scope models.
pub(crate) struct MessageScope<C> {
    pub cursor: C,
    pub table: NameTable,
    pub state: MemberState,
    /// The field a member name just resolved to, while its value is pending.
    pub pending_field: Option<FieldDescriptor>,
}

/// One open JSON array bound to a repeated, non-map field.
pub(crate) struct ArrayScope<C> {
    pub parent_cursor: C,
    pub field: FieldDescriptor,
    pub state: ElementState,
}

/// One open JSON object bound to a protobuf map field (not a message body:
/// maps have no [`MessageDescriptor`] of their own).
pub(crate) struct MapScope<C> {
    pub parent_cursor: C,
    pub map_field: FieldDescriptor,
    pub key_field: FieldDescriptor,
    pub value_field: FieldDescriptor,
    pub state: MemberState,
    /// Set once the current member's key text has been resolved into a
    /// [`MapKey`]; cleared once its value has been attached.
    pub pending_key: Option<MapKey>,
}

/// One level of parse-stack nesting.
pub(crate) enum Scope<C> {
    Message(MessageScope<C>),
    Array(ArrayScope<C>),
    Map(MapScope<C>),
}

/// A [`Scope`] plus any outer synthetic cursors that should be popped
/// immediately after it closes: used when a JSON container transparently
/// stands for a wrapping message the JSON spelling never names explicitly
/// (`Struct`'s `fields` map, `ListValue`'s `values` list, and `Value`'s
/// `struct_value`/`list_value` branches all wrap one or two such cursors).
pub(crate) struct StackEntry<C> {
    pub scope: Scope<C>,
    pub extra_close: Vec<C>,
}
