//! The sink contract the driver emits typed field events against.
//!
//! Grounded on `upb_sink`'s `startmsg`/`endmsg`/`startseq`/`putXXX` handler
//! set, adapted from upb's C-style output-parameter "handle" (an opaque
//! pointer into the sink's own frame stack) to a `Copy` cursor type the
//! trait leaves up to the implementation.

use prost_reflect::{FieldDescriptor, MapKey, MessageDescriptor};

/// A scalar value ready to be written onto one field. Messages and map
/// entries go through [`ProtoSink::push_message`] instead.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Bool(bool),
    String(String),
    Bytes(Vec<u8>),
    EnumNumber(i32),
}

/// A destination for the typed field events a parse produces.
///
/// The driver calls these in strict nesting order: every [`Self::push_message`]
/// is eventually matched by a [`Self::pop_message`] on the same cursor before
/// its parent is popped, and every cursor is used only between its push and
/// its pop. A sink backed by a single stack (as [`crate::dynamic_sink::DynamicMessageSink`]
/// is) can rely on that ordering instead of tracking parent links itself.
pub trait ProtoSink {
    /// An opaque handle identifying one in-progress message frame.
    type Cursor: Copy + std::fmt::Debug;

    /// Pushes the root message frame.
    fn begin(&mut self, message: &MessageDescriptor) -> Self::Cursor;

    /// Pushes a new message frame to serve as:
    /// - the value of a singular message field (`map_key: None`, not inside a repeated slot),
    /// - one element of a repeated message field (`map_key: None`),
    /// - or the value of one entry of a message-valued map field (`map_key: Some(_)`).
    fn push_message(
        &mut self,
        parent: Self::Cursor,
        field: &FieldDescriptor,
        map_key: Option<MapKey>,
    ) -> Self::Cursor;

    /// Finishes the message frame at `cursor` and attaches it to the parent
    /// field/slot it was pushed for.
    fn pop_message(&mut self, cursor: Self::Cursor);

    /// Sets a scalar, enum, string, or bytes value onto `field` of the
    /// message at `cursor`: a singular field, one element of a repeated
    /// scalar field, or one entry of a scalar-valued map field (keyed by
    /// `map_key`).
    fn put_scalar(
        &mut self,
        cursor: Self::Cursor,
        field: &FieldDescriptor,
        map_key: Option<MapKey>,
        value: ScalarValue,
    );
}
