//! Recognition and synthetic-event handling for the well-known message
//! types: `Duration`, `Timestamp`, the nine `*Value` wrappers, and the
//! `Struct`/`Value`/`ListValue` JSON-document types.

pub(crate) mod duration;
pub(crate) mod timestamp;

/// Classification of a message type that gets special JSON treatment instead
/// of the generic field-by-field object mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WellKnown {
    Duration,
    Timestamp,
    Struct,
    Value,
    ListValue,
    DoubleValue,
    FloatValue,
    Int64Value,
    Uint64Value,
    Int32Value,
    Uint32Value,
    BoolValue,
    StringValue,
    BytesValue,
}

impl WellKnown {
    /// Recognizes a message's fully-qualified name as one of the well-known
    /// types, or returns `None` for an ordinary user message.
    pub(crate) fn from_full_name(name: &str) -> Option<Self> {
        Some(match name {
            "google.protobuf.Duration" => Self::Duration,
            "google.protobuf.Timestamp" => Self::Timestamp,
            "google.protobuf.Struct" => Self::Struct,
            "google.protobuf.Value" => Self::Value,
            "google.protobuf.ListValue" => Self::ListValue,
            "google.protobuf.DoubleValue" => Self::DoubleValue,
            "google.protobuf.FloatValue" => Self::FloatValue,
            "google.protobuf.Int64Value" => Self::Int64Value,
            "google.protobuf.UInt64Value" => Self::Uint64Value,
            "google.protobuf.Int32Value" => Self::Int32Value,
            "google.protobuf.UInt32Value" => Self::Uint32Value,
            "google.protobuf.BoolValue" => Self::BoolValue,
            "google.protobuf.StringValue" => Self::StringValue,
            "google.protobuf.BytesValue" => Self::BytesValue,
            _ => return None,
        })
    }

    /// Whether this is one of the nine scalar wrapper types, which unwrap
    /// transparently to/from their single `value` field.
    pub(crate) fn is_wrapper(self) -> bool {
        matches!(
            self,
            Self::DoubleValue
                | Self::FloatValue
                | Self::Int64Value
                | Self::Uint64Value
                | Self::Int32Value
                | Self::Uint32Value
                | Self::BoolValue
                | Self::StringValue
                | Self::BytesValue
        )
    }

}

#[cfg(test)]
mod tests {
    use super::WellKnown;

    #[test]
    fn recognizes_wrapper_types() {
        assert!(WellKnown::from_full_name("google.protobuf.Int32Value")
            .unwrap()
            .is_wrapper());
        assert!(!WellKnown::from_full_name("google.protobuf.Duration")
            .unwrap()
            .is_wrapper());
    }

    #[test]
    fn does_not_recognize_user_messages() {
        assert!(WellKnown::from_full_name("jsonpb.test.Scalars").is_none());
    }
}
