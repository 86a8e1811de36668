//! Error types for the streaming JSON-to-protobuf parser.

use thiserror::Error;

/// The latched, fatal error produced by a parse. Once set, the parser
/// continues to consume bytes (so callers can still learn how much input was
/// read) but emits no further sink events.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind} (at byte offset {offset})")]
pub struct ParserError {
    pub(crate) kind: ErrorKind,
    /// Absolute byte offset into the whole input stream where the error was
    /// detected.
    pub offset: usize,
}

impl ParserError {
    pub(crate) fn new(kind: ErrorKind, offset: usize) -> Self {
        Self { kind, offset }
    }

    /// The categorized error detail.
    #[must_use]
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }
}

/// The five error categories from the parser's failure-semantics contract:
/// structural JSON syntax errors, schema mismatches, out-of-range values,
/// resource limits, and internal invariant violations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ErrorKind {
    /// Malformed JSON syntax: unterminated string/escape, unexpected
    /// character, or trailing garbage at EOF.
    #[error("Parse error at '{snippet}'")]
    Syntax {
        /// A short excerpt of the offending input, for diagnostics.
        snippet: String,
    },

    /// A JSON member name does not match any field of the current message
    /// and `ignore_unknown` is not set.
    #[error("No such field: {name}")]
    UnknownField {
        /// The JSON member name that failed to resolve.
        name: String,
    },

    /// A JSON enum string does not match any value of the target enum.
    #[error("Unknown enum value: {name}")]
    UnknownEnumValue {
        /// The JSON string that failed to resolve to an enum value.
        name: String,
    },

    /// An unsupported map key field kind (only scalar types and strings are
    /// legal map keys in protobuf).
    #[error("Invalid field type for map key")]
    InvalidMapKeyType,

    /// The JSON value's shape doesn't match the field's cardinality or kind
    /// (e.g. a string where a bool was expected, an object for a scalar
    /// field, an array for a non-repeated field).
    #[error("Wrong JSON shape for field '{field}': {reason}")]
    SchemaMismatch {
        /// The field whose shape expectation was violated.
        field: String,
        /// A short, human-readable reason.
        reason: String,
    },

    /// A numeric literal could not be represented in the target field's
    /// range, or was not a valid number at all.
    #[error("error parsing number: {text}")]
    NumberRange {
        /// The literal text that failed to parse.
        text: String,
    },

    /// A `Duration` value was outside of `±315_576_000_000` seconds.
    #[error("error parsing duration: {reason}")]
    DurationRange {
        /// A short, human-readable reason.
        reason: String,
    },

    /// A `Timestamp` value was before `0001-01-01T00:00:00Z`, or otherwise
    /// failed to parse as RFC 3339.
    #[error("error parsing timestamp: {reason}")]
    TimestampRange {
        /// A short, human-readable reason.
        reason: String,
    },

    /// Base64 decoding failed: wrong length, non-base64 character, or
    /// misplaced padding.
    #[error("error parsing base64: {reason}")]
    InvalidBase64 {
        /// A short, human-readable reason.
        reason: String,
    },

    /// The parse stack exceeded the configured maximum nesting depth.
    #[error("Nesting too deep")]
    NestingTooDeep,

    /// An internal invariant was violated. These must never occur in
    /// correct builds; seeing one is a bug in the parser itself, not in the
    /// input.
    #[error("internal error: {reason}")]
    Internal {
        /// A short description of the violated invariant.
        reason: &'static str,
    },
}
