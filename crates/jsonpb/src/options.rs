//! Parser configuration.

/// Options controlling parse leniency and resource limits.
///
/// Constructed with [`ParserOptions::default`] and customized with the
/// builder-style `with_*` methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserOptions {
    /// When `true`, JSON object members that don't match any field of the
    /// target message are skipped (their value is still validated as
    /// well-formed JSON) instead of raising [`crate::ErrorKind::UnknownField`].
    pub ignore_unknown_fields: bool,

    /// When `true`, both the proto field name (`snake_case`) and the JSON
    /// name (`lowerCamelCase`) are accepted as member names. When `false`,
    /// only the JSON name is accepted, matching the canonical JSON mapping.
    pub accept_proto_field_names: bool,

    /// The maximum nesting depth (objects and arrays combined) the parser
    /// will follow before raising [`crate::ErrorKind::NestingTooDeep`].
    pub max_depth: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            ignore_unknown_fields: false,
            accept_proto_field_names: true,
            max_depth: 100,
        }
    }
}

impl ParserOptions {
    /// Sets [`Self::ignore_unknown_fields`].
    #[must_use]
    pub fn with_ignore_unknown_fields(mut self, value: bool) -> Self {
        self.ignore_unknown_fields = value;
        self
    }

    /// Sets [`Self::accept_proto_field_names`].
    #[must_use]
    pub fn with_accept_proto_field_names(mut self, value: bool) -> Self {
        self.accept_proto_field_names = value;
        self
    }

    /// Sets [`Self::max_depth`].
    #[must_use]
    pub fn with_max_depth(mut self, value: usize) -> Self {
        self.max_depth = value;
        self
    }
}
