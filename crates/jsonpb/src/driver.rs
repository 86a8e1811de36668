//! The incremental driver: an iterative state machine that turns bytes fed
//! in arbitrary chunks into [`ProtoSink`] events.
//!
//! Grounded on the dispatch-table design of the original C parser (one
//! `state` per stack frame, a `states[]` table of character handlers) and on
//! `parser/mod.rs`'s own stack-of-scopes loop, which plays the same role for
//! the teacher's value tree. Two deliberate departures from both:
//!
//! - No partial-token state ever needs to survive a `feed()` call. The whole
//!   input is retained in `pending`, and a token that runs off the end of the
//!   buffer is simply re-scanned from its start byte once more data arrives.
//!   This trades memory-boundedness for not having to hand-roll a resumable
//!   sub-state-machine for every lexical shape (string, number, literal).
//! - A value is only ever committed to the sink once it has been scanned to
//!   completion. Lookahead (`scan_string`, `scan_number`, `scan_literal`,
//!   `scan_scalar_token`) never calls the sink or advances `pos`; only the
//!   `begin_*` functions that consume a confirmed-complete token do both,
//!   atomically. This is what makes retrying a `NeedMoreData` result safe:
//!   nothing was pushed onto the sink before the retry.

use prost_reflect::{FieldDescriptor, Kind, MapKey, MessageDescriptor};

use crate::error::{ErrorKind, ParserError};
use crate::frame::{ArrayScope, ElementState, MapScope, MemberState, MessageScope, Scope, StackEntry};
use crate::numbers::{self, NumberValue};
use crate::options::ParserOptions;
use crate::schema::SchemaBinding;
use crate::sink::{ProtoSink, ScalarValue};
use crate::wellknown::{self, WellKnown};

/// How a value currently being parsed is attached to its destination: either
/// the sink's root frame, or one field (possibly one map entry) of an
/// already-open parent frame. Unifies the `sink.begin()` vs.
/// `sink.push_message()`/`put_scalar()` choice so the rest of the driver
/// never has to branch on "are we at the root".
#[derive(Clone)]
enum Attach<C> {
    Root,
    Field {
        parent: C,
        field: FieldDescriptor,
        map_key: Option<MapKey>,
    },
}

impl<C: Copy> Attach<C> {
    fn push_message<Sk: ProtoSink<Cursor = C>>(&self, sink: &mut Sk, desc: &MessageDescriptor) -> C {
        match self {
            Self::Root => sink.begin(desc),
            Self::Field { parent, field, map_key } => sink.push_message(*parent, field, map_key.clone()),
        }
    }

    fn put_scalar<Sk: ProtoSink<Cursor = C>>(&self, sink: &mut Sk, value: ScalarValue) {
        match self {
            Self::Root => unreachable!("the root value of a parse is always a message"),
            Self::Field { parent, field, map_key } => {
                sink.put_scalar(*parent, field, map_key.clone(), value);
            }
        }
    }

    fn parent_cursor(&self) -> C {
        match self {
            Self::Root => unreachable!("the root cannot itself be a repeated or map field"),
            Self::Field { parent, .. } => *parent,
        }
    }

    fn field_name(&self) -> String {
        match self {
            Self::Root => "$root".to_owned(),
            Self::Field { field, .. } => field.full_name().to_owned(),
        }
    }
}

/// Whether a `begin_*` dispatch function made progress or ran out of input.
enum ValueDone {
    Complete,
    Pending,
}

/// Whether stepping one already-open scope made progress, ran out of input,
/// or closed the scope.
enum Progress {
    Advanced,
    Pending,
    Closed,
}

struct StringScan {
    text: String,
    end: usize,
}

enum MaybeString {
    Complete(StringScan),
    Incomplete,
}

enum TokenScan {
    Complete { end: usize },
    Incomplete,
}

enum LiteralMatch {
    Complete { end: usize },
    Incomplete,
    Mismatch,
}

enum ScalarScan {
    Complete { end: usize, value: ScalarValue },
    Pending,
}

fn number_to_scalar(value: NumberValue) -> ScalarValue {
    match value {
        NumberValue::I32(v) => ScalarValue::I32(v),
        NumberValue::I64(v) => ScalarValue::I64(v),
        NumberValue::U32(v) => ScalarValue::U32(v),
        NumberValue::U64(v) => ScalarValue::U64(v),
        NumberValue::F32(v) => ScalarValue::F32(v),
        NumberValue::F64(v) => ScalarValue::F64(v),
    }
}

/// Streams arbitrarily-chunked JSON bytes through a protobuf schema,
/// producing [`ProtoSink`] events.
///
/// Construct with [`Self::new`], feed bytes with [`Self::feed`], and signal
/// end of input with [`Self::finish`]. A [`ParserError`] is latched: once
/// one occurs, every later call returns a clone of the same error without
/// doing further work.
pub struct Parser<S: ProtoSink> {
    sink: S,
    options: ParserOptions,
    schema: SchemaBinding,
    root: MessageDescriptor,
    pending: Vec<u8>,
    pos: usize,
    stack: Vec<StackEntry<S::Cursor>>,
    error: Option<ParserError>,
    started: bool,
    done: bool,
    eof: bool,
}

impl<S: ProtoSink> Parser<S> {
    /// Creates a parser that will parse one JSON document shaped like
    /// `root` into `sink`.
    #[must_use]
    pub fn new(root: MessageDescriptor, sink: S, options: ParserOptions) -> Self {
        let schema = SchemaBinding::new(&root);
        Self {
            sink,
            options,
            schema,
            root,
            pending: Vec::new(),
            pos: 0,
            stack: Vec::new(),
            error: None,
            started: false,
            done: false,
            eof: false,
        }
    }

    /// Feeds the next chunk of input. Chunk boundaries may fall anywhere,
    /// including mid-token; the parser re-scans from the start of whatever
    /// token was incomplete.
    ///
    /// # Errors
    /// Returns the first [`ParserError`] encountered. Once returned, later
    /// calls (to this or [`Self::finish`]) return a clone of the same error.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<(), ParserError> {
        self.pending.extend_from_slice(chunk);
        self.drive()
    }

    /// Signals that no more input is coming, and returns the sink once the
    /// document has parsed to completion.
    ///
    /// # Errors
    /// Returns a [`ParserError`] if the input ended with an incomplete
    /// value, an open container, or trailing garbage.
    pub fn finish(mut self) -> Result<S, ParserError> {
        self.eof = true;
        self.drive()?;
        if !self.done {
            let err = self.err_at(
                ErrorKind::Syntax {
                    snippet: "unexpected end of input".to_owned(),
                },
                self.pos,
            );
            return Err(err);
        }
        Ok(self.sink)
    }

    /// The number of input bytes consumed so far, including bytes consumed
    /// after a latched error (the parser keeps reading position, just not
    /// emitting events, once an error has occurred).
    #[must_use]
    pub fn bytes_consumed(&self) -> usize {
        self.pos
    }

    /// The latched error, if one has occurred.
    #[must_use]
    pub fn error(&self) -> Option<&ParserError> {
        self.error.as_ref()
    }

    /// Whether the document has parsed to completion.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done
    }

    fn drive(&mut self) -> Result<(), ParserError> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        match self.run() {
            Ok(()) => Ok(()),
            Err(err) => {
                tracing::warn!(error = %err, "parse failed");
                self.error = Some(err.clone());
                Err(err)
            }
        }
    }

    fn run(&mut self) -> Result<(), ParserError> {
        loop {
            if self.done {
                return Ok(());
            }
            if !self.started {
                if self.peek_byte().is_none() {
                    return Ok(());
                }
                match self.begin_message_value(Attach::Root, self.root.clone())? {
                    ValueDone::Pending => return Ok(()),
                    ValueDone::Complete => {
                        self.started = true;
                        continue;
                    }
                }
            }
            if self.stack.is_empty() {
                self.skip_ws();
                if self.pos < self.pending.len() {
                    return Err(self.syntax_err("trailing data after JSON value"));
                }
                if self.eof {
                    self.done = true;
                }
                return Ok(());
            }
            match self.step_top()? {
                Progress::Pending => return Ok(()),
                Progress::Advanced | Progress::Closed => continue,
            }
        }
    }

    fn step_top(&mut self) -> Result<Progress, ParserError> {
        let mut entry = self
            .stack
            .pop()
            .expect("step_top is only called with a non-empty stack");
        let progress = match &mut entry.scope {
            Scope::Message(scope) => self.step_message(scope)?,
            Scope::Array(scope) => self.step_array(scope)?,
            Scope::Map(scope) => self.step_map(scope)?,
        };
        match progress {
            Progress::Closed => self.close_entry(entry),
            Progress::Advanced | Progress::Pending => self.stack.push(entry),
        }
        Ok(progress)
    }

    fn close_entry(&mut self, entry: StackEntry<S::Cursor>) {
        if let Scope::Message(scope) = &entry.scope {
            self.sink.pop_message(scope.cursor);
        }
        for cursor in entry.extra_close {
            self.sink.pop_message(cursor);
        }
    }

    // ---- object/array/map stepping -------------------------------------

    fn step_message(&mut self, scope: &mut MessageScope<S::Cursor>) -> Result<Progress, ParserError> {
        match scope.state {
            MemberState::BeforeKey => match self.peek_byte() {
                None => Ok(Progress::Pending),
                Some(b'}') => {
                    self.pos += 1;
                    Ok(Progress::Closed)
                }
                Some(b'"') => match self.scan_string(self.pos)? {
                    MaybeString::Incomplete => Ok(Progress::Pending),
                    MaybeString::Complete(found) => {
                        match scope
                            .table
                            .get(&found.text, self.options.accept_proto_field_names)
                            .cloned()
                        {
                            Some(field) => scope.pending_field = Some(field),
                            None if self.options.ignore_unknown_fields => scope.pending_field = None,
                            None => {
                                return Err(self.err_at(
                                    ErrorKind::UnknownField { name: found.text },
                                    self.pos,
                                ));
                            }
                        }
                        self.pos = found.end;
                        scope.state = MemberState::AfterKey;
                        Ok(Progress::Advanced)
                    }
                },
                Some(_) => Err(self.syntax_err("expected '\"' or '}'")),
            },
            MemberState::AfterKey => match self.peek_byte() {
                None => Ok(Progress::Pending),
                Some(b':') => {
                    self.pos += 1;
                    scope.state = MemberState::BeforeValue;
                    Ok(Progress::Advanced)
                }
                Some(_) => Err(self.syntax_err("expected ':'")),
            },
            MemberState::BeforeValue => {
                let outcome = match scope.pending_field.clone() {
                    Some(field) => self.begin_field_value(
                        Attach::Field {
                            parent: scope.cursor,
                            field,
                            map_key: None,
                        },
                    )?,
                    None => match self.skip_json_value(self.pos)? {
                        TokenScan::Incomplete => return Ok(Progress::Pending),
                        TokenScan::Complete { end } => {
                            self.pos = end;
                            ValueDone::Complete
                        }
                    },
                };
                match outcome {
                    ValueDone::Pending => Ok(Progress::Pending),
                    ValueDone::Complete => {
                        scope.pending_field = None;
                        scope.state = MemberState::AfterValue;
                        Ok(Progress::Advanced)
                    }
                }
            }
            MemberState::AfterValue => match self.peek_byte() {
                None => Ok(Progress::Pending),
                Some(b',') => {
                    self.pos += 1;
                    scope.state = MemberState::BeforeKey;
                    Ok(Progress::Advanced)
                }
                Some(b'}') => {
                    self.pos += 1;
                    Ok(Progress::Closed)
                }
                Some(_) => Err(self.syntax_err("expected ',' or '}'")),
            },
        }
    }

    fn step_array(&mut self, scope: &mut ArrayScope<S::Cursor>) -> Result<Progress, ParserError> {
        match scope.state {
            ElementState::BeforeValue => match self.peek_byte() {
                None => Ok(Progress::Pending),
                Some(b']') => {
                    self.pos += 1;
                    Ok(Progress::Closed)
                }
                Some(_) => {
                    let attach = Attach::Field {
                        parent: scope.parent_cursor,
                        field: scope.field.clone(),
                        map_key: None,
                    };
                    match self.begin_single_value(attach, scope.field.clone())? {
                        ValueDone::Pending => Ok(Progress::Pending),
                        ValueDone::Complete => {
                            scope.state = ElementState::AfterValue;
                            Ok(Progress::Advanced)
                        }
                    }
                }
            },
            ElementState::AfterValue => match self.peek_byte() {
                None => Ok(Progress::Pending),
                Some(b',') => {
                    self.pos += 1;
                    scope.state = ElementState::BeforeValue;
                    Ok(Progress::Advanced)
                }
                Some(b']') => {
                    self.pos += 1;
                    Ok(Progress::Closed)
                }
                Some(_) => Err(self.syntax_err("expected ',' or ']'")),
            },
        }
    }

    fn step_map(&mut self, scope: &mut MapScope<S::Cursor>) -> Result<Progress, ParserError> {
        match scope.state {
            MemberState::BeforeKey => match self.peek_byte() {
                None => Ok(Progress::Pending),
                Some(b'}') => {
                    self.pos += 1;
                    Ok(Progress::Closed)
                }
                Some(b'"') => match self.scan_string(self.pos)? {
                    MaybeString::Incomplete => Ok(Progress::Pending),
                    MaybeString::Complete(found) => {
                        let key = self.map_key_from_text(&scope.key_field, &found.text)?;
                        scope.pending_key = Some(key);
                        self.pos = found.end;
                        scope.state = MemberState::AfterKey;
                        Ok(Progress::Advanced)
                    }
                },
                Some(_) => Err(self.syntax_err("expected '\"' or '}'")),
            },
            MemberState::AfterKey => match self.peek_byte() {
                None => Ok(Progress::Pending),
                Some(b':') => {
                    self.pos += 1;
                    scope.state = MemberState::BeforeValue;
                    Ok(Progress::Advanced)
                }
                Some(_) => Err(self.syntax_err("expected ':'")),
            },
            MemberState::BeforeValue => {
                let key = scope
                    .pending_key
                    .clone()
                    .ok_or_else(|| self.internal("map entry value without a pending key"))?;
                let attach = Attach::Field {
                    parent: scope.parent_cursor,
                    field: scope.value_field.clone(),
                    map_key: Some(key),
                };
                match self.begin_single_value(attach, scope.value_field.clone())? {
                    ValueDone::Pending => Ok(Progress::Pending),
                    ValueDone::Complete => {
                        scope.pending_key = None;
                        scope.state = MemberState::AfterValue;
                        Ok(Progress::Advanced)
                    }
                }
            }
            MemberState::AfterValue => match self.peek_byte() {
                None => Ok(Progress::Pending),
                Some(b',') => {
                    self.pos += 1;
                    scope.state = MemberState::BeforeKey;
                    Ok(Progress::Advanced)
                }
                Some(b'}') => {
                    self.pos += 1;
                    Ok(Progress::Closed)
                }
                Some(_) => Err(self.syntax_err("expected ',' or '}'")),
            },
        }
    }

    fn map_key_from_text(&self, key_field: &FieldDescriptor, text: &str) -> Result<MapKey, ParserError> {
        match key_field.kind() {
            Kind::String => Ok(MapKey::String(text.to_owned())),
            Kind::Bool => match text {
                "true" => Ok(MapKey::Bool(true)),
                "false" => Ok(MapKey::Bool(false)),
                _ => Err(self.syntax_err("invalid boolean map key")),
            },
            kind @ (Kind::Int32 | Kind::Sint32 | Kind::Sfixed32) => {
                match numbers::parse_number(text, &kind, true).map_err(|k| self.err_kind(k))? {
                    NumberValue::I32(v) => Ok(MapKey::I32(v)),
                    _ => Err(self.internal("map key parse returned the wrong variant")),
                }
            }
            kind @ (Kind::Uint32 | Kind::Fixed32) => {
                match numbers::parse_number(text, &kind, true).map_err(|k| self.err_kind(k))? {
                    NumberValue::U32(v) => Ok(MapKey::U32(v)),
                    _ => Err(self.internal("map key parse returned the wrong variant")),
                }
            }
            kind @ (Kind::Int64 | Kind::Sint64 | Kind::Sfixed64) => {
                match numbers::parse_number(text, &kind, true).map_err(|k| self.err_kind(k))? {
                    NumberValue::I64(v) => Ok(MapKey::I64(v)),
                    _ => Err(self.internal("map key parse returned the wrong variant")),
                }
            }
            kind @ (Kind::Uint64 | Kind::Fixed64) => {
                match numbers::parse_number(text, &kind, true).map_err(|k| self.err_kind(k))? {
                    NumberValue::U64(v) => Ok(MapKey::U64(v)),
                    _ => Err(self.internal("map key parse returned the wrong variant")),
                }
            }
            _ => Err(self.err_kind(ErrorKind::InvalidMapKeyType)),
        }
    }

    // ---- value dispatch --------------------------------------------------

    /// Entry point for an object member whose field hasn't had its
    /// cardinality (singular/repeated/map) consumed yet.
    fn begin_field_value(&mut self, attach: Attach<S::Cursor>) -> Result<ValueDone, ParserError> {
        let Attach::Field { field, .. } = &attach else {
            unreachable!("begin_field_value is only called for object members")
        };
        if field.is_map() {
            self.begin_map_field(attach)
        } else if field.is_list() {
            self.begin_repeated_field(attach)
        } else {
            let field = field.clone();
            self.begin_single_value(attach, field)
        }
    }

    fn begin_map_field(&mut self, attach: Attach<S::Cursor>) -> Result<ValueDone, ParserError> {
        let Attach::Field { field, .. } = &attach else {
            unreachable!()
        };
        let field = field.clone();
        match self.peek_byte() {
            None => Ok(ValueDone::Pending),
            Some(b'n') => self.skip_null_as_absent(),
            Some(b'{') => {
                self.check_depth()?;
                let entry_desc = match field.kind() {
                    Kind::Message(m) => m,
                    _ => return Err(self.internal("map field is not message-kinded")),
                };
                let key_field = entry_desc
                    .get_field(1)
                    .ok_or_else(|| self.internal("map entry missing key field"))?;
                let value_field = entry_desc
                    .get_field(2)
                    .ok_or_else(|| self.internal("map entry missing value field"))?;
                let parent_cursor = attach.parent_cursor();
                self.pos += 1;
                self.stack.push(StackEntry {
                    scope: Scope::Map(MapScope {
                        parent_cursor,
                        map_field: field,
                        key_field,
                        value_field,
                        state: MemberState::BeforeKey,
                        pending_key: None,
                    }),
                    extra_close: Vec::new(),
                });
                Ok(ValueDone::Complete)
            }
            Some(_) => Err(self.schema_mismatch(&attach, "expected object for map field")),
        }
    }

    fn begin_repeated_field(&mut self, attach: Attach<S::Cursor>) -> Result<ValueDone, ParserError> {
        let Attach::Field { field, .. } = &attach else {
            unreachable!()
        };
        let field = field.clone();
        match self.peek_byte() {
            None => Ok(ValueDone::Pending),
            Some(b'n') => self.skip_null_as_absent(),
            Some(b'[') => {
                self.check_depth()?;
                let parent_cursor = attach.parent_cursor();
                self.pos += 1;
                self.stack.push(StackEntry {
                    scope: Scope::Array(ArrayScope {
                        parent_cursor,
                        field,
                        state: ElementState::BeforeValue,
                    }),
                    extra_close: Vec::new(),
                });
                Ok(ValueDone::Complete)
            }
            Some(_) => Err(self.schema_mismatch(&attach, "expected array for repeated field")),
        }
    }

    /// Entry point for a value whose field cardinality has already been
    /// consumed: a plain singular field, one array element, or one map
    /// entry's value.
    fn begin_single_value(&mut self, attach: Attach<S::Cursor>, field: FieldDescriptor) -> Result<ValueDone, ParserError> {
        let Some(b) = self.peek_byte() else {
            return Ok(ValueDone::Pending);
        };
        if b == b'n' {
            if let Kind::Message(desc) = field.kind() {
                if wellknown::WellKnown::from_full_name(desc.full_name()) == Some(WellKnown::Value) {
                    return self.begin_value_null(attach, &desc);
                }
            }
            return self.skip_null_as_absent();
        }
        match field.kind() {
            Kind::Message(desc) => self.begin_message_value(attach, desc),
            kind => self.begin_scalar_field(attach, kind),
        }
    }

    fn begin_scalar_field(&mut self, attach: Attach<S::Cursor>, kind: Kind) -> Result<ValueDone, ParserError> {
        match self.scan_scalar_token(&kind)? {
            ScalarScan::Pending => Ok(ValueDone::Pending),
            ScalarScan::Complete { end, value } => {
                attach.put_scalar(&mut self.sink, value);
                self.pos = end;
                Ok(ValueDone::Complete)
            }
        }
    }

    fn begin_message_value(&mut self, attach: Attach<S::Cursor>, desc: MessageDescriptor) -> Result<ValueDone, ParserError> {
        let Some(b) = self.peek_byte() else {
            return Ok(ValueDone::Pending);
        };
        if b == b'n' {
            if wellknown::WellKnown::from_full_name(desc.full_name()) == Some(WellKnown::Value) {
                return self.begin_value_null(attach, &desc);
            }
            return match attach {
                Attach::Root => Err(self.err_kind(ErrorKind::SchemaMismatch {
                    field: "$root".to_owned(),
                    reason: "root value cannot be null".to_owned(),
                })),
                Attach::Field { .. } => self.skip_null_as_absent(),
            };
        }
        match WellKnown::from_full_name(desc.full_name()) {
            Some(wk @ (WellKnown::Duration | WellKnown::Timestamp)) => {
                self.begin_wellknown_string(attach, &desc, wk)
            }
            Some(wk) if wk.is_wrapper() => self.begin_wrapper(attach, &desc),
            Some(WellKnown::Struct) => self.begin_struct(attach, &desc),
            Some(WellKnown::Value) => self.begin_value(attach, &desc),
            Some(WellKnown::ListValue) => self.begin_list_value(attach, &desc),
            _ => self.begin_plain_message(attach, &desc),
        }
    }

    fn begin_plain_message(&mut self, attach: Attach<S::Cursor>, desc: &MessageDescriptor) -> Result<ValueDone, ParserError> {
        if self.peek_byte() != Some(b'{') {
            return Err(self.schema_mismatch(&attach, "expected object"));
        }
        self.check_depth()?;
        let cursor = attach.push_message(&mut self.sink, desc);
        let table = self.schema.table_for(desc);
        self.pos += 1;
        self.stack.push(StackEntry {
            scope: Scope::Message(MessageScope {
                cursor,
                table,
                state: MemberState::BeforeKey,
                pending_field: None,
            }),
            extra_close: Vec::new(),
        });
        Ok(ValueDone::Complete)
    }

    fn begin_struct(&mut self, attach: Attach<S::Cursor>, desc: &MessageDescriptor) -> Result<ValueDone, ParserError> {
        if self.peek_byte() != Some(b'{') {
            return Err(self.schema_mismatch(&attach, "expected object for google.protobuf.Struct"));
        }
        self.check_depth()?;
        let cursor = attach.push_message(&mut self.sink, desc);
        let (key_field, value_field, fields_field) = self.map_entry_fields(desc, "fields")?;
        self.pos += 1;
        self.stack.push(StackEntry {
            scope: Scope::Map(MapScope {
                parent_cursor: cursor,
                map_field: fields_field,
                key_field,
                value_field,
                state: MemberState::BeforeKey,
                pending_key: None,
            }),
            extra_close: vec![cursor],
        });
        Ok(ValueDone::Complete)
    }

    fn begin_list_value(&mut self, attach: Attach<S::Cursor>, desc: &MessageDescriptor) -> Result<ValueDone, ParserError> {
        if self.peek_byte() != Some(b'[') {
            return Err(self.schema_mismatch(&attach, "expected array for google.protobuf.ListValue"));
        }
        self.check_depth()?;
        let cursor = attach.push_message(&mut self.sink, desc);
        let values_field = desc
            .get_field_by_name("values")
            .ok_or_else(|| self.internal("ListValue is missing its values field"))?;
        self.pos += 1;
        self.stack.push(StackEntry {
            scope: Scope::Array(ArrayScope {
                parent_cursor: cursor,
                field: values_field,
                state: ElementState::BeforeValue,
            }),
            extra_close: vec![cursor],
        });
        Ok(ValueDone::Complete)
    }

    fn begin_wrapper(&mut self, attach: Attach<S::Cursor>, desc: &MessageDescriptor) -> Result<ValueDone, ParserError> {
        let value_field = desc
            .get_field_by_name("value")
            .ok_or_else(|| self.internal("wrapper message is missing its value field"))?;
        match self.scan_scalar_token(&value_field.kind())? {
            ScalarScan::Pending => Ok(ValueDone::Pending),
            ScalarScan::Complete { end, value } => {
                self.check_depth()?;
                let cursor = attach.push_message(&mut self.sink, desc);
                self.sink.put_scalar(cursor, &value_field, None, value);
                self.sink.pop_message(cursor);
                self.pos = end;
                Ok(ValueDone::Complete)
            }
        }
    }

    fn begin_wellknown_string(
        &mut self,
        attach: Attach<S::Cursor>,
        desc: &MessageDescriptor,
        wk: WellKnown,
    ) -> Result<ValueDone, ParserError> {
        if self.peek_byte() != Some(b'"') {
            return Err(self.schema_mismatch(&attach, "expected string"));
        }
        match self.scan_string(self.pos)? {
            MaybeString::Incomplete => Ok(ValueDone::Pending),
            MaybeString::Complete(found) => {
                let (seconds, nanos) = match wk {
                    WellKnown::Duration => {
                        crate::wellknown::duration::parse(&found.text).map_err(|k| self.err_kind(k))?
                    }
                    WellKnown::Timestamp => {
                        crate::wellknown::timestamp::parse(&found.text).map_err(|k| self.err_kind(k))?
                    }
                    _ => return Err(self.internal("begin_wellknown_string called for the wrong type")),
                };
                self.check_depth()?;
                let cursor = attach.push_message(&mut self.sink, desc);
                let seconds_field = desc
                    .get_field_by_name("seconds")
                    .ok_or_else(|| self.internal("well-known duration/timestamp missing seconds"))?;
                let nanos_field = desc
                    .get_field_by_name("nanos")
                    .ok_or_else(|| self.internal("well-known duration/timestamp missing nanos"))?;
                self.sink
                    .put_scalar(cursor, &seconds_field, None, ScalarValue::I64(seconds));
                self.sink
                    .put_scalar(cursor, &nanos_field, None, ScalarValue::I32(nanos));
                self.sink.pop_message(cursor);
                self.pos = found.end;
                Ok(ValueDone::Complete)
            }
        }
    }

    fn begin_value_null(&mut self, attach: Attach<S::Cursor>, desc: &MessageDescriptor) -> Result<ValueDone, ParserError> {
        match self.scan_literal(self.pos, "null")? {
            TokenScan::Incomplete => Ok(ValueDone::Pending),
            TokenScan::Complete { end } => {
                self.check_depth()?;
                let cursor = attach.push_message(&mut self.sink, desc);
                let field = self.value_oneof_field(desc, "null_value", "nullValue")?;
                self.sink
                    .put_scalar(cursor, &field, None, ScalarValue::EnumNumber(0));
                self.sink.pop_message(cursor);
                self.pos = end;
                Ok(ValueDone::Complete)
            }
        }
    }

    /// Dispatches one of `google.protobuf.Value`'s six branches based on the
    /// next JSON token's shape. `null` is handled by [`Self::begin_value_null`]
    /// before this is reached.
    fn begin_value(&mut self, attach: Attach<S::Cursor>, desc: &MessageDescriptor) -> Result<ValueDone, ParserError> {
        match self.peek_byte() {
            None => Ok(ValueDone::Pending),
            Some(b'{') => {
                self.check_depth()?;
                let cursor_value = attach.push_message(&mut self.sink, desc);
                let struct_field = self.value_oneof_field(desc, "struct_value", "structValue")?;
                let struct_desc = match struct_field.kind() {
                    Kind::Message(m) => m,
                    _ => return Err(self.internal("Value.struct_value is not message-kinded")),
                };
                let cursor_struct = self.sink.push_message(cursor_value, &struct_field, None);
                let (key_field, value_field, fields_field) = self.map_entry_fields(&struct_desc, "fields")?;
                self.pos += 1;
                self.stack.push(StackEntry {
                    scope: Scope::Map(MapScope {
                        parent_cursor: cursor_struct,
                        map_field: fields_field,
                        key_field,
                        value_field,
                        state: MemberState::BeforeKey,
                        pending_key: None,
                    }),
                    extra_close: vec![cursor_struct, cursor_value],
                });
                Ok(ValueDone::Complete)
            }
            Some(b'[') => {
                self.check_depth()?;
                let cursor_value = attach.push_message(&mut self.sink, desc);
                let list_field = self.value_oneof_field(desc, "list_value", "listValue")?;
                let list_desc = match list_field.kind() {
                    Kind::Message(m) => m,
                    _ => return Err(self.internal("Value.list_value is not message-kinded")),
                };
                let cursor_list = self.sink.push_message(cursor_value, &list_field, None);
                let values_field = list_desc
                    .get_field_by_name("values")
                    .ok_or_else(|| self.internal("ListValue is missing its values field"))?;
                self.pos += 1;
                self.stack.push(StackEntry {
                    scope: Scope::Array(ArrayScope {
                        parent_cursor: cursor_list,
                        field: values_field,
                        state: ElementState::BeforeValue,
                    }),
                    extra_close: vec![cursor_list, cursor_value],
                });
                Ok(ValueDone::Complete)
            }
            Some(b'"') => match self.scan_string(self.pos)? {
                MaybeString::Incomplete => Ok(ValueDone::Pending),
                MaybeString::Complete(found) => {
                    let cursor = attach.push_message(&mut self.sink, desc);
                    let field = self.value_oneof_field(desc, "string_value", "stringValue")?;
                    self.sink
                        .put_scalar(cursor, &field, None, ScalarValue::String(found.text));
                    self.sink.pop_message(cursor);
                    self.pos = found.end;
                    Ok(ValueDone::Complete)
                }
            },
            Some(b't' | b'f') => match self.scan_scalar_token(&Kind::Bool)? {
                ScalarScan::Pending => Ok(ValueDone::Pending),
                ScalarScan::Complete { end, value } => {
                    let cursor = attach.push_message(&mut self.sink, desc);
                    let field = self.value_oneof_field(desc, "bool_value", "boolValue")?;
                    self.sink.put_scalar(cursor, &field, None, value);
                    self.sink.pop_message(cursor);
                    self.pos = end;
                    Ok(ValueDone::Complete)
                }
            },
            Some(_) => match self.scan_number(self.pos, self.eof)? {
                TokenScan::Incomplete => Ok(ValueDone::Pending),
                TokenScan::Complete { end } => {
                    let text = std::str::from_utf8(&self.pending[self.pos..end])
                        .map_err(|_| self.internal("number literal was not valid utf-8"))?;
                    let number = match numbers::parse_number(text, &Kind::Double, false)
                        .map_err(|k| self.err_kind(k))?
                    {
                        NumberValue::F64(v) => v,
                        _ => return Err(self.internal("double parse returned the wrong variant")),
                    };
                    let cursor = attach.push_message(&mut self.sink, desc);
                    let field = self.value_oneof_field(desc, "number_value", "numberValue")?;
                    self.sink
                        .put_scalar(cursor, &field, None, ScalarValue::F64(number));
                    self.sink.pop_message(cursor);
                    self.pos = end;
                    Ok(ValueDone::Complete)
                }
            },
        }
    }

    fn value_oneof_field(&self, desc: &MessageDescriptor, snake: &str, camel: &str) -> Result<FieldDescriptor, ParserError> {
        desc.get_field_by_name(snake)
            .or_else(|| desc.get_field_by_name(camel))
            .ok_or_else(|| self.internal("google.protobuf.Value is missing an expected oneof field"))
    }

    fn map_entry_fields(
        &self,
        owner: &MessageDescriptor,
        map_field_name: &str,
    ) -> Result<(FieldDescriptor, FieldDescriptor, FieldDescriptor), ParserError> {
        let map_field = owner
            .get_field_by_name(map_field_name)
            .ok_or_else(|| self.internal("expected map field was missing"))?;
        let entry_desc = match map_field.kind() {
            Kind::Message(m) => m,
            _ => return Err(self.internal("expected map field was not message-kinded")),
        };
        let key_field = entry_desc
            .get_field(1)
            .ok_or_else(|| self.internal("map entry missing key field"))?;
        let value_field = entry_desc
            .get_field(2)
            .ok_or_else(|| self.internal("map entry missing value field"))?;
        Ok((key_field, value_field, map_field))
    }

    fn skip_null_as_absent(&mut self) -> Result<ValueDone, ParserError> {
        match self.scan_literal(self.pos, "null")? {
            TokenScan::Incomplete => Ok(ValueDone::Pending),
            TokenScan::Complete { end } => {
                self.pos = end;
                Ok(ValueDone::Complete)
            }
        }
    }

    // ---- lexical scanning (pure: never mutate `self.pos`, never call the sink) --

    fn scan_scalar_token(&self, kind: &Kind) -> Result<ScalarScan, ParserError> {
        match kind {
            Kind::Bool => match self.pending.get(self.pos) {
                None => Ok(ScalarScan::Pending),
                Some(b't') => match self.try_literal(self.pos, "true") {
                    LiteralMatch::Complete { end } => Ok(ScalarScan::Complete {
                        end,
                        value: ScalarValue::Bool(true),
                    }),
                    LiteralMatch::Incomplete => Ok(ScalarScan::Pending),
                    LiteralMatch::Mismatch => Err(self.syntax_err("invalid literal")),
                },
                Some(b'f') => match self.try_literal(self.pos, "false") {
                    LiteralMatch::Complete { end } => Ok(ScalarScan::Complete {
                        end,
                        value: ScalarValue::Bool(false),
                    }),
                    LiteralMatch::Incomplete => Ok(ScalarScan::Pending),
                    LiteralMatch::Mismatch => Err(self.syntax_err("invalid literal")),
                },
                Some(_) => Err(self.syntax_err("expected a boolean literal")),
            },
            Kind::String => match self.scan_string(self.pos)? {
                MaybeString::Incomplete => Ok(ScalarScan::Pending),
                MaybeString::Complete(found) => Ok(ScalarScan::Complete {
                    end: found.end,
                    value: ScalarValue::String(found.text),
                }),
            },
            Kind::Bytes => match self.scan_string(self.pos)? {
                MaybeString::Incomplete => Ok(ScalarScan::Pending),
                MaybeString::Complete(found) => {
                    let bytes = crate::base64::decode(&found.text).map_err(|k| self.err_kind(k))?;
                    Ok(ScalarScan::Complete {
                        end: found.end,
                        value: ScalarValue::Bytes(bytes),
                    })
                }
            },
            Kind::Enum(enum_desc) => {
                if self.pending.get(self.pos) == Some(&b'"') {
                    match self.scan_string(self.pos)? {
                        MaybeString::Incomplete => Ok(ScalarScan::Pending),
                        MaybeString::Complete(found) => {
                            let value = enum_desc.get_value_by_name(&found.text).ok_or_else(|| {
                                self.err_kind(ErrorKind::UnknownEnumValue {
                                    name: found.text.clone(),
                                })
                            })?;
                            Ok(ScalarScan::Complete {
                                end: found.end,
                                value: ScalarValue::EnumNumber(value.number()),
                            })
                        }
                    }
                } else {
                    match self.scan_number(self.pos, self.eof)? {
                        TokenScan::Incomplete => Ok(ScalarScan::Pending),
                        TokenScan::Complete { end } => {
                            let text = std::str::from_utf8(&self.pending[self.pos..end])
                                .map_err(|_| self.internal("number literal was not valid utf-8"))?;
                            match numbers::parse_number(text, kind, false).map_err(|k| self.err_kind(k))? {
                                NumberValue::I32(v) => Ok(ScalarScan::Complete {
                                    end,
                                    value: ScalarValue::EnumNumber(v),
                                }),
                                _ => Err(self.internal("enum number parse returned the wrong variant")),
                            }
                        }
                    }
                }
            }
            _ => {
                if self.pending.get(self.pos) == Some(&b'"') {
                    match self.scan_string(self.pos)? {
                        MaybeString::Incomplete => Ok(ScalarScan::Pending),
                        MaybeString::Complete(found) => {
                            let value = numbers::parse_number(&found.text, kind, true)
                                .map_err(|k| self.err_kind(k))?;
                            Ok(ScalarScan::Complete {
                                end: found.end,
                                value: number_to_scalar(value),
                            })
                        }
                    }
                } else {
                    match self.scan_number(self.pos, self.eof)? {
                        TokenScan::Incomplete => Ok(ScalarScan::Pending),
                        TokenScan::Complete { end } => {
                            let text = std::str::from_utf8(&self.pending[self.pos..end])
                                .map_err(|_| self.internal("number literal was not valid utf-8"))?;
                            let value = numbers::parse_number(text, kind, false).map_err(|k| self.err_kind(k))?;
                            Ok(ScalarScan::Complete {
                                end,
                                value: number_to_scalar(value),
                            })
                        }
                    }
                }
            }
        }
    }

    /// Scans a JSON string literal starting at `start` (which must index the
    /// opening `"`), decoding escapes as it goes. Returns `Incomplete`
    /// without error if the input ends before the closing quote.
    fn scan_string(&self, start: usize) -> Result<MaybeString, ParserError> {
        let mut i = start + 1;
        let mut out: Vec<u8> = Vec::new();
        let mut escape = crate::escape::UnicodeEscapeBuffer::default();
        let mut in_escape = false;
        let mut awaiting_low_surrogate = false;
        loop {
            let Some(&b) = self.pending.get(i) else {
                return Ok(MaybeString::Incomplete);
            };
            if in_escape {
                escape
                    .push_hex_digit(b)
                    .map_err(|k| self.err_at(k, i))?;
                i += 1;
                if escape.is_complete() {
                    in_escape = false;
                    match escape.finish_unit() {
                        crate::escape::UnicodeOutcome::Scalar(c) => {
                            let mut tmp = [0u8; 4];
                            out.extend_from_slice(c.encode_utf8(&mut tmp).as_bytes());
                        }
                        crate::escape::UnicodeOutcome::AwaitingLowSurrogate => {
                            awaiting_low_surrogate = true;
                        }
                        crate::escape::UnicodeOutcome::Incomplete => {
                            return Err(self.internal("unicode escape buffer reported incomplete after 4 digits"));
                        }
                        crate::escape::UnicodeOutcome::LoneSurrogate => {
                            return Err(self.syntax_err_at(i, "unpaired high surrogate"));
                        }
                    }
                }
                continue;
            }
            if awaiting_low_surrogate {
                if b != b'\\' {
                    return Err(self.syntax_err_at(i, "unpaired high surrogate"));
                }
                let Some(&u) = self.pending.get(i + 1) else {
                    return Ok(MaybeString::Incomplete);
                };
                if u != b'u' {
                    return Err(self.syntax_err_at(i, "unpaired high surrogate"));
                }
                i += 2;
                awaiting_low_surrogate = false;
                in_escape = true;
                continue;
            }
            match b {
                b'"' => {
                    let text = String::from_utf8(out)
                        .map_err(|_| self.syntax_err_at(start, "invalid utf-8 in string literal"))?;
                    return Ok(MaybeString::Complete(StringScan { text, end: i + 1 }));
                }
                b'\\' => {
                    let Some(&next) = self.pending.get(i + 1) else {
                        return Ok(MaybeString::Incomplete);
                    };
                    if next == b'u' {
                        i += 2;
                        in_escape = true;
                    } else if let Some(decoded) = crate::escape::simple_escape(next) {
                        out.push(decoded);
                        i += 2;
                    } else {
                        return Err(self.syntax_err_at(i, "invalid escape sequence"));
                    }
                }
                0x00..=0x1F => return Err(self.syntax_err_at(i, "control character in string literal")),
                _ => {
                    out.push(b);
                    i += 1;
                }
            }
        }
    }

    /// Scans a JSON number (or the bare `Infinity`/`-Infinity`/`NaN`
    /// literals proto3 JSON uses for non-finite floats) starting at `start`.
    ///
    /// `eof` disambiguates the one case where running off the end of the
    /// buffer is not automatically "need more data": a number has no
    /// terminating character of its own, so if the buffer simply ends right
    /// after a syntactically complete number, more digits could still be
    /// coming in the next chunk — unless this really is the end of input.
    fn scan_number(&self, start: usize, eof: bool) -> Result<TokenScan, ParserError> {
        let mut i = start;
        let negative = self.pending.get(i) == Some(&b'-');
        if negative {
            i += 1;
        }
        match self.try_literal(i, "Infinity") {
            LiteralMatch::Complete { end } => return Ok(TokenScan::Complete { end }),
            LiteralMatch::Incomplete => return Ok(TokenScan::Incomplete),
            LiteralMatch::Mismatch => {}
        }
        if !negative {
            match self.try_literal(i, "NaN") {
                LiteralMatch::Complete { end } => return Ok(TokenScan::Complete { end }),
                LiteralMatch::Incomplete => return Ok(TokenScan::Incomplete),
                LiteralMatch::Mismatch => {}
            }
        }
        match self.pending.get(i) {
            Some(b'0') => i += 1,
            Some(b'1'..=b'9') => {
                i += 1;
                while matches!(self.pending.get(i), Some(b'0'..=b'9')) {
                    i += 1;
                }
            }
            Some(_) => return Err(self.syntax_err_at(start, "invalid number")),
            None => return Ok(TokenScan::Incomplete),
        }
        if self.pending.get(i) == Some(&b'.') {
            let frac_start = i + 1;
            let mut j = frac_start;
            while matches!(self.pending.get(j), Some(b'0'..=b'9')) {
                j += 1;
            }
            if j == frac_start {
                return if self.pending.get(j).is_none() {
                    Ok(TokenScan::Incomplete)
                } else {
                    Err(self.syntax_err_at(j, "expected a digit after '.'"))
                };
            }
            i = j;
        }
        if matches!(self.pending.get(i), Some(b'e' | b'E')) {
            let mut j = i + 1;
            if matches!(self.pending.get(j), Some(b'+' | b'-')) {
                j += 1;
            }
            let exp_start = j;
            while matches!(self.pending.get(j), Some(b'0'..=b'9')) {
                j += 1;
            }
            if j == exp_start {
                return if self.pending.get(j).is_none() {
                    Ok(TokenScan::Incomplete)
                } else {
                    Err(self.syntax_err_at(j, "expected a digit in the exponent"))
                };
            }
            i = j;
        }
        if i == self.pending.len() {
            return if eof {
                Ok(TokenScan::Complete { end: i })
            } else {
                Ok(TokenScan::Incomplete)
            };
        }
        Ok(TokenScan::Complete { end: i })
    }

    fn try_literal(&self, start: usize, literal: &str) -> LiteralMatch {
        for (offset, want) in literal.bytes().enumerate() {
            match self.pending.get(start + offset) {
                None => return LiteralMatch::Incomplete,
                Some(&got) if got == want => {}
                Some(_) => return LiteralMatch::Mismatch,
            }
        }
        LiteralMatch::Complete {
            end: start + literal.len(),
        }
    }

    fn scan_literal(&self, start: usize, literal: &str) -> Result<TokenScan, ParserError> {
        match self.try_literal(start, literal) {
            LiteralMatch::Complete { end } => Ok(TokenScan::Complete { end }),
            LiteralMatch::Incomplete => Ok(TokenScan::Incomplete),
            LiteralMatch::Mismatch => Err(self.syntax_err_at(start, "invalid literal")),
        }
    }

    /// Scans (without interpreting) one arbitrary JSON value, for skipping
    /// an unknown object member when `ignore_unknown_fields` is set.
    fn skip_json_value(&self, start: usize) -> Result<TokenScan, ParserError> {
        let start = self.skip_ws_from(start);
        match self.pending.get(start) {
            None => Ok(TokenScan::Incomplete),
            Some(b'"') => match self.scan_string(start)? {
                MaybeString::Incomplete => Ok(TokenScan::Incomplete),
                MaybeString::Complete(found) => Ok(TokenScan::Complete { end: found.end }),
            },
            Some(b'{') => self.skip_container(start, b'{', b'}'),
            Some(b'[') => self.skip_container(start, b'[', b']'),
            Some(b't') => self.literal_token(start, "true"),
            Some(b'f') => self.literal_token(start, "false"),
            Some(b'n') => self.literal_token(start, "null"),
            Some(_) => self.scan_number(start, self.eof),
        }
    }

    fn literal_token(&self, start: usize, literal: &str) -> Result<TokenScan, ParserError> {
        self.scan_literal(start, literal)
    }

    fn skip_container(&self, start: usize, open: u8, close: u8) -> Result<TokenScan, ParserError> {
        debug_assert_eq!(self.pending.get(start), Some(&open));
        let mut i = self.skip_ws_from(start + 1);
        if self.pending.get(i) == Some(&close) {
            return Ok(TokenScan::Complete { end: i + 1 });
        }
        loop {
            if open == b'{' {
                match self.pending.get(i) {
                    None => return Ok(TokenScan::Incomplete),
                    Some(b'"') => match self.scan_string(i)? {
                        MaybeString::Incomplete => return Ok(TokenScan::Incomplete),
                        MaybeString::Complete(found) => i = found.end,
                    },
                    Some(_) => return Err(self.syntax_err_at(i, "expected a string key")),
                }
                i = self.skip_ws_from(i);
                match self.pending.get(i) {
                    None => return Ok(TokenScan::Incomplete),
                    Some(b':') => i += 1,
                    Some(_) => return Err(self.syntax_err_at(i, "expected ':'")),
                }
            }
            match self.skip_json_value(i)? {
                TokenScan::Incomplete => return Ok(TokenScan::Incomplete),
                TokenScan::Complete { end } => i = end,
            }
            i = self.skip_ws_from(i);
            match self.pending.get(i) {
                None => return Ok(TokenScan::Incomplete),
                Some(b',') => {
                    i = self.skip_ws_from(i + 1);
                }
                Some(&c) if c == close => return Ok(TokenScan::Complete { end: i + 1 }),
                Some(_) => return Err(self.syntax_err_at(i, "expected ',' or a closing bracket")),
            }
        }
    }

    // ---- small helpers -----------------------------------------------------

    fn peek_byte(&mut self) -> Option<u8> {
        self.skip_ws();
        self.pending.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        self.pos = self.skip_ws_from(self.pos);
    }

    fn skip_ws_from(&self, mut i: usize) -> usize {
        while matches!(self.pending.get(i), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            i += 1;
        }
        i
    }

    fn check_depth(&self) -> Result<(), ParserError> {
        if self.stack.len() >= self.options.max_depth {
            return Err(self.err_kind(ErrorKind::NestingTooDeep));
        }
        Ok(())
    }

    fn err_at(&self, kind: ErrorKind, offset: usize) -> ParserError {
        ParserError::new(kind, offset)
    }

    fn err_kind(&self, kind: ErrorKind) -> ParserError {
        self.err_at(kind, self.pos)
    }

    fn internal(&self, reason: &'static str) -> ParserError {
        self.err_kind(ErrorKind::Internal { reason })
    }

    fn syntax_err_at(&self, offset: usize, msg: &str) -> ParserError {
        let window_end = (offset + 16).min(self.pending.len());
        let snippet = String::from_utf8_lossy(&self.pending[offset..window_end]).into_owned();
        self.err_at(
            ErrorKind::Syntax {
                snippet: format!("{msg}: '{snippet}'"),
            },
            offset,
        )
    }

    fn syntax_err(&self, msg: &str) -> ParserError {
        self.syntax_err_at(self.pos, msg)
    }

    fn schema_mismatch(&self, attach: &Attach<S::Cursor>, reason: &str) -> ParserError {
        self.err_kind(ErrorKind::SchemaMismatch {
            field: attach.field_name(),
            reason: reason.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamic_sink::DynamicMessageSink;
    use prost_reflect::{DescriptorPool, Value};

    fn test_pool() -> DescriptorPool {
        let bytes = include_bytes!(concat!(env!("OUT_DIR"), "/test_messages.bin"));
        DescriptorPool::decode(bytes.as_ref()).unwrap()
    }

    fn parse(message: &str, json: &[&str]) -> prost_reflect::DynamicMessage {
        let pool = test_pool();
        let desc = pool.get_message_by_name(message).unwrap();
        let mut parser = Parser::new(desc, DynamicMessageSink::new(), ParserOptions::default());
        for chunk in json {
            parser.feed(chunk.as_bytes()).unwrap();
        }
        parser.finish().unwrap().into_message()
    }

    #[test]
    fn parses_flat_scalars_across_chunk_boundaries() {
        let msg = parse(
            "jsonpb.test.Scalars",
            &[r#"{"x": "hel"#, r#"lo", "i32": 4"#, r#"2, "b": true}"#],
        );
        let x = msg.get_field_by_name("x").unwrap();
        let i32_field = msg.get_field_by_name("i32").unwrap();
        let b = msg.get_field_by_name("b").unwrap();
        assert_eq!(x.as_ref(), &Value::String("hello".to_owned()));
        assert_eq!(i32_field.as_ref(), &Value::I32(42));
        assert_eq!(b.as_ref(), &Value::Bool(true));
    }

    #[test]
    fn accepts_quoted_64_bit_integers() {
        let msg = parse(
            "jsonpb.test.Scalars",
            &[r#"{"u64": "18446744073709551615"}"#],
        );
        let u64_field = msg.get_field_by_name("u64").unwrap();
        assert_eq!(u64_field.as_ref(), &Value::U64(u64::MAX));
    }

    #[test]
    fn decodes_base64_bytes_field() {
        let msg = parse("jsonpb.test.Scalars", &[r#"{"raw": "aGVsbG8="}"#]);
        let raw = msg.get_field_by_name("raw").unwrap();
        assert_eq!(raw.as_ref(), &Value::Bytes(b"hello".to_vec().into()));
    }

    #[test]
    fn resolves_enum_by_name_and_number() {
        let by_name = parse("jsonpb.test.Scalars", &[r#"{"suit": "SUIT_HEARTS"}"#]);
        let by_number = parse("jsonpb.test.Scalars", &[r#"{"suit": 3}"#]);
        let suit = by_name.get_field_by_name("suit").unwrap();
        assert_eq!(suit.as_ref(), &Value::EnumNumber(3));
        assert_eq!(by_number.get_field_by_name("suit").unwrap().as_ref(), &Value::EnumNumber(3));
    }

    #[test]
    fn builds_nested_message_and_repeated_field() {
        let msg = parse(
            "jsonpb.test.WithNested",
            &[r#"{"inner": {"x": "a"}, "many": [{"x": "b"}, {"x": "c"}]}"#],
        );
        let inner = msg.get_field_by_name("inner").unwrap();
        match inner.as_ref() {
            Value::Message(m) => {
                assert_eq!(m.get_field_by_name("x").unwrap().as_ref(), &Value::String("a".to_owned()));
            }
            other => panic!("expected message, got {other:?}"),
        }
        let many = msg.get_field_by_name("many").unwrap();
        match many.as_ref() {
            Value::List(items) => assert_eq!(items.len(), 2),
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn builds_map_fields_with_scalar_keys() {
        let msg = parse(
            "jsonpb.test.WithMap",
            &[r#"{"m": {"1": true, "2": false}, "tags": {"env": "prod"}}"#],
        );
        let m = msg.get_field_by_name("m").unwrap();
        match m.as_ref() {
            Value::Map(entries) => {
                assert_eq!(entries.get(&MapKey::I32(1)), Some(&Value::Bool(true)));
                assert_eq!(entries.get(&MapKey::I32(2)), Some(&Value::Bool(false)));
            }
            other => panic!("expected map, got {other:?}"),
        }
        let tags = msg.get_field_by_name("tags").unwrap();
        match tags.as_ref() {
            Value::Map(entries) => {
                assert_eq!(
                    entries.get(&MapKey::String("env".to_owned())),
                    Some(&Value::String("prod".to_owned()))
                );
            }
            other => panic!("expected map, got {other:?}"),
        }
    }

    #[test]
    fn synthesizes_well_known_duration_timestamp_struct_and_value() {
        let msg = parse(
            "jsonpb.test.WithWellKnown",
            &[
                r#"{"elapsed": "1.5s", "createdAt": "1970-01-01T00:00:01Z","#,
                r#""attrs": {"a": 1, "b": "two", "c": null},"#,
                r#""anyValue": [1, "x", true], "items": ["p", "q"]}"#,
            ],
        );

        let elapsed = msg.get_field_by_name("elapsed").unwrap();
        match elapsed.as_ref() {
            Value::Message(d) => {
                assert_eq!(d.get_field_by_name("seconds").unwrap().as_ref(), &Value::I64(1));
                assert_eq!(
                    d.get_field_by_name("nanos").unwrap().as_ref(),
                    &Value::I32(500_000_000)
                );
            }
            other => panic!("expected message, got {other:?}"),
        }

        let attrs = msg.get_field_by_name("attrs").unwrap();
        let Value::Message(attrs) = attrs.as_ref() else {
            panic!("expected Struct message")
        };
        let fields = attrs.get_field_by_name("fields").unwrap();
        let Value::Map(fields) = fields.as_ref() else {
            panic!("expected map")
        };
        assert!(fields.contains_key(&MapKey::String("a".to_owned())));
        assert!(fields.contains_key(&MapKey::String("c".to_owned())));

        let items = msg.get_field_by_name("items").unwrap();
        let Value::Message(list) = items.as_ref() else {
            panic!("expected ListValue message")
        };
        let values = list.get_field_by_name("values").unwrap();
        let Value::List(values) = values.as_ref() else {
            panic!("expected list")
        };
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn unwraps_scalar_wrapper_types() {
        let msg = parse(
            "jsonpb.test.WithWrappers",
            &[r#"{"count": 7, "label": "x", "flag": true, "ratio": 0.5}"#],
        );
        let count = msg.get_field_by_name("count").unwrap();
        let Value::Message(count) = count.as_ref() else {
            panic!("expected wrapper message")
        };
        assert_eq!(count.get_field_by_name("value").unwrap().as_ref(), &Value::I32(7));
    }

    #[test]
    fn null_on_a_message_field_leaves_it_unset() {
        let msg = parse(
            "jsonpb.test.WithWellKnown",
            &[r#"{"elapsed": null, "attrs": {"a": 1}}"#],
        );
        assert!(!msg.has_field_by_name("elapsed"));
        assert!(msg.has_field_by_name("attrs"));
    }

    #[test]
    fn unknown_field_is_rejected_by_default() {
        let pool = test_pool();
        let desc = pool.get_message_by_name("jsonpb.test.Scalars").unwrap();
        let mut parser = Parser::new(desc, DynamicMessageSink::new(), ParserOptions::default());
        let err = parser.feed(br#"{"nope": 1}"#).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::UnknownField { .. }));
    }

    #[test]
    fn unknown_field_is_skipped_when_configured() {
        let pool = test_pool();
        let desc = pool.get_message_by_name("jsonpb.test.Scalars").unwrap();
        let options = ParserOptions::default().with_ignore_unknown_fields(true);
        let mut parser = Parser::new(desc, DynamicMessageSink::new(), options);
        parser.feed(br#"{"nope": {"deep": [1, 2, 3]}, "x": "kept"}"#).unwrap();
        let msg = parser.finish().unwrap().into_message();
        assert_eq!(
            msg.get_field_by_name("x").unwrap().as_ref(),
            &Value::String("kept".to_owned())
        );
    }

    #[test]
    fn exceeding_max_depth_is_rejected() {
        let pool = test_pool();
        let desc = pool.get_message_by_name("jsonpb.test.WithNested").unwrap();
        let options = ParserOptions::default().with_max_depth(1);
        let mut parser = Parser::new(desc, DynamicMessageSink::new(), options);
        let err = parser.feed(br#"{"inner": {"x": "a"}}"#).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::NestingTooDeep));
    }

    #[test]
    fn trailing_garbage_after_the_value_is_rejected() {
        let pool = test_pool();
        let desc = pool.get_message_by_name("jsonpb.test.Scalars").unwrap();
        let mut parser = Parser::new(desc, DynamicMessageSink::new(), ParserOptions::default());
        parser.feed(br#"{"x": "a"} garbage"#).unwrap_err();
    }

    #[test]
    fn unterminated_input_is_rejected_at_finish() {
        let pool = test_pool();
        let desc = pool.get_message_by_name("jsonpb.test.Scalars").unwrap();
        let mut parser = Parser::new(desc, DynamicMessageSink::new(), ParserOptions::default());
        parser.feed(br#"{"x": "a""#).unwrap();
        assert!(parser.finish().is_err());
    }

    /// A chunk boundary falling anywhere — mid-token, mid-escape, between a
    /// high and low surrogate, inside a number's exponent — must not change
    /// the parsed result. Splits a handful of representative documents at
    /// every possible byte offset and compares against a single-shot parse.
    #[test]
    fn result_is_independent_of_where_chunk_boundaries_fall() {
        use prost::Message;

        let documents: &[(&str, &str)] = &[
            (
                "jsonpb.test.Scalars",
                r#"{"x":"heé😀llo","i32":-42,"u64":"18446744073709551615","b":true,"suit":"SUIT_HEARTS"}"#,
            ),
            (
                "jsonpb.test.WithNested",
                r#"{"inner":{"x":"a"},"many":[{"x":"b"},{"x":"c"}]}"#,
            ),
            (
                "jsonpb.test.WithWellKnown",
                r#"{"elapsed":"1.5s","createdAt":"1970-01-01T00:00:01Z","attrs":{"a":1,"b":"two","c":null},"anyValue":3.25,"items":["p","q"]}"#,
            ),
        ];

        let pool = test_pool();
        for (message, json) in documents {
            let desc = pool.get_message_by_name(message).unwrap();
            let bytes = json.as_bytes();
            let baseline = feed_whole(&desc, bytes).encode_to_vec();
            for split in 1..bytes.len() {
                let chunked = feed_split(&desc, bytes, split).encode_to_vec();
                assert_eq!(
                    chunked, baseline,
                    "split at byte {split} of {json:?} produced a different result"
                );
            }
        }
    }

    fn feed_whole(desc: &prost_reflect::MessageDescriptor, bytes: &[u8]) -> prost_reflect::DynamicMessage {
        let mut parser = Parser::new(desc.clone(), DynamicMessageSink::new(), ParserOptions::default());
        parser.feed(bytes).unwrap();
        parser.finish().unwrap().into_message()
    }

    fn feed_split(
        desc: &prost_reflect::MessageDescriptor,
        bytes: &[u8],
        split: usize,
    ) -> prost_reflect::DynamicMessage {
        let mut parser = Parser::new(desc.clone(), DynamicMessageSink::new(), ParserOptions::default());
        parser.feed(&bytes[..split]).unwrap();
        parser.feed(&bytes[split..]).unwrap();
        parser.finish().unwrap().into_message()
    }

    #[test]
    fn accepts_a_document_built_with_serde_json() {
        let doc = serde_json::json!({
            "x": "from serde_json",
            "i32": -7,
            "suit": "SUIT_SPADES",
        });
        let msg = parse("jsonpb.test.Scalars", &[&doc.to_string()]);
        assert_eq!(
            msg.get_field_by_name("x").unwrap().as_ref(),
            &Value::String("from serde_json".to_owned())
        );
        assert_eq!(msg.get_field_by_name("i32").unwrap().as_ref(), &Value::I32(-7));
    }
}
