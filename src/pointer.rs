//! Resolves selector paths against a [`Value`].
//!
//! Records are searched by exposed name (tag aliases first, declared name
//! otherwise), string maps by key, lists by decimal index. A custom value
//! stops resolution and receives the remaining segments.

use std::{borrow::Cow, fmt, sync::Arc};

use thiserror::Error;

use crate::{
    ast::expressions::pointer_string,
    matcher::CustomMatcher,
    value::{Record, Value, ValueKind, Visibility},
};

/// Outcome of a [`ValueTransformationHook`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum Transformed {
    /// Continue with the value as found.
    Keep,
    /// Continue with a different value.
    Replace(Value),
    /// Treat the value as nil, failing resolution.
    Nil,
}

/// Called on every value reached while walking a selector, after each
/// segment is looked up. The starting value (the root datum or a bound
/// element) is never passed, so a one-segment selector makes one call.
pub type ValueTransformationHook = Arc<dyn Fn(&Value) -> Transformed + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PointerErrorKind {
    #[error("couldn't find key {0:?}")]
    KeyNotFound(String),

    #[error("couldn't find key: struct field with name {0:?}")]
    FieldNotFound(String),

    #[error("struct field {0:?} is ignored and cannot be used")]
    FieldIgnored(String),

    #[error("index {index} out of range for list of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("invalid list index {0:?}")]
    InvalidIndex(String),

    #[error("value is nil")]
    Nil,

    #[error("invalid value kind: {0}")]
    InvalidKind(ValueKind),

    #[error("value transformation hook returned nil")]
    HookReturnedNil,
}

impl PointerErrorKind {
    /// A key, index or optional value that is simply absent.
    pub fn is_missing(&self) -> bool {
        matches!(
            self,
            PointerErrorKind::KeyNotFound(_)
                | PointerErrorKind::IndexOutOfRange { .. }
                | PointerErrorKind::Nil
        )
    }

    /// Any "nothing there" outcome, including unknown record fields.
    pub fn is_not_found(&self) -> bool {
        self.is_missing() || matches!(self, PointerErrorKind::FieldNotFound(_))
    }
}

/// Resolution failure at a given segment of a pointer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{pointer} at part {part}: {kind}")]
pub struct PointerError {
    pub pointer: String,
    pub part: usize,
    pub kind: PointerErrorKind,
}

/// Result of a successful resolution.
pub enum Resolved<'v> {
    Value(Cow<'v, Value>),
    /// A custom matcher was reached; `rest` is the index of the first
    /// segment it has to handle.
    Custom {
        matcher: Arc<dyn CustomMatcher>,
        rest: usize,
    },
}

impl fmt::Debug for Resolved<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolved::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Resolved::Custom { rest, .. } => f.debug_struct("Custom").field("rest", rest).finish(),
        }
    }
}

pub struct Pointer<'p> {
    path: &'p [String],
    tag_name: &'p str,
    hook: Option<&'p ValueTransformationHook>,
}

impl<'p> Pointer<'p> {
    pub fn new(path: &'p [String], tag_name: &'p str) -> Self {
        Pointer {
            path,
            tag_name,
            hook: None,
        }
    }

    pub fn with_hook(mut self, hook: Option<&'p ValueTransformationHook>) -> Self {
        self.hook = hook;
        self
    }

    fn error(&self, part: usize, kind: PointerErrorKind) -> PointerError {
        PointerError {
            pointer: pointer_string(self.path),
            part,
            kind,
        }
    }

    /// Resolves the whole path from `root`.
    pub fn get<'v>(&self, root: &'v Value) -> Result<Resolved<'v>, PointerError> {
        self.get_from(root, 0)
    }

    /// Resolves `path[start..]` from `value`, which stands for `path[..start]`.
    pub fn get_from<'v>(&self, value: &'v Value, start: usize) -> Result<Resolved<'v>, PointerError> {
        let mut current: Cow<'v, Value> = Cow::Borrowed(value);

        for (part, segment) in self.path.iter().enumerate().skip(start) {
            if let Value::Custom(matcher) = current.as_ref() {
                return Ok(Resolved::Custom {
                    matcher: Arc::clone(matcher),
                    rest: part,
                });
            }

            let next = match current {
                Cow::Borrowed(v) => lookup(v, segment, self.tag_name).map(Cow::Borrowed),
                Cow::Owned(v) => lookup(&v, segment, self.tag_name).map(|c| Cow::Owned(c.clone())),
            }
            .map_err(|kind| self.error(part, kind))?;

            current = match self.hook.map(|hook| hook(&next)) {
                None | Some(Transformed::Keep) => next,
                Some(Transformed::Replace(replacement)) => Cow::Owned(replacement),
                Some(Transformed::Nil) => {
                    return Err(self.error(part, PointerErrorKind::HookReturnedNil));
                }
            };
        }

        if let Value::Custom(matcher) = current.as_ref() {
            return Ok(Resolved::Custom {
                matcher: Arc::clone(matcher),
                rest: self.path.len(),
            });
        }
        Ok(Resolved::Value(current))
    }
}

fn lookup<'a>(value: &'a Value, segment: &str, tag_name: &str) -> Result<&'a Value, PointerErrorKind> {
    match value {
        Value::Map(map) => map
            .get(segment)
            .ok_or_else(|| PointerErrorKind::KeyNotFound(segment.to_string())),
        Value::Pairs(pairs) => pairs
            .iter()
            .find(|(key, _)| key_matches(key, segment))
            .map(|(_, v)| v)
            .ok_or_else(|| PointerErrorKind::KeyNotFound(segment.to_string())),
        Value::List(items) => {
            let index: usize = segment
                .parse()
                .map_err(|_| PointerErrorKind::InvalidIndex(segment.to_string()))?;
            items.get(index).ok_or(PointerErrorKind::IndexOutOfRange {
                index,
                len: items.len(),
            })
        }
        Value::Record(record) => record_field(record, segment, tag_name),
        Value::Null => Err(PointerErrorKind::Nil),
        other => Err(PointerErrorKind::InvalidKind(other.kind())),
    }
}

fn key_matches(key: &Value, segment: &str) -> bool {
    match key {
        Value::String(s) => s == segment,
        Value::Bool(b) => b.to_string() == segment,
        Value::Int(n) => n.to_string() == segment,
        Value::Uint(n) => n.to_string() == segment,
        Value::Float32(n) => n.to_string() == segment,
        Value::Float64(n) => n.to_string() == segment,
        _ => false,
    }
}

fn record_field<'a>(
    record: &'a Record,
    segment: &str,
    tag_name: &str,
) -> Result<&'a Value, PointerErrorKind> {
    for field in &record.fields {
        if field.visibility == Visibility::Private {
            continue;
        }
        match field.tag(tag_name) {
            Some("-") if field.name == segment => {
                return Err(PointerErrorKind::FieldIgnored(segment.to_string()));
            }
            Some("-") => {}
            Some(tag) => {
                let aliases: Vec<&str> = tag.split(',').map(str::trim).filter(|a| !a.is_empty()).collect();
                let matched = if aliases.is_empty() {
                    field.name == segment
                } else {
                    aliases.contains(&segment)
                };
                if matched {
                    return Ok(&field.value);
                }
            }
            None if field.name == segment => return Ok(&field.value),
            None => {}
        }
    }
    Err(PointerErrorKind::FieldNotFound(segment.to_string()))
}
