use std::{collections::BTreeMap, fmt, sync::Arc};

use crate::matcher::CustomMatcher;

/// A host datum as seen by the evaluator.
///
/// Host types convert into this model through [`crate::Selectable`].
/// Integer and float widths are kept apart so comparisons can follow the
/// field's declared kind:
///
/// - `i8`..`i64` and `isize` become [`Value::Int`]
/// - `u8`..`u64` and `usize` become [`Value::Uint`]
/// - `f32` stays [`Value::Float32`], `f64` is [`Value::Float64`]
///
/// # Examples
///
/// ```
/// use bexpr::Value;
/// use std::collections::BTreeMap;
///
/// let mut labels = BTreeMap::new();
/// labels.insert("env".to_string(), Value::from("prod"));
///
/// let datum = Value::Map(BTreeMap::from([
///     ("port".to_string(), Value::Int(80)),
///     ("labels".to_string(), Value::Map(labels)),
///     ("tags".to_string(), Value::List(vec![Value::from("a"), Value::from("b")])),
/// ]));
/// assert_eq!(datum.kind().to_string(), "map");
/// ```
#[derive(Clone)]
pub enum Value {
    /// Absent optional value. Treated as "not found" by the evaluator.
    Null,

    Bool(bool),

    /// Signed integer of any width
    Int(i64),

    /// Unsigned integer of any width
    Uint(u64),

    Float32(f32),

    Float64(f64),

    String(String),

    /// Ordered sequence, indexable by position
    List(Vec<Value>),

    /// Map keyed by strings
    Map(BTreeMap<String, Value>),

    /// Map whose keys are not strings. Only emptiness can be tested.
    Pairs(Vec<(Value, Value)>),

    /// Struct-like value with named, possibly tagged fields
    Record(Record),

    /// Value that decides matches itself
    Custom(Arc<dyn CustomMatcher>),
}

/// Broad classification of a [`Value`], used in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    Uint,
    Float32,
    Float64,
    String,
    List,
    Map,
    Record,
    Custom,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Uint => "uint",
            ValueKind::Float32 => "float32",
            ValueKind::Float64 => "float64",
            ValueKind::String => "string",
            ValueKind::List => "list",
            ValueKind::Map => "map",
            ValueKind::Record => "struct",
            ValueKind::Custom => "custom",
        };
        f.write_str(name)
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Uint(_) => ValueKind::Uint,
            Value::Float32(_) => ValueKind::Float32,
            Value::Float64(_) => ValueKind::Float64,
            Value::String(_) => ValueKind::String,
            Value::List(_) => ValueKind::List,
            Value::Map(_) | Value::Pairs(_) => ValueKind::Map,
            Value::Record(_) => ValueKind::Record,
            Value::Custom(_) => ValueKind::Custom,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Length for the kinds that have one.
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::String(s) => Some(s.len()),
            Value::List(items) => Some(items.len()),
            Value::Map(map) => Some(map.len()),
            Value::Pairs(pairs) => Some(pairs.len()),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> Option<bool> {
        self.len().map(|len| len == 0)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Int(n) => f.debug_tuple("Int").field(n).finish(),
            Value::Uint(n) => f.debug_tuple("Uint").field(n).finish(),
            Value::Float32(n) => f.debug_tuple("Float32").field(n).finish(),
            Value::Float64(n) => f.debug_tuple("Float64").field(n).finish(),
            Value::String(s) => f.debug_tuple("String").field(s).finish(),
            Value::List(items) => f.debug_tuple("List").field(items).finish(),
            Value::Map(map) => f.debug_tuple("Map").field(map).finish(),
            Value::Pairs(pairs) => f.debug_tuple("Pairs").field(pairs).finish(),
            Value::Record(record) => fmt::Debug::fmt(record, f),
            Value::Custom(matcher) => f.debug_tuple("Custom").field(matcher).finish(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Uint(a), Value::Uint(b)) => a == b,
            (Value::Float32(a), Value::Float32(b)) => a == b,
            (Value::Float64(a), Value::Float64(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Pairs(a), Value::Pairs(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => a == b,
            (Value::Custom(a), Value::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float64(n)
    }
}

/// Whether a record field is reachable from expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordField {
    pub name: String,
    pub visibility: Visibility,
    /// Per-field directives as `(tag name, tag value)` pairs.
    pub tags: Vec<(String, String)>,
    pub value: Value,
}

impl RecordField {
    pub fn tag(&self, tag_name: &str) -> Option<&str> {
        lookup_tag(&self.tags, tag_name)
    }
}

pub(crate) fn lookup_tag<'a>(tags: &'a [(String, String)], tag_name: &str) -> Option<&'a str> {
    tags.iter()
        .find(|(name, _)| name == tag_name)
        .map(|(_, value)| value.as_str())
}

/// Struct-like datum. Fields keep their declaration order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    pub type_name: String,
    pub fields: Vec<RecordField>,
}

impl Record {
    pub fn new(type_name: impl Into<String>) -> Self {
        Record {
            type_name: type_name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(name, Visibility::Public, Vec::new(), value.into())
    }

    pub fn tagged_field(
        self,
        name: impl Into<String>,
        tag_name: impl Into<String>,
        tag_value: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        let tags = vec![(tag_name.into(), tag_value.into())];
        self.push(name, Visibility::Public, tags, value.into())
    }

    pub fn private_field(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(name, Visibility::Private, Vec::new(), value.into())
    }

    pub fn push(
        mut self,
        name: impl Into<String>,
        visibility: Visibility,
        tags: Vec<(String, String)>,
        value: Value,
    ) -> Self {
        self.fields.push(RecordField {
            name: name.into(),
            visibility,
            tags,
            value,
        });
        self
    }

    /// Field by its declared name.
    pub fn get(&self, name: &str) -> Option<&RecordField> {
        self.fields.iter().find(|field| field.name == name)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Record(record)
    }
}
