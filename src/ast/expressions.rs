use std::fmt;

use super::operators::{BinaryOperator, CollectionOperator, MatchOperator, UnaryOperator};

/// Which selector syntax produced a [`Selector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorType {
    /// `foo.bar["baz"]`
    Bexpr,
    /// `"/foo/bar/baz"`
    JsonPointer,
}

/// An ordered, non-empty path into a datum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub kind: SelectorType,
    pub path: Vec<String>,
}

impl Selector {
    pub fn new(kind: SelectorType, path: Vec<String>) -> Self {
        Selector { kind, path }
    }

    /// Shorthand for a dotted selector, mostly useful in tests.
    pub fn bexpr<I, S>(path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Selector::new(SelectorType::Bexpr, path.into_iter().map(Into::into).collect())
    }

    /// The path as a JSON pointer, used in resolution errors.
    pub fn pointer(&self) -> String {
        pointer_string(&self.path)
    }

    /// A selector of the same kind over the first `len` segments.
    pub fn prefix(&self, len: usize) -> Selector {
        Selector::new(self.kind, self.path[..len.min(self.path.len())].to_vec())
    }
}

pub(crate) fn pointer_string(path: &[String]) -> String {
    path.iter()
        .map(|segment| format!("/{}", segment.replace('~', "~0").replace('/', "~1")))
        .collect()
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            SelectorType::Bexpr => f.write_str(&self.path.join(".")),
            SelectorType::JsonPointer => f.write_str(&self.pointer()),
        }
    }
}

/// A literal exactly as the user wrote it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchValue {
    pub raw: String,
}

impl MatchValue {
    pub fn new(raw: impl Into<String>) -> Self {
        MatchValue { raw: raw.into() }
    }
}

/// `<selector> <operator> [<value>]`
#[derive(Debug, Clone, PartialEq)]
pub struct MatchExpression {
    pub selector: Selector,
    pub operator: MatchOperator,
    pub value: Option<MatchValue>,
}

/// Names bound by `any`/`all` while evaluating the inner expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionBinding {
    /// `as name`: the element for lists, the key for maps.
    Default(String),
    /// `as name, _`
    Index(String),
    /// `as _, name`
    Value(String),
    /// `as index, value`
    IndexAndValue { index: String, value: String },
}

impl CollectionBinding {
    pub fn index_name(&self) -> Option<&str> {
        match self {
            CollectionBinding::Index(name) => Some(name),
            CollectionBinding::IndexAndValue { index, .. } => Some(index),
            _ => None,
        }
    }

    pub fn value_name(&self) -> Option<&str> {
        match self {
            CollectionBinding::Value(name) => Some(name),
            CollectionBinding::IndexAndValue { value, .. } => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for CollectionBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionBinding::Default(name) => write!(f, "{}", name),
            CollectionBinding::Index(name) => write!(f, "{}, _", name),
            CollectionBinding::Value(name) => write!(f, "_, {}", name),
            CollectionBinding::IndexAndValue { index, value } => write!(f, "{}, {}", index, value),
        }
    }
}

/// `any|all <selector> as <binding> { <inner> }`
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionExpression {
    pub selector: Selector,
    pub operator: CollectionOperator,
    pub binding: CollectionBinding,
    pub inner: Box<Expression>,
}

/// A parsed, not yet validated expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Match(MatchExpression),

    Unary {
        operator: UnaryOperator,
        operand: Box<Expression>,
    },

    Binary {
        operator: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },

    Collection(CollectionExpression),
}

impl Expression {
    pub fn and(left: Expression, right: Expression) -> Self {
        Expression::Binary {
            operator: BinaryOperator::And,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn or(left: Expression, right: Expression) -> Self {
        Expression::Binary {
            operator: BinaryOperator::Or,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn not(operand: Expression) -> Self {
        Expression::Unary {
            operator: UnaryOperator::Not,
            operand: Box::new(operand),
        }
    }

    /// Number of match leaves in the tree.
    pub fn match_count(&self) -> usize {
        match self {
            Expression::Match(_) => 1,
            Expression::Unary { operand, .. } => operand.match_count(),
            Expression::Binary { left, right, .. } => left.match_count() + right.match_count(),
            Expression::Collection(collection) => collection.inner.match_count(),
        }
    }
}
