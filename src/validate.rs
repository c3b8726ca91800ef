//! Checks a parsed expression against field configurations and produces
//! the immutable tree the evaluator runs.
//!
//! Per match node the validator resolves the selector through the schema,
//! confirms the operator is supported there, coerces the literal once and
//! compiles regular expressions. Selectors that walk through a list before
//! their last segment are rewritten into an `any` over that list:
//!
//! ```text
//! Nested.SliceOfStructs.X == 1
//! ```
//!
//! becomes
//!
//! ```text
//! any Nested.SliceOfStructs as _, $v { $v.X == 1 }
//! ```

use std::{
    fmt::{self, Write},
    sync::Arc,
};

use once_cell::sync::OnceCell;
use regex::Regex;
use thiserror::Error;

use crate::{
    ast::{
        BinaryOperator, CollectionBinding, CollectionOperator, Expression, MatchExpression,
        MatchOperator, Selector, UnaryOperator,
        dump::{self, Dump},
    },
    coerce::{CoerceError, Coerced},
    schema::{CollectionType, FieldConfiguration, FieldConfigurations},
};

/// Name bound by implicit `any` rewrites. Not writable in expression text.
pub const IMPLICIT_BINDING: &str = "$v";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Selector \"{selector}\" is not valid")]
    InvalidSelector { selector: String },

    #[error("Invalid match operator \"{operator}\" for selector \"{selector}\"")]
    UnsupportedOperator {
        operator: MatchOperator,
        selector: String,
    },

    #[error("Match operator \"{operator}\" requires a non-nil value")]
    MissingValue { operator: MatchOperator },

    #[error("Failed to coerce value \"{raw}\" for selector \"{selector}\": {source}")]
    Coercion {
        raw: String,
        selector: String,
        source: CoerceError,
    },

    #[error(
        "Match operator cannot be used with fields whose coercion functions return non string values (selector \"{selector}\")"
    )]
    NonStringPattern { selector: String },

    #[error("Failed to compile regular expression {pattern:?} for selector \"{selector}\": {source}")]
    Regex {
        pattern: String,
        selector: String,
        source: regex::Error,
    },

    #[error("{operator} expression not supported for selector \"{selector}\": not a list or a map")]
    NotACollection {
        operator: CollectionOperator,
        selector: String,
    },

    #[error("Value for selector \"{selector}\" exceeds the maximum length ({max})")]
    ValueTooLong { selector: String, max: usize },

    #[error("Number of match expressions ({count}) exceeds the limit ({max})")]
    TooManyMatches { count: usize, max: usize },
}

/// Validation limits. Zero disables a limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Limits {
    pub max_matches: usize,
    pub max_raw_value_length: usize,
}

/// A literal with its coerced form and, for regex operators, the compiled
/// pattern.
#[derive(Debug, Clone)]
pub struct ValidatedValue {
    pub raw: String,
    /// Set when the schema supplied a coercion for the selector.
    pub converted: Option<Coerced>,
    regex: OnceCell<Regex>,
}

impl ValidatedValue {
    pub fn new(raw: impl Into<String>) -> Self {
        ValidatedValue {
            raw: raw.into(),
            converted: None,
            regex: OnceCell::new(),
        }
    }

    fn pattern(&self) -> &str {
        match &self.converted {
            Some(Coerced::String(s)) => s,
            _ => &self.raw,
        }
    }

    /// The compiled pattern, compiling it on first use.
    pub fn regex(&self) -> Result<&Regex, regex::Error> {
        self.regex.get_or_try_init(|| Regex::new(self.pattern()))
    }
}

#[derive(Debug, Clone)]
pub struct ValidatedMatch {
    pub selector: Selector,
    pub operator: MatchOperator,
    pub value: Option<ValidatedValue>,
}

#[derive(Debug, Clone)]
pub struct ValidatedCollection {
    pub selector: Selector,
    pub operator: CollectionOperator,
    pub binding: CollectionBinding,
    pub inner: Box<ValidatedExpression>,
}

/// Expression tree after validation. Only this form can be evaluated.
#[derive(Debug, Clone)]
pub enum ValidatedExpression {
    Match(ValidatedMatch),
    Unary {
        operator: UnaryOperator,
        operand: Box<ValidatedExpression>,
    },
    Binary {
        operator: BinaryOperator,
        left: Box<ValidatedExpression>,
        right: Box<ValidatedExpression>,
    },
    Collection(ValidatedCollection),
}

impl ValidatedExpression {
    pub fn match_count(&self) -> usize {
        match self {
            ValidatedExpression::Match(_) => 1,
            ValidatedExpression::Unary { operand, .. } => operand.match_count(),
            ValidatedExpression::Binary { left, right, .. } => {
                left.match_count() + right.match_count()
            }
            ValidatedExpression::Collection(c) => c.inner.match_count(),
        }
    }
}

impl Dump for ValidatedExpression {
    fn dump(&self, w: &mut dyn Write, indent: &str, level: usize) -> fmt::Result {
        match self {
            ValidatedExpression::Match(m) => dump::dump_match(
                w,
                indent,
                level,
                m.operator,
                &m.selector,
                m.value.as_ref().map(|v| v.raw.as_str()),
            ),
            ValidatedExpression::Unary { operator, operand } => {
                dump::dump_unary(w, indent, level, *operator, operand.as_ref())
            }
            ValidatedExpression::Binary {
                operator,
                left,
                right,
            } => dump::dump_binary(w, indent, level, *operator, left.as_ref(), right.as_ref()),
            ValidatedExpression::Collection(c) => dump::dump_collection(
                w,
                indent,
                level,
                c.operator,
                &c.selector,
                &c.binding,
                c.inner.as_ref(),
            ),
        }
    }
}

/// Names bound by enclosing collection expressions.
struct Scope<'a> {
    parent: Option<&'a Scope<'a>>,
    bindings: Vec<(String, Arc<FieldConfiguration>)>,
}

impl Scope<'_> {
    fn root() -> Self {
        Scope {
            parent: None,
            bindings: Vec::new(),
        }
    }

    fn lookup(&self, name: &str) -> Option<Arc<FieldConfiguration>> {
        self.bindings
            .iter()
            .find(|(bound, _)| bound == name)
            .map(|(_, configuration)| Arc::clone(configuration))
            .or_else(|| self.parent.and_then(|parent| parent.lookup(name)))
    }
}

pub struct Validator<'a> {
    fields: Option<&'a FieldConfigurations>,
    limits: Limits,
}

impl<'a> Validator<'a> {
    /// An empty schema disables every schema check.
    pub fn new(fields: Option<&'a FieldConfigurations>, limits: Limits) -> Self {
        Validator {
            fields: fields.filter(|f| !f.is_empty()),
            limits,
        }
    }

    /// Validates the whole tree and returns it with its match count. The
    /// match limit is enforced last so per-node errors surface first.
    pub fn validate(
        &self,
        expression: &Expression,
    ) -> Result<(ValidatedExpression, usize), ValidationError> {
        let mut matches = 0;
        let validated = self.validate_node(expression, &Scope::root(), &mut matches)?;

        if self.limits.max_matches > 0 && matches > self.limits.max_matches {
            return Err(ValidationError::TooManyMatches {
                count: matches,
                max: self.limits.max_matches,
            });
        }

        Ok((validated, matches))
    }

    fn validate_node(
        &self,
        expression: &Expression,
        scope: &Scope<'_>,
        matches: &mut usize,
    ) -> Result<ValidatedExpression, ValidationError> {
        match expression {
            Expression::Unary { operator, operand } => Ok(ValidatedExpression::Unary {
                operator: *operator,
                operand: Box::new(self.validate_node(operand, scope, matches)?),
            }),
            Expression::Binary {
                operator,
                left,
                right,
            } => Ok(ValidatedExpression::Binary {
                operator: *operator,
                left: Box::new(self.validate_node(left, scope, matches)?),
                right: Box::new(self.validate_node(right, scope, matches)?),
            }),
            Expression::Match(m) => {
                *matches += 1;
                self.validate_match(m, scope)
            }
            Expression::Collection(c) => {
                let Some(root) = self.fields else {
                    let inner = self.validate_node(&c.inner, scope, matches)?;
                    return Ok(collection_node(c.selector.clone(), c, inner));
                };

                let (configuration, lists) = resolve(root, &c.selector, scope)?;
                if configuration.collection_type == CollectionType::None {
                    return Err(ValidationError::NotACollection {
                        operator: c.operator,
                        selector: c.selector.to_string(),
                    });
                }

                let child = Scope {
                    parent: Some(scope),
                    bindings: binding_fields(&c.binding, &configuration),
                };
                let inner = self.validate_node(&c.inner, &child, matches)?;
                Ok(expand_through_lists(&c.selector, &lists, |selector| {
                    collection_node(selector, c, inner)
                }))
            }
        }
    }

    fn validate_match(
        &self,
        m: &MatchExpression,
        scope: &Scope<'_>,
    ) -> Result<ValidatedExpression, ValidationError> {
        if let Some(value) = &m.value {
            let max = self.limits.max_raw_value_length;
            if max > 0 && value.raw.len() > max {
                return Err(ValidationError::ValueTooLong {
                    selector: m.selector.to_string(),
                    max,
                });
            }
        }
        if m.operator.requires_value() && m.value.is_none() {
            return Err(ValidationError::MissingValue {
                operator: m.operator,
            });
        }

        let Some(root) = self.fields else {
            return Ok(ValidatedExpression::Match(ValidatedMatch {
                selector: m.selector.clone(),
                operator: m.operator,
                value: m.value.as_ref().map(|v| ValidatedValue::new(v.raw.clone())),
            }));
        };

        let (configuration, lists) = resolve(root, &m.selector, scope)?;
        if !configuration.supports(m.operator) {
            return Err(ValidationError::UnsupportedOperator {
                operator: m.operator,
                selector: m.selector.to_string(),
            });
        }

        let value = match &m.value {
            Some(value) => Some(validate_value(m, &value.raw, &configuration)?),
            None => None,
        };

        if !lists.is_empty() {
            log::trace!("expanding {} into an implicit any", m.selector);
        }
        let operator = m.operator;
        Ok(expand_through_lists(&m.selector, &lists, |selector| {
            ValidatedExpression::Match(ValidatedMatch {
                selector,
                operator,
                value,
            })
        }))
    }
}

fn validate_value(
    m: &MatchExpression,
    raw: &str,
    configuration: &FieldConfiguration,
) -> Result<ValidatedValue, ValidationError> {
    let mut value = ValidatedValue::new(raw);

    if let Some(coerce) = configuration.coerce_fn {
        let converted = coerce(raw).map_err(|source| ValidationError::Coercion {
            raw: raw.to_string(),
            selector: m.selector.to_string(),
            source,
        })?;
        value.converted = Some(converted);
    }

    if matches!(m.operator, MatchOperator::Matches | MatchOperator::NotMatches) {
        if !matches!(value.converted, None | Some(Coerced::String(_))) {
            return Err(ValidationError::NonStringPattern {
                selector: m.selector.to_string(),
            });
        }
        value.regex().map_err(|source| ValidationError::Regex {
            pattern: value.pattern().to_string(),
            selector: m.selector.to_string(),
            source,
        })?;
    }

    Ok(value)
}

/// Walks the schema along `selector`. Returns the final configuration and
/// the positions of list fields crossed before the last segment.
fn resolve(
    root: &FieldConfigurations,
    selector: &Selector,
    scope: &Scope<'_>,
) -> Result<(Arc<FieldConfiguration>, Vec<usize>), ValidationError> {
    let invalid = |len: usize| ValidationError::InvalidSelector {
        selector: selector.prefix(len).to_string(),
    };

    let Some(first) = selector.path.first() else {
        return Err(invalid(0));
    };
    let mut current = scope
        .lookup(first)
        .or_else(|| root.lookup(first).cloned())
        .ok_or_else(|| invalid(1))?;

    let mut lists = Vec::new();
    for (i, segment) in selector.path.iter().enumerate().skip(1) {
        if current.collection_type == CollectionType::List {
            lists.push(i - 1);
        }
        current = current
            .sub_fields
            .lookup(segment)
            .cloned()
            .ok_or_else(|| invalid(i + 1))?;
    }

    Ok((current, lists))
}

/// Configurations for the names a collection expression binds.
fn binding_fields(
    binding: &CollectionBinding,
    configuration: &FieldConfiguration,
) -> Vec<(String, Arc<FieldConfiguration>)> {
    let index = configuration.index_configuration.as_ref();
    let value = configuration.value_configuration.as_ref();

    let named: Vec<(&str, Option<&Arc<FieldConfiguration>>)> = match binding {
        CollectionBinding::Default(name) => {
            // Lists bind their elements, maps their keys
            let bound = if configuration.collection_type == CollectionType::Map {
                index
            } else {
                value
            };
            vec![(name.as_str(), bound)]
        }
        CollectionBinding::Index(name) => vec![(name.as_str(), index)],
        CollectionBinding::Value(name) => vec![(name.as_str(), value)],
        CollectionBinding::IndexAndValue {
            index: index_name,
            value: value_name,
        } => vec![(index_name.as_str(), index), (value_name.as_str(), value)],
    };

    named
        .into_iter()
        .filter_map(|(name, configuration)| {
            configuration.map(|c| (name.to_string(), Arc::clone(c)))
        })
        .collect()
}

fn collection_node(
    selector: Selector,
    collection: &crate::ast::CollectionExpression,
    inner: ValidatedExpression,
) -> ValidatedExpression {
    ValidatedExpression::Collection(ValidatedCollection {
        selector,
        operator: collection.operator,
        binding: collection.binding.clone(),
        inner: Box::new(inner),
    })
}

/// Wraps the node built by `leaf` in one `any` per crossed list, innermost
/// last. Each nested selector is relative to the element bound outside it.
fn expand_through_lists<F>(selector: &Selector, lists: &[usize], leaf: F) -> ValidatedExpression
where
    F: FnOnce(Selector) -> ValidatedExpression,
{
    let segment = |from: usize, to: usize| {
        let mut path = Vec::with_capacity(to - from + 1);
        if from > 0 {
            path.push(IMPLICIT_BINDING.to_string());
        }
        path.extend_from_slice(&selector.path[from..to]);
        Selector::new(selector.kind, path)
    };

    let mut collection_selectors = Vec::with_capacity(lists.len());
    let mut start = 0;
    for &list in lists {
        collection_selectors.push(segment(start, list + 1));
        start = list + 1;
    }

    let mut expression = leaf(segment(start, selector.path.len()));
    for collection_selector in collection_selectors.into_iter().rev() {
        expression = ValidatedExpression::Collection(ValidatedCollection {
            selector: collection_selector,
            operator: CollectionOperator::Any,
            binding: CollectionBinding::Value(IMPLICIT_BINDING.to_string()),
            inner: Box::new(expression),
        });
    }
    expression
}
