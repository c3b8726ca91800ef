use std::fmt;

use thiserror::Error;

use crate::{ast::MatchOperator, coerce::Coerced};

/// Failure reported by a [`CustomMatcher`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct MatcherError(pub String);

impl MatcherError {
    pub fn new(message: impl Into<String>) -> Self {
        MatcherError(message.into())
    }
}

/// A value that answers match expressions itself instead of being walked.
///
/// The resolver stops when it reaches a custom value and hands over the
/// remaining selector segments. The schema for such a type is supplied by
/// its [`crate::Selectable::describe`] as
/// [`crate::schema::TypeDescriptor::Custom`].
///
/// # Examples
///
/// ```
/// use bexpr::{CustomMatcher, MatchOperator, MatcherError};
/// use bexpr::coerce::Coerced;
///
/// #[derive(Debug)]
/// struct Version(u32);
///
/// impl CustomMatcher for Version {
///     fn evaluate_match(
///         &self,
///         path: &[String],
///         operator: MatchOperator,
///         value: Option<&Coerced>,
///     ) -> Result<bool, MatcherError> {
///         match (path, operator, value) {
///             ([], MatchOperator::Equal, Some(Coerced::Uint(v))) => Ok(*v == self.0 as u64),
///             _ => Err(MatcherError::new("unsupported")),
///         }
///     }
/// }
/// ```
pub trait CustomMatcher: fmt::Debug + Send + Sync {
    /// `path` holds the segments after the custom value; `value` is the
    /// literal, coerced by the schema when one was available.
    fn evaluate_match(
        &self,
        path: &[String],
        operator: MatchOperator,
        value: Option<&Coerced>,
    ) -> Result<bool, MatcherError>;
}
