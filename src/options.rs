use std::{fmt, sync::Arc};

use crate::{
    error::Error,
    parser::ParseOptions,
    pointer::ValueTransformationHook,
    registry::{NilRegistry, Registry},
    schema::DEFAULT_TAG_NAME,
    validate::Limits,
    value::Value,
};

/// What evaluation does when a selector resolves to nothing.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum NotFoundPolicy {
    /// Negative operators hold, positive ones fail, `all` holds.
    #[default]
    Default,
    /// Evaluate as if the selector had resolved to this value.
    Unknown(Value),
    /// Fail the evaluation.
    Error,
}

/// Settings for [`crate::Evaluator`] construction.
///
/// ```
/// use bexpr::{EvaluatorOptions, Value};
///
/// let options = EvaluatorOptions::new()
///     .with_max_expressions(32)
///     .with_tag_name("json")
///     .with_unknown_value(Value::from(""));
/// assert_eq!(options.tag_name(), "json");
/// ```
#[derive(Clone)]
pub struct EvaluatorOptions {
    max_expressions: usize,
    max_raw_value_length: usize,
    tag_name: String,
    unknown_value: Option<Value>,
    error_on_missing: bool,
    hook: Option<ValueTransformationHook>,
    registry: Arc<dyn Registry>,
}

impl Default for EvaluatorOptions {
    fn default() -> Self {
        EvaluatorOptions {
            max_expressions: 0,
            max_raw_value_length: 0,
            tag_name: DEFAULT_TAG_NAME.to_string(),
            unknown_value: None,
            error_on_missing: false,
            hook: None,
            registry: Arc::new(NilRegistry),
        }
    }
}

impl fmt::Debug for EvaluatorOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluatorOptions")
            .field("max_expressions", &self.max_expressions)
            .field("max_raw_value_length", &self.max_raw_value_length)
            .field("tag_name", &self.tag_name)
            .field("unknown_value", &self.unknown_value)
            .field("error_on_missing", &self.error_on_missing)
            .field("hook", &self.hook.is_some())
            .finish_non_exhaustive()
    }
}

impl EvaluatorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maximum number of match expressions. Zero means unlimited.
    pub fn with_max_expressions(mut self, max: usize) -> Self {
        self.max_expressions = max;
        self
    }

    /// Maximum length of a raw literal. Zero means unlimited.
    pub fn with_max_raw_value_length(mut self, max: usize) -> Self {
        self.max_raw_value_length = max;
        self
    }

    /// Tag consulted on record fields for renames and exclusions.
    pub fn with_tag_name(mut self, tag_name: impl Into<String>) -> Self {
        self.tag_name = tag_name.into();
        self
    }

    pub fn with_unknown_value(mut self, value: Value) -> Self {
        self.unknown_value = Some(value);
        self
    }

    pub fn with_error_on_missing(mut self) -> Self {
        self.error_on_missing = true;
        self
    }

    pub fn with_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Value) -> crate::pointer::Transformed + Send + Sync + 'static,
    {
        self.hook = Some(Arc::new(hook));
        self
    }

    /// Schema source for typed evaluators. Defaults to [`NilRegistry`].
    pub fn with_registry(mut self, registry: Arc<dyn Registry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn tag_name(&self) -> &str {
        &self.tag_name
    }

    pub fn hook(&self) -> Option<&ValueTransformationHook> {
        self.hook.as_ref()
    }

    pub fn registry(&self) -> &Arc<dyn Registry> {
        &self.registry
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            max_expressions: self.max_expressions,
        }
    }

    pub fn limits(&self) -> Limits {
        Limits {
            max_matches: self.max_expressions,
            max_raw_value_length: self.max_raw_value_length,
        }
    }

    /// The selected not-found policy. The unknown value and error-on-missing
    /// settings exclude each other.
    pub fn not_found_policy(&self) -> Result<NotFoundPolicy, Error> {
        match (&self.unknown_value, self.error_on_missing) {
            (Some(_), true) => Err(Error::Options(
                "unknown value and error on missing cannot both be set".to_string(),
            )),
            (Some(value), false) => Ok(NotFoundPolicy::Unknown(value.clone())),
            (None, true) => Ok(NotFoundPolicy::Error),
            (None, false) => Ok(NotFoundPolicy::Default),
        }
    }
}
