//! Run bexpr expressions against JSON input

use super::CliError;
use crate::{
    Dump, Evaluator, EvaluatorOptions, Filter, Value,
    convert::{json_to_value, value_to_json},
    parser::{self, ParseOptions},
};

/// Options shared by the eval and filter commands
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// The expression to run
    pub expression: String,
    /// JSON input string
    pub input: Option<String>,
    /// Maximum number of match expressions (0 = unlimited)
    pub max_expressions: usize,
    /// Maximum literal length (0 = unlimited)
    pub max_value_length: usize,
    /// Value substituted for missing selectors, as JSON or a bare string
    pub unknown: Option<String>,
    /// Fail when a selector resolves to nothing
    pub error_on_missing: bool,
}

impl RunOptions {
    fn evaluator_options(&self) -> EvaluatorOptions {
        let mut options = EvaluatorOptions::new()
            .with_max_expressions(self.max_expressions)
            .with_max_raw_value_length(self.max_value_length);
        if let Some(unknown) = &self.unknown {
            options = options.with_unknown_value(unknown_value(unknown));
        }
        if self.error_on_missing {
            options = options.with_error_on_missing();
        }
        options
    }

    fn document(&self) -> Result<Value, CliError> {
        let json_str = self.input.as_ref().ok_or(CliError::NoInput)?;
        let json: serde_json::Value = serde_json::from_str(json_str)?;
        Ok(json_to_value(json))
    }
}

fn unknown_value(raw: &str) -> Value {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(json) => json_to_value(json),
        Err(_) => Value::String(raw.to_string()),
    }
}

/// Parse an expression and return its dump
pub fn execute_parse(expression: &str, max_expressions: usize) -> Result<String, CliError> {
    let expr = parser::parse_with_options(expression, ParseOptions { max_expressions })?;
    Ok(expr.dump_string())
}

/// Evaluate an expression against one JSON document
pub fn execute_eval(options: &RunOptions) -> Result<bool, CliError> {
    let evaluator = Evaluator::new(&options.expression, options.evaluator_options())?;
    let document = options.document()?;
    Ok(evaluator.evaluate_value(&document)?)
}

/// Keep the elements of a JSON array or object matching an expression
pub fn execute_filter(options: &RunOptions) -> Result<serde_json::Value, CliError> {
    let filter = Filter::new(&options.expression, options.evaluator_options())?;
    let document = options.document()?;
    let kept = filter.execute_value(&document)?;
    Ok(value_to_json(&kept))
}
