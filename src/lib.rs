//! Boolean expressions over structured data.
//!
//! ```
//! use bexpr::{Evaluator, EvaluatorOptions, Value};
//!
//! let datum: Value = serde_json::json!({"port": 80, "tags": ["prod", "web"]}).into();
//! let eval = Evaluator::new("tags contains prod and port == 80", EvaluatorOptions::new()).unwrap();
//! assert!(eval.evaluate_value(&datum).unwrap());
//! ```

pub mod ast;
pub mod coerce;
pub mod convert;
pub mod error;
pub mod evaluator;
pub mod filter;
pub mod lexer;
pub mod matcher;
pub mod options;
pub mod parser;
pub mod pointer;
pub mod registry;
pub mod schema;
pub mod selectable;
pub mod validate;
pub mod value;

#[cfg(feature = "cli")]
pub mod cli;

pub use ast::{Dump, Expression, MatchOperator, Selector, Token};
pub use error::Error;
pub use evaluator::{EvalContext, EvalError, Evaluator};
pub use filter::Filter;
pub use lexer::{LexError, Lexer, Position};
pub use matcher::{CustomMatcher, MatcherError};
pub use options::{EvaluatorOptions, NotFoundPolicy};
pub use parser::{ParseError, ParseOptions, Parser, parse};
pub use pointer::{Transformed, ValueTransformationHook};
pub use registry::{NilRegistry, Registry, SyncRegistry};
pub use schema::{FieldConfiguration, FieldConfigurations, SchemaError};
pub use selectable::Selectable;
pub use validate::ValidationError;
pub use value::{Record, Value, ValueKind};
