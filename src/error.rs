use thiserror::Error;

use crate::{
    evaluator::EvalError, parser::ParseError, schema::SchemaError, validate::ValidationError,
};

/// Any failure from compiling or running an expression.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error("invalid options: {0}")]
    Options(String),
}
