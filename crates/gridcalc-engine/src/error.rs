//! Evaluation error types.

use thiserror::Error;

/// Why a formula could not produce a value.
///
/// These never escape a cell: the grid renders them as `#ERROR! (<message>)`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("unresolved reference {0}")]
    UnresolvedReference(String),

    #[error("unsupported expression: {0}")]
    UnsupportedExpression(String),

    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("exponent {exponent} exceeds the limit of {limit}")]
    ExponentTooLarge { exponent: f64, limit: f64 },

    #[error("circular reference")]
    CircularReference,

    #[error("formula nesting deeper than {0} levels")]
    TooDeep(usize),

    #[error("{function}() takes {expected} argument(s) but {actual} were given")]
    ArgumentCount {
        function: &'static str,
        expected: String,
        actual: usize,
    },

    #[error("type error: {0}")]
    TypeMismatch(String),

    #[error("math domain error in {0}()")]
    Domain(&'static str),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("numeric overflow")]
    Overflow,
}

pub type EvalResult<T> = std::result::Result<T, EvalError>;
