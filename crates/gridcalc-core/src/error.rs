//! Error types for Gridcalc core.

use thiserror::Error;

use gridcalc_engine::EvalError;

/// Errors returned by grid operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridError {
    #[error("{axis} {index} is out of bounds (count is {count})")]
    OutOfBounds {
        axis: &'static str,
        index: usize,
        count: usize,
    },

    #[error("invalid column name '{0}': expected [A-Za-z_][A-Za-z0-9_]*")]
    InvalidIdentifier(String),

    #[error("invalid reference '{0}'")]
    InvalidReference(String),

    #[error(transparent)]
    Eval(#[from] EvalError),
}

impl GridError {
    pub(crate) fn row(index: usize, count: usize) -> GridError {
        GridError::OutOfBounds {
            axis: "row",
            index,
            count,
        }
    }

    pub(crate) fn column(index: usize, count: usize) -> GridError {
        GridError::OutOfBounds {
            axis: "column",
            index,
            count,
        }
    }
}

pub type Result<T> = std::result::Result<T, GridError>;
