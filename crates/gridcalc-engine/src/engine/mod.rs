//! Spreadsheet formula engine API.
//!
//! This module provides the computation core of a grid:
//!
//! - [`CellRef`], [`find_reference_tokens`] - `[Column]Row` reference syntax
//! - [`ColumnNames`] - Column display names and token resolution
//! - [`DependencyTracker`] - Reverse dependency bookkeeping
//! - [`parse_formula`], [`Expr`] - Safe formula grammar
//! - [`Evaluator`] - Pull-based evaluation with circular reference detection
//! - [`rewrite_formula`] - Relative reference shifting for fill/copy
//! - [`format_value`] - Format values for display

mod ast;
mod cell_ref;
mod columns;
mod deps;
mod eval;
mod format;
mod functions;
mod parser;
mod rewrite;
mod value;

pub use ast::{BinaryOp, Expr, UnaryOp};
pub use cell_ref::{
    CellRef, ReferenceToken, col_to_letters, find_reference_tokens,
    is_valid_identifier, letters_to_col, parse_reference_token,
};
pub use columns::{ColumnNames, NameCollision};
pub use deps::{DependencyTracker, extract_dependencies};
pub use eval::{CellSource, DEFAULT_MAX_EXPONENT, Evaluator};
pub use format::{MAX_DECIMALS, format_error, format_fixed, format_number, format_value};
pub use functions::{FUNCTIONS, Function, FunctionInfo};
pub use parser::{MAX_NESTING_DEPTH, parse_formula, parse_formula_at_depth};
pub use rewrite::rewrite_formula;
pub use value::{Value, parse_number};
