//! Relative-reference rewriting for fill and copy.
//!
//! Rules:
//! - `[A]1` offset by (+1 row, +1 col) becomes `[B]2`
//! - a shifted token is written with its column's current name and the
//!   new row number, even when only one axis moves
//! - tokens that would land outside the grid are left as written
//! - tokens whose column does not resolve are left as written

use super::cell_ref::{CellRef, find_reference_tokens};
use super::columns::ColumnNames;

/// Offset every resolvable reference in `formula` by (`delta_row`,
/// `delta_col`). `bounds` is (rows, columns) of the grid.
pub fn rewrite_formula(
    formula: &str,
    delta_row: isize,
    delta_col: isize,
    bounds: (usize, usize),
    columns: &ColumnNames,
) -> String {
    if delta_row == 0 && delta_col == 0 {
        return formula.to_string();
    }

    let (rows, cols) = bounds;
    let mut out = String::with_capacity(formula.len());
    let mut last = 0usize;

    for token in find_reference_tokens(formula) {
        out.push_str(&formula[last..token.span.start]);
        last = token.span.end;

        let shifted = columns
            .resolve(token.column)
            .zip(token.row_index())
            .and_then(|(col, row)| CellRef::new(row, col).offset(delta_row, delta_col))
            .filter(|cell| cell.in_bounds(rows, cols));

        let Some(cell) = shifted else {
            out.push_str(token.text);
            continue;
        };

        let Some(column) = columns.name(cell.col) else {
            out.push_str(token.text);
            continue;
        };
        out.push('[');
        out.push_str(column);
        out.push(']');
        out.push_str(&(cell.row + 1).to_string());
    }

    out.push_str(&formula[last..]);
    out
}
