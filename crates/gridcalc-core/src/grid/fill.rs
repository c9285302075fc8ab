use std::ops::Range;

use super::Grid;
use crate::error::{GridError, Result};
use gridcalc_engine::engine::rewrite_formula;
use tracing::debug;

impl Grid {
    /// Shift every in-bounds reference in `formula` by the given offset,
    /// writing shifted columns with their current names.
    pub fn rewrite(&self, formula: &str, delta_row: isize, delta_col: isize) -> String {
        rewrite_formula(
            formula,
            delta_row,
            delta_col,
            self.dimensions(),
            &self.columns,
        )
    }

    /// Copy the content of (`row`, `col`) into every cell of the target
    /// range with relative references. Literal content is copied verbatim.
    /// The source cell may lie inside the range; it is left as is.
    pub fn fill(
        &mut self,
        row: usize,
        col: usize,
        rows: Range<usize>,
        cols: Range<usize>,
    ) -> Result<()> {
        let source = self.raw_content(row, col)?.to_string();
        let (row_count, col_count) = self.dimensions();
        if rows.end > row_count {
            return Err(GridError::row(rows.end - 1, row_count));
        }
        if cols.end > col_count {
            return Err(GridError::column(cols.end - 1, col_count));
        }

        let is_formula = source.starts_with('=');
        for target_row in rows.clone() {
            for target_col in cols.clone() {
                if (target_row, target_col) == (row, col) {
                    continue;
                }
                let content = if is_formula {
                    self.rewrite(
                        &source,
                        offset(row, target_row),
                        offset(col, target_col),
                    )
                } else {
                    source.clone()
                };
                self.set_cell_content(target_row, target_col, &content)?;
            }
        }

        debug!(row, col, ?rows, ?cols, "filled range");
        Ok(())
    }
}

fn offset(from: usize, to: usize) -> isize {
    if to >= from {
        (to - from) as isize
    } else {
        -((from - to) as isize)
    }
}
