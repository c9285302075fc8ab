use super::Grid;
use crate::error::{GridError, Result};
use gridcalc_engine::engine::{
    CellRef, NameCollision, extract_dependencies, is_valid_identifier, parse_reference_token,
};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Dimension for row/column operations
#[derive(Copy, Clone, Debug)]
enum Dimension {
    Row,
    Column,
}

impl Grid {
    fn check_cell(&self, row: usize, col: usize) -> Result<()> {
        let (rows, cols) = self.dimensions();
        if row >= rows {
            return Err(GridError::row(row, rows));
        }
        if col >= cols {
            return Err(GridError::column(col, cols));
        }
        Ok(())
    }

    /// Raw content of a cell, exactly as stored.
    pub fn raw_content(&self, row: usize, col: usize) -> Result<&str> {
        self.check_cell(row, col)?;
        Ok(self.cell(row, col).map_or("", String::as_str))
    }

    /// Store `text` in a cell and re-index the references of its formula.
    ///
    /// Tokens that do not resolve to a cell inside the grid are not recorded
    /// as dependencies; they show up as evaluation errors when read.
    pub fn set_cell_content(&mut self, row: usize, col: usize, text: &str) -> Result<()> {
        self.check_cell(row, col)?;
        let cell_ref = CellRef::new(row, col);

        self.dependencies.clear_dependencies_of(&cell_ref);
        self.cells[row][col] = text.to_string();
        self.index_cell(cell_ref);

        debug!(cell = %cell_ref, "set cell content");
        Ok(())
    }

    /// Empty a cell.
    pub fn clear_cell(&mut self, row: usize, col: usize) -> Result<()> {
        self.set_cell_content(row, col, "")
    }

    /// Record dependency edges for the formula stored at `cell_ref`.
    fn index_cell(&mut self, cell_ref: CellRef) {
        let Some(content) = self.cell(cell_ref.row, cell_ref.col) else {
            return;
        };
        if !content.starts_with('=') {
            return;
        }
        for source in extract_dependencies(content, &self.columns, self.row_count()) {
            self.dependencies.record_dependency(source, cell_ref);
        }
    }

    /// Rebuild the whole dependency map from the stored formulas.
    /// Needed whenever coordinates or column names change, since formula
    /// text is kept as written.
    pub(crate) fn reindex(&mut self) {
        self.dependencies.clear();
        let formulas: Vec<CellRef> = self
            .filled_cells()
            .filter(|(_, content)| content.starts_with('='))
            .map(|(cell_ref, _)| cell_ref)
            .collect();
        for cell_ref in formulas {
            self.index_cell(cell_ref);
        }
    }

    /// Cells whose formulas mention `row`, `col` directly.
    pub fn dependents_of(&self, row: usize, col: usize) -> Result<BTreeSet<CellRef>> {
        self.check_cell(row, col)?;
        Ok(self.dependencies.dependents_of(&CellRef::new(row, col)))
    }

    /// Every cell affected, directly or through other formulas, by an edit
    /// to `row`, `col`.
    pub fn transitive_dependents(&self, row: usize, col: usize) -> Result<BTreeSet<CellRef>> {
        self.check_cell(row, col)?;
        Ok(self
            .dependencies
            .transitive_dependents(&CellRef::new(row, col)))
    }

    /// Resolve a single `[Column]Row` token to in-bounds coordinates.
    pub fn resolve_reference(&self, token: &str) -> Result<CellRef> {
        let invalid = || GridError::InvalidReference(token.to_string());
        let parsed = parse_reference_token(token.trim()).ok_or_else(invalid)?;
        let col = self.columns.resolve(parsed.column).ok_or_else(invalid)?;
        let row = parsed.row_index().ok_or_else(invalid)?;
        self.check_cell(row, col)?;
        Ok(CellRef::new(row, col))
    }

    /// Resolve a column token (name, or letters for un-renamed columns).
    pub fn resolve_column(&self, token: &str) -> Option<usize> {
        self.columns.resolve(token)
    }

    /// Rename a column. The name must match `[A-Za-z_][A-Za-z0-9_]*`.
    pub fn rename_column(&mut self, col: usize, new_name: &str) -> Result<()> {
        if col >= self.column_count() {
            return Err(GridError::column(col, self.column_count()));
        }
        if !is_valid_identifier(new_name) {
            return Err(GridError::InvalidIdentifier(new_name.to_string()));
        }

        let old = self.columns.rename(col, new_name);
        debug!(col, ?old, new_name, "renamed column");

        for collision in self
            .columns
            .collisions()
            .into_iter()
            .filter(|c| c.column == col)
        {
            warn!(
                column = collision.column,
                name = %collision.name,
                shadows = collision.shadows,
                "column name also reads as the letter token of another column"
            );
        }

        self.reindex();
        Ok(())
    }

    /// Custom column names that shadow the letter token of another column.
    pub fn column_name_collisions(&self) -> Vec<NameCollision> {
        self.columns.collisions()
    }

    pub fn insert_row(&mut self, at: usize) -> Result<()> {
        self.insert_dimension(Dimension::Row, at)?;
        self.reindex();
        Ok(())
    }

    pub fn remove_row(&mut self, at: usize) -> Result<()> {
        self.remove_dimension(Dimension::Row, at)?;
        self.reindex();
        Ok(())
    }

    pub fn insert_column(&mut self, at: usize) -> Result<()> {
        self.insert_dimension(Dimension::Column, at)?;
        self.reindex();
        Ok(())
    }

    pub fn remove_column(&mut self, at: usize) -> Result<()> {
        self.remove_dimension(Dimension::Column, at)?;
        self.reindex();
        Ok(())
    }

    /// Grow or shrink to `rows` x `cols`, adding or removing at the end.
    pub fn set_dimensions(&mut self, rows: usize, cols: usize) -> Result<()> {
        while self.row_count() < rows {
            self.insert_dimension(Dimension::Row, self.row_count())?;
        }
        while self.row_count() > rows {
            self.remove_dimension(Dimension::Row, self.row_count() - 1)?;
        }
        while self.column_count() < cols {
            self.insert_dimension(Dimension::Column, self.column_count())?;
        }
        while self.column_count() > cols {
            self.remove_dimension(Dimension::Column, self.column_count() - 1)?;
        }
        self.reindex();
        debug!(rows, cols, "resized grid");
        Ok(())
    }

    /// Generic insert operation for row or column. `at` may equal the
    /// current count (append).
    fn insert_dimension(&mut self, dim: Dimension, at: usize) -> Result<()> {
        match dim {
            Dimension::Row => {
                if at > self.row_count() {
                    return Err(GridError::row(at, self.row_count()));
                }
                let cols = self.column_count();
                self.cells.insert(at, vec![String::new(); cols]);
            }
            Dimension::Column => {
                if at > self.column_count() {
                    return Err(GridError::column(at, self.column_count()));
                }
                let name = self.columns.insert(at).to_string();
                for row in &mut self.cells {
                    row.insert(at, String::new());
                }
                debug!(at, name = %name, "inserted column");
            }
        }
        Ok(())
    }

    /// Generic delete operation for row or column.
    fn remove_dimension(&mut self, dim: Dimension, at: usize) -> Result<()> {
        match dim {
            Dimension::Row => {
                if at >= self.row_count() {
                    return Err(GridError::row(at, self.row_count()));
                }
                self.cells.remove(at);
            }
            Dimension::Column => {
                if at >= self.column_count() {
                    return Err(GridError::column(at, self.column_count()));
                }
                self.columns.remove(at);
                for row in &mut self.cells {
                    row.remove(at);
                }
            }
        }
        debug!(?dim, at, "removed");
        Ok(())
    }
}
