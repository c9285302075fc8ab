use super::Grid;
use crate::error::Result;
use gridcalc_engine::EvalResult;
use gridcalc_engine::engine::{
    CellRef, Evaluator, MAX_DECIMALS, Value, format_error, format_fixed, format_value,
    parse_number,
};
use tracing::debug;

impl Grid {
    /// Compute the value of a cell. Literal content is returned as text;
    /// evaluation errors come back as `GridError::Eval`.
    pub fn evaluate(&self, row: usize, col: usize) -> Result<Value> {
        self.raw_content(row, col)?;
        let mut rng = self.rng.borrow_mut();
        let value = Evaluator::new(self, &mut *rng)
            .with_max_exponent(self.max_exponent)
            .evaluate_cell(CellRef::new(row, col))?;
        Ok(value)
    }

    /// Text shown for a cell: numbers to the configured decimals, errors as
    /// `#ERROR! (<diagnostic>)`. Only out-of-bounds coordinates fail.
    pub fn display_value(&self, row: usize, col: usize) -> Result<String> {
        let content = self.raw_content(row, col)?;
        if !content.starts_with('=') {
            return Ok(match parse_number(content) {
                Some(n) => format_fixed(n, self.decimal_places),
                None => content.to_string(),
            });
        }

        let mut rng = self.rng.borrow_mut();
        let result = Evaluator::new(self, &mut *rng)
            .with_max_exponent(self.max_exponent)
            .evaluate_cell(CellRef::new(row, col));
        Ok(self.format_result(&result))
    }

    /// Evaluate content that is not stored in the grid, e.g. `=sum([A]1, 2)`.
    pub fn evaluate_formula(&self, content: &str) -> EvalResult<Value> {
        let mut rng = self.rng.borrow_mut();
        Evaluator::new(self, &mut *rng)
            .with_max_exponent(self.max_exponent)
            .evaluate_content(content)
    }

    /// [`Grid::evaluate_formula`] formatted like a cell display.
    pub fn display_formula(&self, content: &str) -> String {
        self.format_result(&self.evaluate_formula(content))
    }

    /// Set the number of decimals used for display. Clamped to
    /// [`MAX_DECIMALS`]; computed precision is unaffected.
    pub fn set_decimal_places(&mut self, decimals: usize) {
        self.decimal_places = decimals.min(MAX_DECIMALS);
        debug!(decimals = self.decimal_places, "set decimal places");
    }

    fn format_result(&self, result: &EvalResult<Value>) -> String {
        match result {
            Ok(value) => format_value(value, self.decimal_places),
            Err(e) => format_error(e),
        }
    }
}
