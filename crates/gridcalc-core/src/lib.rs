//! gridcalc-core - UI-agnostic grid document model.

pub mod error;
pub mod grid;

pub use error::{GridError, Result};
pub use grid::{Grid, GridOptions};

pub use gridcalc_engine::EvalError;
pub use gridcalc_engine::engine::{CellRef, Value};

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scenario_grid() -> Grid {
        let mut grid = Grid::new(10, 10);
        grid.set_cell_content(0, 0, "5").unwrap();
        grid.set_cell_content(0, 1, "=[A]1*2").unwrap();
        grid
    }

    #[test]
    fn test_reference_times_two_displays_two_decimals() {
        assert_eq!(scenario_grid().display_value(0, 1).unwrap(), "10.00");
    }

    #[test]
    fn test_rename_keeps_results() {
        let mut grid = scenario_grid();
        grid.set_cell_content(1, 1, "=[A]1 + 1").unwrap();
        let before = grid.display_value(1, 1).unwrap();

        grid.rename_column(0, "Revenue").unwrap();
        grid.set_cell_content(1, 1, "=[Revenue]1 + 1").unwrap();
        assert_eq!(grid.display_value(1, 1).unwrap(), before);
        assert_eq!(grid.display_value(0, 1).unwrap(), "10.00");
    }

    #[test]
    fn test_no_stale_values_after_edit() {
        let mut grid = scenario_grid();
        for value in ["1", "2.5", "-4", "1e3"] {
            grid.set_cell_content(0, 0, value).unwrap();
            let expected = value.parse::<f64>().unwrap() * 2.0;
            assert_eq!(grid.evaluate(0, 1).unwrap(), Value::Number(expected));
        }
    }

    #[test]
    fn test_fill_then_insert_row_keeps_formula_text() {
        let mut grid = scenario_grid();
        grid.set_cell_content(1, 0, "6").unwrap();
        grid.fill(0, 1, 1..2, 1..2).unwrap();
        assert_eq!(grid.raw_content(1, 1).unwrap(), "=[A]2*2");

        // Formula text is not rewritten by structural edits; references keep
        // pointing at whatever now sits at those coordinates.
        grid.insert_row(0).unwrap();
        assert_eq!(grid.raw_content(2, 1).unwrap(), "=[A]2*2");
        assert_eq!(grid.display_value(2, 1).unwrap(), "10.00");
        assert_eq!(
            grid.dependents_of(1, 0).unwrap().into_iter().collect::<Vec<_>>(),
            vec![CellRef::new(2, 1)]
        );
    }

    #[test]
    fn test_errors_stay_inside_the_cell() {
        let mut grid = scenario_grid();
        grid.set_cell_content(2, 2, "=import('os')").unwrap();
        grid.set_cell_content(2, 3, "=[C]3.real").unwrap();
        grid.set_cell_content(2, 4, "=(lambda: 1)()").unwrap();
        for col in 2..5 {
            assert!(grid.display_value(2, col).unwrap().starts_with("#ERROR! ("));
        }
        assert_eq!(grid.display_value(0, 1).unwrap(), "10.00");
    }
}
