use std::cell::RefCell;

use gridcalc_engine::engine::{
    CellRef, CellSource, ColumnNames, DEFAULT_MAX_EXPONENT, DependencyTracker,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Construction-time settings for a [`Grid`].
#[derive(Clone, Debug, PartialEq)]
pub struct GridOptions {
    pub rows: usize,
    pub columns: usize,
    /// Decimal places used when displaying numbers.
    pub decimal_places: usize,
    /// Largest exponent magnitude accepted by `**`.
    pub max_exponent: f64,
    /// Seed for `rand()`/`randint()`. None seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for GridOptions {
    fn default() -> Self {
        GridOptions {
            rows: 10,
            columns: 10,
            decimal_places: 2,
            max_exponent: DEFAULT_MAX_EXPONENT,
            seed: None,
        }
    }
}

/// A rectangular table of cells holding literal text or `=` formulas.
///
/// Values are never stored: every read evaluates the cell and whatever it
/// references. The dependency tracker is kept in step with every edit so
/// collaborators can ask which cells an edit affects.
pub struct Grid {
    /// Raw content, `cells[row][col]`. Always rectangular.
    pub(crate) cells: Vec<Vec<String>>,
    pub(crate) columns: ColumnNames,
    /// Reverse dependency map: cell -> cells whose formulas mention it
    pub(crate) dependencies: DependencyTracker,
    pub(crate) decimal_places: usize,
    pub(crate) max_exponent: f64,
    /// Random source for `rand()`/`randint()`. Interior mutability keeps
    /// reads `&self`.
    pub(crate) rng: RefCell<StdRng>,
}

impl Grid {
    /// Create an empty grid of `rows` x `columns` with default settings.
    pub fn new(rows: usize, columns: usize) -> Self {
        Self::with_options(GridOptions {
            rows,
            columns,
            ..GridOptions::default()
        })
    }

    pub fn with_options(options: GridOptions) -> Self {
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Grid {
            cells: vec![vec![String::new(); options.columns]; options.rows],
            columns: ColumnNames::with_defaults(options.columns),
            dependencies: DependencyTracker::new(),
            decimal_places: options.decimal_places,
            max_exponent: options.max_exponent,
            rng: RefCell::new(rng),
        }
    }

    pub fn row_count(&self) -> usize {
        self.cells.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// (rows, columns).
    pub fn dimensions(&self) -> (usize, usize) {
        (self.row_count(), self.column_count())
    }

    pub fn column_names(&self) -> &ColumnNames {
        &self.columns
    }

    pub fn column_name(&self, col: usize) -> Option<&str> {
        self.columns.name(col)
    }

    pub fn decimal_places(&self) -> usize {
        self.decimal_places
    }

    /// Reseed the random source used by `rand()`/`randint()`.
    pub fn set_seed(&mut self, seed: u64) {
        *self.rng.get_mut() = StdRng::seed_from_u64(seed);
    }

    pub(crate) fn cell(&self, row: usize, col: usize) -> Option<&String> {
        self.cells.get(row)?.get(col)
    }

    /// Iterate over every non-empty cell with its raw content.
    pub fn filled_cells(&self) -> impl Iterator<Item = (CellRef, &str)> {
        self.cells.iter().enumerate().flat_map(|(row, cells)| {
            cells
                .iter()
                .enumerate()
                .filter(|(_, content)| !content.is_empty())
                .map(move |(col, content)| (CellRef::new(row, col), content.as_str()))
        })
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::with_options(GridOptions::default())
    }
}

impl CellSource for Grid {
    fn dimensions(&self) -> (usize, usize) {
        Grid::dimensions(self)
    }

    fn raw_content(&self, cell: CellRef) -> Option<&str> {
        self.cell(cell.row, cell.col).map(String::as_str)
    }

    fn columns(&self) -> &ColumnNames {
        &self.columns
    }
}
