//! Grid state and logic (UI-agnostic).

mod eval;
mod fill;
mod ops;
mod state;

pub use state::{Grid, GridOptions};
