//! Cell coordinates and the bracketed reference syntax used inside formulas.
//!
//! A formula names another cell with `[Column]Row`, for example `[A]3` or
//! `[Revenue]12`. Rows are 1-based in formula text and 0-based internally.
//! Column tokens are resolved against the grid's column names (see
//! [`ColumnNames`](super::ColumnNames)).
//!
//! # Examples
//!
//! ```ignore
//! let tokens: Vec<_> = find_reference_tokens("=[A]1+[Revenue]3").collect();
//! assert_eq!(tokens[1].column, "Revenue");
//! assert_eq!(tokens[1].row_index(), Some(2));
//! ```

use regex::Regex;
use std::fmt;
use std::ops::Range;
use std::sync::OnceLock;

/// A cell position by row and column indices (0-indexed).
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct CellRef {
    pub row: usize,
    pub col: usize,
}

impl CellRef {
    pub fn new(row: usize, col: usize) -> CellRef {
        CellRef { row, col }
    }

    /// True if the cell lies inside a grid of `rows` x `cols`.
    pub fn in_bounds(&self, rows: usize, cols: usize) -> bool {
        self.row < rows && self.col < cols
    }

    /// Move the cell by a signed offset. Returns None if either coordinate
    /// would become negative or overflow.
    pub fn offset(&self, delta_row: isize, delta_col: isize) -> Option<CellRef> {
        Some(CellRef::new(
            self.row.checked_add_signed(delta_row)?,
            self.col.checked_add_signed(delta_col)?,
        ))
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]{}", col_to_letters(self.col), self.row + 1)
    }
}

/// Convert column index to spreadsheet-style letters (0 -> A, 25 -> Z, 26 -> AA).
pub fn col_to_letters(col: usize) -> String {
    let mut result = String::new();
    let mut n = col as u128 + 1;
    while n > 0 {
        n -= 1;
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        n /= 26;
    }
    result
}

/// Decode a base-26 letter sequence (A=1 ... Z=26, AA=27) into a 0-based
/// column index. Case-insensitive. Returns None for anything that is not a
/// non-empty run of ASCII letters, or that overflows.
pub fn letters_to_col(letters: &str) -> Option<usize> {
    if letters.is_empty() || !letters.bytes().all(|b| b.is_ascii_alphabetic()) {
        return None;
    }

    let mut col_acc = 0usize;
    for c in letters.to_ascii_uppercase().bytes() {
        let digit = (c - b'A') as usize + 1;
        col_acc = col_acc.checked_mul(26)?.checked_add(digit)?;
    }
    col_acc.checked_sub(1)
}

/// True if `name` is usable as a column name (`[A-Za-z_][A-Za-z0-9_]*`).
pub fn is_valid_identifier(name: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex must compile")
    })
    .is_match(name)
}

/// One `[Column]Row` occurrence inside a formula.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferenceToken<'a> {
    /// The whole match, e.g. `[Revenue]3`.
    pub text: &'a str,
    /// The identifier between the brackets.
    pub column: &'a str,
    /// The row digits as written (1-based).
    pub digits: &'a str,
    /// Byte range of `text` within the scanned formula.
    pub span: Range<usize>,
}

impl ReferenceToken<'_> {
    /// The 1-based row number, or None if it does not fit in a usize.
    pub fn row_number(&self) -> Option<usize> {
        self.digits.parse().ok()
    }

    /// The 0-based row index. Row `0` has no index.
    pub fn row_index(&self) -> Option<usize> {
        self.row_number()?.checked_sub(1)
    }
}

fn reference_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\[([A-Za-z_][A-Za-z0-9_]*)\]([0-9]+)")
            .expect("cell reference regex must compile")
    })
}

/// Lazily yield every `[Column]Row` token in `formula`, left to right and
/// non-overlapping.
pub fn find_reference_tokens(formula: &str) -> impl Iterator<Item = ReferenceToken<'_>> {
    reference_re().captures_iter(formula).filter_map(|caps| {
        let whole = caps.get(0)?;
        Some(ReferenceToken {
            text: whole.as_str(),
            column: caps.get(1)?.as_str(),
            digits: caps.get(2)?.as_str(),
            span: whole.range(),
        })
    })
}

/// Parse a string that consists of exactly one reference token.
pub fn parse_reference_token(text: &str) -> Option<ReferenceToken<'_>> {
    let token = find_reference_tokens(text).next()?;
    (token.span == (0..text.len())).then_some(token)
}
