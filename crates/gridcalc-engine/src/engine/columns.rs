//! Column names and column-token resolution.
//!
//! Every column carries a display name. New columns get spreadsheet-style
//! letters (A, B, ..., Z, AA, ...); users may rename a column to any
//! identifier. Names travel with their column when columns are inserted or
//! removed around them.
//!
//! Resolution of a token inside a formula is two-step:
//! 1. case-insensitive match against the assigned names (first match wins)
//! 2. otherwise decode the token as base-26 letters
//!
//! Step 2 keeps un-renamed references working, but it also means a custom
//! name that looks like letters (say `B` on column 0) shadows the letter
//! token of another column. [`ColumnNames::collisions`] reports those.

use super::cell_ref::{col_to_letters, letters_to_col};

/// A custom name that is also the letter token of a different column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NameCollision {
    /// Column that carries the name.
    pub column: usize,
    pub name: String,
    /// Column the name would decode to as letters.
    pub shadows: usize,
}

/// Ordered column display names, one per column.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ColumnNames {
    names: Vec<String>,
}

impl ColumnNames {
    /// `count` columns with default letter names.
    pub fn with_defaults(count: usize) -> ColumnNames {
        ColumnNames {
            names: (0..count).map(col_to_letters).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, col: usize) -> Option<&str> {
        self.names.get(col).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Resolve a column token to an index. The letter fallback may return an
    /// index past the current column count; callers bounds-check.
    pub fn resolve(&self, token: &str) -> Option<usize> {
        self.names
            .iter()
            .position(|name| name.eq_ignore_ascii_case(token))
            .or_else(|| letters_to_col(token))
    }

    /// Insert a column at `at`, named with the first unused default name at
    /// or after the current column count. Returns the assigned name.
    pub fn insert(&mut self, at: usize) -> &str {
        let at = at.min(self.names.len());
        let name = (self.names.len()..)
            .map(col_to_letters)
            .find(|candidate| !self.contains(candidate))
            .unwrap_or_default();
        self.names.insert(at, name);
        &self.names[at]
    }

    /// Remove the column at `at`, returning its name.
    pub fn remove(&mut self, at: usize) -> Option<String> {
        (at < self.names.len()).then(|| self.names.remove(at))
    }

    /// Replace the name of column `col`. Validation is the caller's job.
    pub fn rename(&mut self, col: usize, name: &str) -> Option<String> {
        let slot = self.names.get_mut(col)?;
        Some(std::mem::replace(slot, name.to_string()))
    }

    fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n.eq_ignore_ascii_case(name))
    }

    /// Names that decode as letters to a different existing column.
    pub fn collisions(&self) -> Vec<NameCollision> {
        self.names
            .iter()
            .enumerate()
            .filter_map(|(column, name)| {
                let shadows = letters_to_col(name)?;
                (shadows != column && shadows < self.names.len()).then(|| NameCollision {
                    column,
                    name: name.clone(),
                    shadows,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_letters() {
        let cols = ColumnNames::with_defaults(28);
        assert_eq!(cols.name(0), Some("A"));
        assert_eq!(cols.name(25), Some("Z"));
        assert_eq!(cols.name(27), Some("AB"));
        assert_eq!(cols.name(28), None);
    }

    #[test]
    fn test_resolve_prefers_custom_name() {
        let mut cols = ColumnNames::with_defaults(3);
        cols.rename(0, "Revenue");
        assert_eq!(cols.resolve("revenue"), Some(0));
        assert_eq!(cols.resolve("REVENUE"), Some(0));
        // Letter fallback still maps A to column 0.
        assert_eq!(cols.resolve("A"), Some(0));
        assert_eq!(cols.resolve("C"), Some(2));
    }

    #[test]
    fn test_resolve_custom_name_shadows_letters() {
        let mut cols = ColumnNames::with_defaults(3);
        cols.rename(0, "C");
        // First name match wins over column 2's own "C".
        assert_eq!(cols.resolve("C"), Some(0));
    }

    #[test]
    fn test_resolve_letter_fallback_ignores_bounds() {
        let cols = ColumnNames::with_defaults(2);
        assert_eq!(cols.resolve("Z"), Some(25));
        assert_eq!(cols.resolve("Total"), None);
    }

    #[test]
    fn test_insert_assigns_next_unused_default() {
        let mut cols = ColumnNames::with_defaults(3);
        let name = cols.insert(1).to_string();
        assert_eq!(name, "D");
        let all: Vec<_> = cols.iter().collect();
        assert_eq!(all, vec!["A", "D", "B", "C"]);
    }

    #[test]
    fn test_insert_skips_names_in_use() {
        let mut cols = ColumnNames::with_defaults(2);
        cols.rename(0, "C");
        assert_eq!(cols.insert(2), "D");
    }

    #[test]
    fn test_custom_names_survive_removal() {
        let mut cols = ColumnNames::with_defaults(3);
        cols.rename(2, "Total");
        assert_eq!(cols.remove(0), Some("A".to_string()));
        assert_eq!(cols.name(1), Some("Total"));
        assert_eq!(cols.remove(5), None);
    }

    #[test]
    fn test_collisions_report_shadowed_columns() {
        let mut cols = ColumnNames::with_defaults(3);
        cols.rename(0, "B");
        cols.rename(2, "Total");
        assert_eq!(
            cols.collisions(),
            vec![NameCollision {
                column: 0,
                name: "B".to_string(),
                shadows: 1,
            }]
        );
    }
}
