//! Reverse dependency bookkeeping.
//!
//! Maps a referenced cell to the cells whose formulas mention it. The read
//! path never consults this map (values are pulled fresh on every read); it
//! exists so callers can tell which cells are affected by an edit.

use std::collections::{BTreeSet, HashMap};

use super::cell_ref::{CellRef, find_reference_tokens};
use super::columns::ColumnNames;

/// Extract the in-bounds cells a formula references, in order of appearance.
///
/// Whitespace is ignored, as it is by the parser. Tokens whose column does
/// not resolve, whose row is 0, or that fall outside `rows` x
/// `columns.len()` are skipped; they surface as evaluation errors instead.
pub fn extract_dependencies(formula: &str, columns: &ColumnNames, rows: usize) -> Vec<CellRef> {
    let compact: String = formula.chars().filter(|c| !c.is_whitespace()).collect();
    find_reference_tokens(&compact)
        .filter_map(|token| {
            let col = columns.resolve(token.column)?;
            let row = token.row_index()?;
            let cell = CellRef::new(row, col);
            cell.in_bounds(rows, columns.len()).then_some(cell)
        })
        .collect()
}

/// Reverse dependency map: cell -> cells that depend on it.
#[derive(Clone, Debug, Default)]
pub struct DependencyTracker {
    dependents: HashMap<CellRef, BTreeSet<CellRef>>,
}

impl DependencyTracker {
    pub fn new() -> DependencyTracker {
        DependencyTracker::default()
    }

    /// Remove `cell` from every dependent set, pruning empty entries.
    pub fn clear_dependencies_of(&mut self, cell: &CellRef) {
        self.dependents.retain(|_, deps| {
            deps.remove(cell);
            !deps.is_empty()
        });
    }

    /// Record that `dependent`'s formula mentions `source`. Idempotent.
    pub fn record_dependency(&mut self, source: CellRef, dependent: CellRef) {
        self.dependents.entry(source).or_default().insert(dependent);
    }

    /// Direct dependents of `cell` (possibly empty).
    pub fn dependents_of(&self, cell: &CellRef) -> BTreeSet<CellRef> {
        self.dependents.get(cell).cloned().unwrap_or_default()
    }

    /// All cells reachable through dependent edges from `cell`, excluding
    /// `cell` itself unless it sits on a cycle.
    pub fn transitive_dependents(&self, cell: &CellRef) -> BTreeSet<CellRef> {
        let mut seen = BTreeSet::new();
        let mut to_process = vec![*cell];
        while let Some(current) = to_process.pop() {
            if let Some(deps) = self.dependents.get(&current) {
                for dep in deps {
                    if seen.insert(*dep) {
                        to_process.push(*dep);
                    }
                }
            }
        }
        seen
    }

    /// Number of (source, dependent) edges.
    pub fn edge_count(&self) -> usize {
        self.dependents.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.dependents.is_empty()
    }

    pub fn clear(&mut self) {
        self.dependents.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(row: usize, col: usize) -> CellRef {
        CellRef::new(row, col)
    }

    #[test]
    fn test_extract_dependencies_skips_out_of_bounds() {
        let columns = ColumnNames::with_defaults(3);
        let deps = extract_dependencies("=[A]1+[B]2+[Z]1+[A]99+[Nope]1+[A]0", &columns, 10);
        assert_eq!(deps, vec![cell(0, 0), cell(1, 1)]);
    }

    #[test]
    fn test_extract_dependencies_uses_custom_names() {
        let mut columns = ColumnNames::with_defaults(3);
        columns.rename(2, "Total");
        let deps = extract_dependencies("=[total]2", &columns, 5);
        assert_eq!(deps, vec![cell(1, 2)]);
    }

    #[test]
    fn test_extract_dependencies_ignores_whitespace() {
        let columns = ColumnNames::with_defaults(3);
        let deps = extract_dependencies("=[A] 1 * 2 + [ B ]\t3", &columns, 5);
        assert_eq!(deps, vec![cell(0, 0), cell(2, 1)]);
    }

    #[test]
    fn test_record_is_idempotent() {
        let mut tracker = DependencyTracker::new();
        tracker.record_dependency(cell(0, 0), cell(0, 1));
        tracker.record_dependency(cell(0, 0), cell(0, 1));
        assert_eq!(tracker.edge_count(), 1);
    }

    #[test]
    fn test_clear_dependencies_prunes_empty_entries() {
        let mut tracker = DependencyTracker::new();
        tracker.record_dependency(cell(0, 0), cell(0, 1));
        tracker.record_dependency(cell(1, 0), cell(0, 1));
        tracker.record_dependency(cell(1, 0), cell(0, 2));
        tracker.clear_dependencies_of(&cell(0, 1));
        assert!(tracker.dependents_of(&cell(0, 0)).is_empty());
        assert_eq!(
            tracker.dependents_of(&cell(1, 0)).into_iter().collect::<Vec<_>>(),
            vec![cell(0, 2)]
        );
        assert_eq!(tracker.edge_count(), 1);
    }

    #[test]
    fn test_transitive_dependents() {
        let mut tracker = DependencyTracker::new();
        tracker.record_dependency(cell(0, 0), cell(0, 1));
        tracker.record_dependency(cell(0, 1), cell(0, 2));
        tracker.record_dependency(cell(5, 5), cell(6, 6));
        let all = tracker.transitive_dependents(&cell(0, 0));
        assert_eq!(all.into_iter().collect::<Vec<_>>(), vec![cell(0, 1), cell(0, 2)]);
    }
}
