//! gridcalc_engine - Formula engine: references, safe evaluation, dependencies.

pub mod engine;
pub mod error;

pub use error::{EvalError, EvalResult};

#[cfg(test)]
mod tests {
    use crate::engine::*;

    #[test]
    fn test_resolve_format_round_trip_for_default_names() {
        let columns = ColumnNames::with_defaults(100);
        for col in 0..columns.len() {
            assert_eq!(columns.resolve(&col_to_letters(col)), Some(col));
        }
    }

    #[test]
    fn test_rewritten_formula_parses_to_shifted_references() {
        let columns = ColumnNames::with_defaults(4);
        let formula = "=[A]1 * [B]2";
        let rewritten = rewrite_formula(formula, 2, 1, (10, 4), &columns);
        assert_eq!(rewritten, "=[B]3 * [C]4");

        let original = parse_formula(&formula[1..], &columns).unwrap();
        let shifted = parse_formula(&rewritten[1..], &columns).unwrap();
        let expected: Vec<CellRef> = original
            .references()
            .into_iter()
            .filter_map(|cell| cell.offset(2, 1))
            .collect();
        assert_eq!(shifted.references(), expected);
    }

    #[test]
    fn test_dependencies_match_parsed_references() {
        let columns = ColumnNames::with_defaults(3);
        let formula = "=max([A]1, [C]2) + [b]3";
        let deps = extract_dependencies(formula, &columns, 5);
        let parsed = parse_formula(&formula[1..], &columns).unwrap();
        assert_eq!(deps, parsed.references());
    }

    #[test]
    fn test_every_whitelisted_function_parses() {
        let columns = ColumnNames::with_defaults(1);
        for info in FUNCTIONS {
            let body = format!("{}()", info.name);
            assert!(
                parse_formula(&body, &columns).is_ok(),
                "{} should parse",
                info.name
            );
        }
    }
}
