//! Formula evaluation.
//!
//! Evaluation is pull-based: reading a cell parses its formula and
//! recursively evaluates every referenced cell, every time. Nothing is
//! cached, so an edit is visible on the next read without invalidation.
//!
//! The evaluator carries the set of cells currently on the evaluation path;
//! reaching one of them again is a circular reference.

use std::collections::HashSet;

use rand::RngCore;
use tracing::trace;

use super::ast::{BinaryOp, Expr, UnaryOp};
use super::cell_ref::CellRef;
use super::columns::ColumnNames;
use super::parser::{MAX_NESTING_DEPTH, parse_formula_at_depth};
use super::value::Value;
use crate::error::{EvalError, EvalResult};

/// Default bound on the magnitude of an exponent.
pub const DEFAULT_MAX_EXPONENT: f64 = 1000.0;

/// Read access to the cells a formula can reference.
pub trait CellSource {
    /// (rows, columns).
    fn dimensions(&self) -> (usize, usize);

    /// Raw content of an in-bounds cell.
    fn raw_content(&self, cell: CellRef) -> Option<&str>;

    fn columns(&self) -> &ColumnNames;
}

/// Evaluates formulas against a [`CellSource`].
pub struct Evaluator<'a> {
    source: &'a dyn CellSource,
    rng: &'a mut dyn RngCore,
    max_exponent: f64,
    visiting: HashSet<CellRef>,
    /// Nesting levels spent on the current path, shared with the parser.
    depth: usize,
}

impl<'a> Evaluator<'a> {
    pub fn new(source: &'a dyn CellSource, rng: &'a mut dyn RngCore) -> Evaluator<'a> {
        Evaluator {
            source,
            rng,
            max_exponent: DEFAULT_MAX_EXPONENT,
            visiting: HashSet::new(),
            depth: 0,
        }
    }

    pub fn with_max_exponent(mut self, max_exponent: f64) -> Evaluator<'a> {
        self.max_exponent = max_exponent;
        self
    }

    /// Evaluate the cell at `cell`. Literal content comes back as
    /// [`Value::Text`]; formulas are computed.
    pub fn evaluate_cell(&mut self, cell: CellRef) -> EvalResult<Value> {
        let (rows, cols) = self.source.dimensions();
        if !cell.in_bounds(rows, cols) {
            return Err(EvalError::UnresolvedReference(format!(
                "{} (outside the {}x{} grid)",
                cell, rows, cols
            )));
        }
        let content = self.source.raw_content(cell).unwrap_or("");
        let Some(body) = content.strip_prefix('=') else {
            return Ok(Value::Text(content.to_string()));
        };

        if self.visiting.contains(&cell) {
            return Err(EvalError::CircularReference);
        }

        self.visiting.insert(cell);
        trace!(%cell, depth = self.depth, "evaluating formula");
        let result = self.nested(|this| this.evaluate_body(body));
        self.visiting.remove(&cell);
        result
    }

    /// Evaluate content that is not stored in any cell. Content without a
    /// leading `=` is returned as text.
    pub fn evaluate_content(&mut self, content: &str) -> EvalResult<Value> {
        match content.strip_prefix('=') {
            Some(body) => self.evaluate_body(body),
            None => Ok(Value::Text(content.to_string())),
        }
    }

    /// Run `f` one nesting level deeper, failing once the budget is spent.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> EvalResult<T>) -> EvalResult<T> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(EvalError::TooDeep(MAX_NESTING_DEPTH));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn evaluate_body(&mut self, body: &str) -> EvalResult<Value> {
        let expr = parse_formula_at_depth(body, self.source.columns(), self.depth)?;
        self.eval_expr(&expr)
    }

    fn eval_expr(&mut self, expr: &Expr) -> EvalResult<Value> {
        let value = match expr {
            Expr::Number(n) => Value::Number(*n),
            Expr::Text(s) => Value::Text(s.clone()),
            Expr::Reference(cell) => self.reference_value(*cell)?,
            Expr::Unary { op, operand } => {
                let operand = self.nested(|this| this.eval_expr(operand))?;
                unary(*op, &operand)?
            }
            Expr::Binary { op, left, right } => {
                let (left, right) = self.nested(|this| {
                    Ok((this.eval_expr(left)?, this.eval_expr(right)?))
                })?;
                self.binary(*op, left, right)?
            }
            Expr::Call { function, args } => {
                let args = self.nested(|this| {
                    args.iter()
                        .map(|arg| this.eval_expr(arg))
                        .collect::<EvalResult<Vec<_>>>()
                })?;
                function.call(&args, &mut *self.rng)?
            }
        };
        match value {
            Value::Number(n) if !n.is_finite() => Err(EvalError::Overflow),
            value => Ok(value),
        }
    }

    /// Value of a referenced cell: numeric text becomes a number, other text
    /// stays text.
    fn reference_value(&mut self, cell: CellRef) -> EvalResult<Value> {
        match self.evaluate_cell(cell)? {
            Value::Text(text) => Ok(Value::from_cell_text(&text)),
            value => Ok(value),
        }
    }

    fn binary(&self, op: BinaryOp, left: Value, right: Value) -> EvalResult<Value> {
        if op.is_comparison() {
            return compare(op, &left, &right);
        }

        if op == BinaryOp::Add
            && let (Value::Text(a), Value::Text(b)) = (&left, &right)
        {
            return Ok(Value::Text(format!("{}{}", a, b)));
        }

        let (Some(a), Some(b)) = (left.as_number(), right.as_number()) else {
            return Err(EvalError::TypeMismatch(format!(
                "unsupported operand types for {}: {} and {}",
                op.symbol(),
                left.type_name(),
                right.type_name()
            )));
        };

        let result = match op {
            BinaryOp::Add => a + b,
            BinaryOp::Subtract => a - b,
            BinaryOp::Multiply => a * b,
            BinaryOp::Divide => {
                if b == 0.0 {
                    return Err(EvalError::DivisionByZero);
                }
                a / b
            }
            BinaryOp::FloorDivide => {
                if b == 0.0 {
                    return Err(EvalError::DivisionByZero);
                }
                (a / b).floor()
            }
            BinaryOp::Modulo => {
                if b == 0.0 {
                    return Err(EvalError::DivisionByZero);
                }
                // Result takes the sign of the divisor.
                let r = a % b;
                if r != 0.0 && (r < 0.0) != (b < 0.0) { r + b } else { r }
            }
            BinaryOp::Power => {
                if b.abs() > self.max_exponent {
                    return Err(EvalError::ExponentTooLarge {
                        exponent: b,
                        limit: self.max_exponent,
                    });
                }
                if a == 0.0 && b < 0.0 {
                    return Err(EvalError::DivisionByZero);
                }
                if a < 0.0 && b.fract() != 0.0 {
                    return Err(EvalError::Domain("pow"));
                }
                a.powf(b)
            }
            BinaryOp::Equal
            | BinaryOp::NotEqual
            | BinaryOp::Less
            | BinaryOp::LessEqual
            | BinaryOp::Greater
            | BinaryOp::GreaterEqual => unreachable!("comparisons handled above"),
        };
        Ok(Value::Number(result))
    }
}

fn unary(op: UnaryOp, operand: &Value) -> EvalResult<Value> {
    let n = operand.as_number().ok_or_else(|| {
        EvalError::TypeMismatch(format!(
            "bad operand type for unary {}: {}",
            match op {
                UnaryOp::Negate => "-",
                UnaryOp::Plus => "+",
            },
            operand.type_name()
        ))
    })?;
    Ok(Value::Number(match op {
        UnaryOp::Negate => -n,
        UnaryOp::Plus => n,
    }))
}

fn compare(op: BinaryOp, left: &Value, right: &Value) -> EvalResult<Value> {
    use std::cmp::Ordering;

    let ordering: Option<Ordering> = match (left, right) {
        (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
        (Value::Text(_), _) | (_, Value::Text(_)) => None,
        (a, b) => match (a.as_number(), b.as_number()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        },
    };

    let result = match (op, ordering) {
        (BinaryOp::Equal, ordering) => ordering == Some(Ordering::Equal),
        (BinaryOp::NotEqual, ordering) => ordering != Some(Ordering::Equal),
        (_, None) => {
            return Err(EvalError::TypeMismatch(format!(
                "'{}' not supported between {} and {}",
                op.symbol(),
                left.type_name(),
                right.type_name()
            )));
        }
        (BinaryOp::Less, Some(o)) => o == Ordering::Less,
        (BinaryOp::LessEqual, Some(o)) => o != Ordering::Greater,
        (BinaryOp::Greater, Some(o)) => o == Ordering::Greater,
        (BinaryOp::GreaterEqual, Some(o)) => o != Ordering::Less,
        (_, Some(_)) => unreachable!("arithmetic operators are not comparisons"),
    };
    Ok(Value::Bool(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    /// Minimal dense source for evaluator tests.
    struct TestSheet {
        rows: usize,
        columns: ColumnNames,
        cells: Vec<Vec<String>>,
    }

    impl TestSheet {
        fn new(rows: usize, cols: usize) -> TestSheet {
            TestSheet {
                rows,
                columns: ColumnNames::with_defaults(cols),
                cells: vec![vec![String::new(); cols]; rows],
            }
        }

        fn set(&mut self, row: usize, col: usize, content: &str) {
            self.cells[row][col] = content.to_string();
        }
    }

    impl CellSource for TestSheet {
        fn dimensions(&self) -> (usize, usize) {
            (self.rows, self.columns.len())
        }

        fn raw_content(&self, cell: CellRef) -> Option<&str> {
            self.cells.get(cell.row)?.get(cell.col).map(String::as_str)
        }

        fn columns(&self) -> &ColumnNames {
            &self.columns
        }
    }

    fn eval_in(sheet: &TestSheet, content: &str) -> EvalResult<Value> {
        let mut rng = StdRng::seed_from_u64(0);
        Evaluator::new(sheet, &mut rng).evaluate_content(content)
    }

    fn eval(content: &str) -> EvalResult<Value> {
        eval_in(&TestSheet::new(3, 3), content)
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("=1 + 2 * 3"), Ok(Value::Number(7.0)));
        assert_eq!(eval("=(1 + 2) * 3"), Ok(Value::Number(9.0)));
        assert_eq!(eval("=7 // 2"), Ok(Value::Number(3.0)));
        assert_eq!(eval("=-7 // 2"), Ok(Value::Number(-4.0)));
        assert_eq!(eval("=-7 % 3"), Ok(Value::Number(2.0)));
        assert_eq!(eval("=7 % -3"), Ok(Value::Number(-2.0)));
        assert_eq!(eval("=2 ^ 10"), Ok(Value::Number(1024.0)));
        assert_eq!(eval("=-2 ** 2"), Ok(Value::Number(-4.0)));
        assert_eq!(eval("=2 ** -1"), Ok(Value::Number(0.5)));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(eval("=1/0"), Err(EvalError::DivisionByZero));
        assert_eq!(eval("=1//0"), Err(EvalError::DivisionByZero));
        assert_eq!(eval("=1%0"), Err(EvalError::DivisionByZero));
        assert_eq!(eval("=0 ** -1"), Err(EvalError::DivisionByZero));
    }

    #[test]
    fn test_exponent_bound() {
        assert_eq!(
            eval("=2 ** 1001"),
            Err(EvalError::ExponentTooLarge {
                exponent: 1001.0,
                limit: 1000.0
            })
        );
        assert_eq!(eval("=1 ** 1000"), Ok(Value::Number(1.0)));
        let sheet = TestSheet::new(1, 1);
        let mut rng = StdRng::seed_from_u64(0);
        let result = Evaluator::new(&sheet, &mut rng)
            .with_max_exponent(3.0)
            .evaluate_content("=2 ** 4");
        assert!(matches!(result, Err(EvalError::ExponentTooLarge { .. })));
    }

    #[test]
    fn test_overflow_is_an_error() {
        assert_eq!(eval("=10.0 ** 400"), Err(EvalError::Overflow));
        assert_eq!(eval("=exp(1000)"), Err(EvalError::Overflow));
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(eval("=1 < 2"), Ok(Value::Bool(true)));
        assert_eq!(eval("=2 <= 1"), Ok(Value::Bool(false)));
        assert_eq!(eval("='a' == 'a'"), Ok(Value::Bool(true)));
        assert_eq!(eval("='a' != 1"), Ok(Value::Bool(true)));
        assert!(matches!(eval("='a' < 1"), Err(EvalError::TypeMismatch(_))));
        assert_eq!(eval("=(1 < 2) + 1"), Ok(Value::Number(2.0)));
    }

    #[test]
    fn test_text_concatenation() {
        assert_eq!(eval("='ab' + 'cd'"), Ok(Value::Text("abcd".into())));
        assert_eq!(eval("=str(1) + 'x'"), Ok(Value::Text("1x".into())));
        assert!(matches!(eval("='ab' + 1"), Err(EvalError::TypeMismatch(_))));
        assert!(matches!(eval("=-'ab'"), Err(EvalError::TypeMismatch(_))));
    }

    #[test]
    fn test_literal_content_is_text() {
        assert_eq!(eval("42"), Ok(Value::Text("42".into())));
        assert_eq!(eval("hello"), Ok(Value::Text("hello".into())));
    }

    #[test]
    fn test_references_substitute_values() {
        let mut sheet = TestSheet::new(3, 3);
        sheet.set(0, 0, "5");
        sheet.set(0, 1, "=[A]1*2");
        sheet.set(1, 0, "world");
        assert_eq!(eval_in(&sheet, "=[B]1 + 1"), Ok(Value::Number(11.0)));
        assert_eq!(eval_in(&sheet, "='hello' + [A]2"), Ok(Value::Text("helloworld".into())));
        assert_eq!(eval_in(&sheet, "=len([A]2)"), Ok(Value::Number(5.0)));
    }

    #[test]
    fn test_empty_reference_is_empty_text() {
        let sheet = TestSheet::new(2, 2);
        assert_eq!(eval_in(&sheet, "=[B]2"), Ok(Value::Text(String::new())));
        assert!(matches!(eval_in(&sheet, "=[B]2 + 1"), Err(EvalError::TypeMismatch(_))));
    }

    #[test]
    fn test_out_of_bounds_reference() {
        let sheet = TestSheet::new(2, 2);
        assert!(matches!(
            eval_in(&sheet, "=[A]3"),
            Err(EvalError::UnresolvedReference(_))
        ));
        assert!(matches!(
            eval_in(&sheet, "=[C]1"),
            Err(EvalError::UnresolvedReference(_))
        ));
    }

    #[test]
    fn test_circular_reference_is_reported() {
        let mut sheet = TestSheet::new(2, 2);
        sheet.set(0, 0, "=[B]1");
        sheet.set(0, 1, "=[A]1");
        let mut rng = StdRng::seed_from_u64(0);
        let mut evaluator = Evaluator::new(&sheet, &mut rng);
        assert_eq!(
            evaluator.evaluate_cell(CellRef::new(0, 0)),
            Err(EvalError::CircularReference)
        );
        assert_eq!(
            evaluator.evaluate_cell(CellRef::new(0, 1)),
            Err(EvalError::CircularReference)
        );
    }

    #[test]
    fn test_self_reference_is_circular() {
        let mut sheet = TestSheet::new(1, 1);
        sheet.set(0, 0, "=[A]1 + 1");
        let mut rng = StdRng::seed_from_u64(0);
        let mut evaluator = Evaluator::new(&sheet, &mut rng);
        assert_eq!(
            evaluator.evaluate_cell(CellRef::new(0, 0)),
            Err(EvalError::CircularReference)
        );
    }

    #[test]
    fn test_diamond_is_not_circular() {
        let mut sheet = TestSheet::new(1, 4);
        sheet.set(0, 0, "2");
        sheet.set(0, 1, "=[A]1 + 1");
        sheet.set(0, 2, "=[A]1 * 10");
        sheet.set(0, 3, "=[B]1 + [C]1 + [A]1");
        let mut rng = StdRng::seed_from_u64(0);
        let mut evaluator = Evaluator::new(&sheet, &mut rng);
        assert_eq!(evaluator.evaluate_cell(CellRef::new(0, 3)), Ok(Value::Number(25.0)));
    }

    #[test]
    fn test_long_chain_is_bounded() {
        let rows = MAX_NESTING_DEPTH + 10;
        let mut sheet = TestSheet::new(rows, 1);
        sheet.set(0, 0, "1");
        for row in 1..rows {
            sheet.set(row, 0, &format!("=[A]{} + 1", row));
        }
        let mut rng = StdRng::seed_from_u64(0);
        let mut evaluator = Evaluator::new(&sheet, &mut rng);
        assert_eq!(
            evaluator.evaluate_cell(CellRef::new(rows - 1, 0)),
            Err(EvalError::TooDeep(MAX_NESTING_DEPTH))
        );
        assert_eq!(evaluator.evaluate_cell(CellRef::new(10, 0)), Ok(Value::Number(11.0)));
    }

    #[test]
    fn test_nesting_inside_reference_chain_shares_one_budget() {
        // Each cell alone is well within the nesting limit; the chain is not.
        let rows = 40;
        let mut sheet = TestSheet::new(rows, 1);
        sheet.set(0, 0, "1");
        for row in 1..rows {
            sheet.set(row, 0, &format!("={}[A]{}", "-".repeat(198), row));
        }
        let mut rng = StdRng::seed_from_u64(0);
        let mut evaluator = Evaluator::new(&sheet, &mut rng);
        assert_eq!(evaluator.evaluate_cell(CellRef::new(1, 0)), Ok(Value::Number(1.0)));
        assert_eq!(
            evaluator.evaluate_cell(CellRef::new(rows - 1, 0)),
            Err(EvalError::TooDeep(MAX_NESTING_DEPTH))
        );
        // The budget is released after a failed evaluation.
        assert_eq!(evaluator.evaluate_cell(CellRef::new(1, 0)), Ok(Value::Number(1.0)));
    }

    #[test]
    fn test_long_flat_sum_is_bounded() {
        let body = format!("={}", vec!["1"; MAX_NESTING_DEPTH + 5].join("+"));
        assert_eq!(eval(&body), Err(EvalError::TooDeep(MAX_NESTING_DEPTH)));
        assert_eq!(eval("=1+1+1+1"), Ok(Value::Number(4.0)));
    }

    #[test]
    fn test_errors_propagate_from_references() {
        let mut sheet = TestSheet::new(1, 2);
        sheet.set(0, 0, "=1/0");
        assert_eq!(eval_in(&sheet, "=[A]1 + 1"), Err(EvalError::DivisionByZero));
        assert_eq!(eval_in(&sheet, "=[B]1"), Ok(Value::Text(String::new())));
    }

    #[test]
    fn test_rand_uses_injected_source() {
        let sheet = TestSheet::new(1, 1);
        let mut a = StdRng::seed_from_u64(99);
        let mut b = StdRng::seed_from_u64(99);
        let x = Evaluator::new(&sheet, &mut a).evaluate_content("=randint(1, 1000000)");
        let y = Evaluator::new(&sheet, &mut b).evaluate_content("=randint(1, 1000000)");
        assert_eq!(x, y);
    }
}
