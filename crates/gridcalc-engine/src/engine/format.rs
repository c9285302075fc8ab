use super::Value;
use crate::error::EvalError;

/// Maximum decimal places accepted for display.
pub const MAX_DECIMALS: usize = 12;

/// Format a value for the grid: numbers to a fixed number of decimals,
/// booleans as TRUE/FALSE, text unchanged.
pub fn format_value(value: &Value, decimals: usize) -> String {
    match value {
        Value::Number(n) => format_fixed(*n, decimals),
        other => other.to_string(),
    }
}

/// Format an evaluation error the way the grid displays it.
pub fn format_error(error: &EvalError) -> String {
    format!("#ERROR! ({})", error)
}

/// Fixed number of decimal places (always prints trailing zeros).
pub fn format_fixed(n: f64, decimals: usize) -> String {
    if n.is_nan() {
        return "#NAN!".to_string();
    }
    if n.is_infinite() {
        return "#INF!".to_string();
    }
    let decimals = decimals.min(MAX_DECIMALS);
    let formatted = format!("{:.*}", decimals, n);
    // Avoid "-0.00" for tiny negative values.
    if formatted.starts_with('-') && formatted[1..].bytes().all(|b| b == b'0' || b == b'.') {
        formatted[1..].to_string()
    } else {
        formatted
    }
}

/// Format a number without a fixed precision (used by `str()` and plain
/// value display).
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "#NAN!".to_string()
    } else if n.is_infinite() {
        "#INF!".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{:.0}", n)
    } else {
        format!("{}", n)
    }
}
