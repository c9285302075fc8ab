//! Whitelisted formula functions.
//!
//! Conventions:
//! - Formula-facing names are lowercase (`sum`, `sqrt`, ...). Lookup is exact.
//! - Aggregates (`min`, `max`, `sum`, `mean`, `median`, `stdev`) are
//!   variadic over numbers.
//! - `rand`/`randint` draw from the random source handed to the evaluator,
//!   never from a global generator.
//! - If you add a function, add it to `FUNCTIONS`, `arity` and `call`.

use rand::{Rng, RngCore};

use super::format::format_number;
use super::value::{Value, parse_number};
use crate::error::{EvalError, EvalResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Function {
    Abs,
    Round,
    Min,
    Max,
    Sum,
    Sqrt,
    Sin,
    Cos,
    Tan,
    Log,
    Log10,
    Exp,
    Pi,
    E,
    Rand,
    RandInt,
    Mean,
    Median,
    Stdev,
    Len,
    Int,
    Float,
    Str,
}

pub struct FunctionInfo {
    pub name: &'static str,
    pub function: Function,
    pub description: &'static str,
}

pub const FUNCTIONS: &[FunctionInfo] = &[
    FunctionInfo { name: "abs", function: Function::Abs, description: "Absolute value" },
    FunctionInfo { name: "round", function: Function::Round, description: "Round half to even, optionally to n digits" },
    FunctionInfo { name: "min", function: Function::Min, description: "Smallest argument" },
    FunctionInfo { name: "max", function: Function::Max, description: "Largest argument" },
    FunctionInfo { name: "sum", function: Function::Sum, description: "Sum of arguments" },
    FunctionInfo { name: "sqrt", function: Function::Sqrt, description: "Square root" },
    FunctionInfo { name: "sin", function: Function::Sin, description: "Sine (radians)" },
    FunctionInfo { name: "cos", function: Function::Cos, description: "Cosine (radians)" },
    FunctionInfo { name: "tan", function: Function::Tan, description: "Tangent (radians)" },
    FunctionInfo { name: "log", function: Function::Log, description: "Natural log, or log to a given base" },
    FunctionInfo { name: "log10", function: Function::Log10, description: "Base-10 log" },
    FunctionInfo { name: "exp", function: Function::Exp, description: "e raised to a power" },
    FunctionInfo { name: "pi", function: Function::Pi, description: "The constant pi" },
    FunctionInfo { name: "e", function: Function::E, description: "The constant e" },
    FunctionInfo { name: "rand", function: Function::Rand, description: "Random float in [0, 1)" },
    FunctionInfo { name: "randint", function: Function::RandInt, description: "Random integer in [a, b]" },
    FunctionInfo { name: "mean", function: Function::Mean, description: "Arithmetic mean" },
    FunctionInfo { name: "median", function: Function::Median, description: "Median" },
    FunctionInfo { name: "stdev", function: Function::Stdev, description: "Sample standard deviation" },
    FunctionInfo { name: "len", function: Function::Len, description: "Length of a text value" },
    FunctionInfo { name: "int", function: Function::Int, description: "Truncate to an integer" },
    FunctionInfo { name: "float", function: Function::Float, description: "Convert to a number" },
    FunctionInfo { name: "str", function: Function::Str, description: "Convert to text" },
];

impl Function {
    pub fn from_name(name: &str) -> Option<Function> {
        FUNCTIONS.iter().find(|f| f.name == name).map(|f| f.function)
    }

    pub fn name(&self) -> &'static str {
        FUNCTIONS
            .iter()
            .find(|f| f.function == *self)
            .map_or("?", |f| f.name)
    }

    /// True for the constants that may be written without parentheses.
    pub fn is_constant(&self) -> bool {
        matches!(self, Function::Pi | Function::E)
    }

    /// (minimum, maximum) argument count; None means unbounded.
    pub fn arity(&self) -> (usize, Option<usize>) {
        match self {
            Function::Pi | Function::E | Function::Rand => (0, Some(0)),
            Function::Abs
            | Function::Sqrt
            | Function::Sin
            | Function::Cos
            | Function::Tan
            | Function::Log10
            | Function::Exp
            | Function::Len
            | Function::Int
            | Function::Float
            | Function::Str => (1, Some(1)),
            Function::Round | Function::Log => (1, Some(2)),
            Function::RandInt => (2, Some(2)),
            Function::Sum => (0, None),
            Function::Min | Function::Max | Function::Mean | Function::Median => (1, None),
            Function::Stdev => (2, None),
        }
    }

    fn check_arity(&self, actual: usize) -> EvalResult<()> {
        let (min, max) = self.arity();
        if actual >= min && max.is_none_or(|max| actual <= max) {
            return Ok(());
        }
        let expected = match max {
            Some(max) if max == min => min.to_string(),
            Some(max) => format!("{} to {}", min, max),
            None => format!("at least {}", min),
        };
        Err(EvalError::ArgumentCount {
            function: self.name(),
            expected,
            actual,
        })
    }

    /// Apply the function to already-evaluated arguments.
    pub fn call(&self, args: &[Value], rng: &mut dyn RngCore) -> EvalResult<Value> {
        self.check_arity(args.len())?;

        match self {
            Function::Abs => Ok(Value::Number(self.number(&args[0])?.abs())),
            Function::Round => {
                let x = self.number(&args[0])?;
                match args.get(1) {
                    None => Ok(Value::Number(x.round_ties_even())),
                    Some(digits) => {
                        let digits = self.integer(digits)?;
                        let digits = i32::try_from(digits).map_err(|_| {
                            EvalError::InvalidArgument("round() digits out of range".into())
                        })?;
                        let scale = 10f64.powi(digits);
                        let scaled = x * scale;
                        if !scaled.is_finite() || scale == 0.0 {
                            return Ok(Value::Number(x));
                        }
                        Ok(Value::Number(scaled.round_ties_even() / scale))
                    }
                }
            }
            Function::Min => {
                let nums = self.numbers(args)?;
                Ok(Value::Number(nums.into_iter().fold(f64::INFINITY, f64::min)))
            }
            Function::Max => {
                let nums = self.numbers(args)?;
                Ok(Value::Number(nums.into_iter().fold(f64::NEG_INFINITY, f64::max)))
            }
            Function::Sum => Ok(Value::Number(self.numbers(args)?.into_iter().sum())),
            Function::Sqrt => {
                let x = self.number(&args[0])?;
                if x < 0.0 {
                    return Err(EvalError::Domain(self.name()));
                }
                Ok(Value::Number(x.sqrt()))
            }
            Function::Sin => Ok(Value::Number(self.number(&args[0])?.sin())),
            Function::Cos => Ok(Value::Number(self.number(&args[0])?.cos())),
            Function::Tan => Ok(Value::Number(self.number(&args[0])?.tan())),
            Function::Log => {
                let x = self.number(&args[0])?;
                if x <= 0.0 {
                    return Err(EvalError::Domain(self.name()));
                }
                match args.get(1) {
                    None => Ok(Value::Number(x.ln())),
                    Some(base) => {
                        let base = self.number(base)?;
                        if base <= 0.0 {
                            return Err(EvalError::Domain(self.name()));
                        }
                        if base == 1.0 {
                            return Err(EvalError::DivisionByZero);
                        }
                        Ok(Value::Number(x.ln() / base.ln()))
                    }
                }
            }
            Function::Log10 => {
                let x = self.number(&args[0])?;
                if x <= 0.0 {
                    return Err(EvalError::Domain(self.name()));
                }
                Ok(Value::Number(x.log10()))
            }
            Function::Exp => Ok(Value::Number(self.number(&args[0])?.exp())),
            Function::Pi => Ok(Value::Number(std::f64::consts::PI)),
            Function::E => Ok(Value::Number(std::f64::consts::E)),
            Function::Rand => Ok(Value::Number(rng.r#gen::<f64>())),
            Function::RandInt => {
                let low = self.integer(&args[0])?;
                let high = self.integer(&args[1])?;
                if low > high {
                    return Err(EvalError::InvalidArgument(format!(
                        "empty range for randint({}, {})",
                        low, high
                    )));
                }
                Ok(Value::Number(rng.gen_range(low..=high) as f64))
            }
            Function::Mean => {
                let nums = self.numbers(args)?;
                Ok(Value::Number(nums.iter().sum::<f64>() / nums.len() as f64))
            }
            Function::Median => {
                let mut nums = self.numbers(args)?;
                nums.sort_by(f64::total_cmp);
                let mid = nums.len() / 2;
                if nums.len() % 2 == 1 {
                    Ok(Value::Number(nums[mid]))
                } else {
                    Ok(Value::Number((nums[mid - 1] + nums[mid]) / 2.0))
                }
            }
            Function::Stdev => {
                let nums = self.numbers(args)?;
                let n = nums.len() as f64;
                let mean = nums.iter().sum::<f64>() / n;
                let variance = nums.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
                Ok(Value::Number(variance.sqrt()))
            }
            Function::Len => match &args[0] {
                Value::Text(s) => Ok(Value::Number(s.chars().count() as f64)),
                other => Err(EvalError::TypeMismatch(format!(
                    "{} has no len()",
                    other.type_name()
                ))),
            },
            Function::Int => match &args[0] {
                Value::Text(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(|n| Value::Number(n as f64))
                    .map_err(|_| {
                        EvalError::InvalidArgument(format!("invalid literal for int(): '{}'", s))
                    }),
                other => Ok(Value::Number(self.number(other)?.trunc())),
            },
            Function::Float => match &args[0] {
                Value::Text(s) => parse_number(s).map(Value::Number).ok_or_else(|| {
                    EvalError::InvalidArgument(format!("could not convert '{}' to float", s))
                }),
                other => Ok(Value::Number(self.number(other)?)),
            },
            Function::Str => Ok(Value::Text(match &args[0] {
                Value::Number(n) => format_number(*n),
                other => other.to_string(),
            })),
        }
    }

    fn number(&self, value: &Value) -> EvalResult<f64> {
        value.as_number().ok_or_else(|| {
            EvalError::TypeMismatch(format!(
                "{}() expects a number, got {}",
                self.name(),
                value.type_name()
            ))
        })
    }

    fn numbers(&self, values: &[Value]) -> EvalResult<Vec<f64>> {
        values.iter().map(|v| self.number(v)).collect()
    }

    fn integer(&self, value: &Value) -> EvalResult<i64> {
        let n = self.number(value)?;
        if n.fract() != 0.0 || n.abs() > i64::MAX as f64 {
            return Err(EvalError::TypeMismatch(format!(
                "{}() expects an integer, got {}",
                self.name(),
                format_number(n)
            )));
        }
        Ok(n as i64)
    }
}
