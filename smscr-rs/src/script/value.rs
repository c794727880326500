//! Runtime values and the arithmetic coercion rules.
//!
//! SmartScript is dynamically typed.  A runtime [`Value`] is an integer, a
//! double or a string; arithmetic goes through [`ValueWrapper`], which coerces
//! both operands to numbers first:
//!
//! - an absent operand counts as integer `0`;
//! - a string containing `.`, `e` or `E` must parse as a double, any other
//!   string must parse as an integer;
//! - the result is a double if either side is a double, an integer otherwise.

use std::cmp::Ordering;
use std::fmt;

use super::error::RuntimeError;

/// A SmartScript runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Double(f64),
    Str(String),
}

impl Default for Value {
    fn default() -> Self {
        Value::Int(0)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Double(x) if x.is_nan() => f.write_str("NaN"),
            Value::Double(x) if x.is_infinite() => {
                f.write_str(if *x > 0.0 { "Infinity" } else { "-Infinity" })
            }
            // Whole doubles keep a trailing ".0" so they read as doubles.
            Value::Double(x) if x.fract() == 0.0 => write!(f, "{x:.1}"),
            Value::Double(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s}"),
        }
    }
}

impl Value {
    /// Coerce to `f64` following the arithmetic rules.
    pub fn to_f64(&self) -> Result<f64, RuntimeError> {
        Number::coerce(Some(self)).map(Number::as_f64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Double(x)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

// ── Numeric coercion ──────────────────────────────────────────────────────────

/// An operand after coercion.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Number {
    Int(i64),
    Double(f64),
}

impl Number {
    fn coerce(v: Option<&Value>) -> Result<Number, RuntimeError> {
        match v {
            None => Ok(Number::Int(0)),
            Some(Value::Int(n)) => Ok(Number::Int(*n)),
            Some(Value::Double(x)) => Ok(Number::Double(*x)),
            Some(Value::Str(s)) => {
                let parsed = if s.contains(['.', 'e', 'E']) {
                    s.parse::<f64>().ok().map(Number::Double)
                } else {
                    s.parse::<i64>().ok().map(Number::Int)
                };
                parsed.ok_or_else(|| RuntimeError::NotANumber(s.clone()))
            }
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Number::Int(n) => n as f64,
            Number::Double(x) => x,
        }
    }
}

fn calculate(
    lhs: Option<&Value>,
    rhs: Option<&Value>,
    int_op: fn(i64, i64) -> Result<i64, RuntimeError>,
    double_op: fn(f64, f64) -> f64,
) -> Result<Value, RuntimeError> {
    match (Number::coerce(lhs)?, Number::coerce(rhs)?) {
        (Number::Int(a), Number::Int(b)) => int_op(a, b).map(Value::Int),
        (a, b) => Ok(Value::Double(double_op(a.as_f64(), b.as_f64()))),
    }
}

// ── ValueWrapper ──────────────────────────────────────────────────────────────

/// A mutable holder for one (possibly absent) value that performs arithmetic
/// in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueWrapper {
    value: Option<Value>,
}

impl ValueWrapper {
    pub fn new(value: Value) -> Self {
        ValueWrapper { value: Some(value) }
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// The held value, with an absent value reading as integer `0`.
    pub fn into_value(self) -> Value {
        self.value.unwrap_or_default()
    }

    pub fn add(&mut self, rhs: Option<&Value>) -> Result<(), RuntimeError> {
        self.apply(rhs, |a, b| Ok(a.wrapping_add(b)), |a, b| a + b)
    }

    pub fn subtract(&mut self, rhs: Option<&Value>) -> Result<(), RuntimeError> {
        self.apply(rhs, |a, b| Ok(a.wrapping_sub(b)), |a, b| a - b)
    }

    pub fn multiply(&mut self, rhs: Option<&Value>) -> Result<(), RuntimeError> {
        self.apply(rhs, |a, b| Ok(a.wrapping_mul(b)), |a, b| a * b)
    }

    /// Integer division truncates toward zero; double division follows IEEE.
    pub fn divide(&mut self, rhs: Option<&Value>) -> Result<(), RuntimeError> {
        self.apply(
            rhs,
            |a, b| {
                if b == 0 {
                    Err(RuntimeError::DivisionByZero)
                } else {
                    Ok(a.wrapping_div(b))
                }
            },
            |a, b| a / b,
        )
    }

    /// Numeric comparison of the held value with `rhs`.
    pub fn num_compare(&self, rhs: Option<&Value>) -> Result<Ordering, RuntimeError> {
        Ok(
            match (Number::coerce(self.value.as_ref())?, Number::coerce(rhs)?) {
                (Number::Int(a), Number::Int(b)) => a.cmp(&b),
                (a, b) => a.as_f64().total_cmp(&b.as_f64()),
            },
        )
    }

    fn apply(
        &mut self,
        rhs: Option<&Value>,
        int_op: fn(i64, i64) -> Result<i64, RuntimeError>,
        double_op: fn(f64, f64) -> f64,
    ) -> Result<(), RuntimeError> {
        let result = calculate(self.value.as_ref(), rhs, int_op, double_op)?;
        self.value = Some(result);
        Ok(())
    }
}

impl From<Value> for ValueWrapper {
    fn from(v: Value) -> Self {
        ValueWrapper::new(v)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
