//! Value equality for test purposes.
//!
//! Interpreter results are compared structurally: lists element-wise, maps by key set and
//! per-key value, never by reference. The only policy knob is how an `Int` compares with a
//! `Float`, which depends on the numeric model of the interpreter under test.

use super::Value;

/// How integers and floats compare with each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumericEquality {
    /// `Int` and `Float` are different kinds and never equal.
    #[default]
    Strict,
    /// `Int(n)` equals `Float(x)` when `x` is finite, integral and exactly `n`.
    Coerce,
}

/// Strict structural equality. This is what `Value: PartialEq` uses.
///
/// # Examples
///
/// ```rust
/// use scriptcase::{value_equal, Value};
/// assert!(value_equal(&Value::list([1, 2]), &Value::list([1, 2])));
/// assert!(!value_equal(&Value::Int(2), &Value::Float(2.0)));
/// assert!(value_equal(&Value::Float(f64::NAN), &Value::Float(f64::NAN)));
/// ```
pub fn value_equal(a: &Value, b: &Value) -> bool {
    value_equal_with(a, b, NumericEquality::Strict)
}

/// Structural equality under the given numeric policy.
///
/// ```rust
/// use scriptcase::{value_equal_with, NumericEquality, Value};
/// let int = Value::Int(2);
/// let float = Value::Float(2.0);
/// assert!(value_equal_with(&int, &float, NumericEquality::Coerce));
/// assert!(value_equal_with(&float, &int, NumericEquality::Coerce));
/// assert!(!value_equal_with(&int, &Value::Float(2.5), NumericEquality::Coerce));
/// ```
pub fn value_equal_with(a: &Value, b: &Value, numeric: NumericEquality) -> bool {
    match (a, b) {
        (Value::Nil, Value::Nil) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => float_equal(*x, *y),
        (Value::Int(i), Value::Float(f)) | (Value::Float(f), Value::Int(i)) => match numeric {
            NumericEquality::Strict => false,
            NumericEquality::Coerce => int_float_equal(*i, *f),
        },
        (Value::String(x), Value::String(y)) => x == y,
        (Value::List(xs), Value::List(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .zip(ys.iter())
                    .all(|(x, y)| value_equal_with(x, y, numeric))
        }
        (Value::Map(xs), Value::Map(ys)) => {
            xs.len() == ys.len()
                && xs.iter().all(|(key, x)| match ys.get(key) {
                    Some(y) => value_equal_with(x, y, numeric),
                    None => false,
                })
        }
        (Value::Func(x), Value::Func(y)) => x.same_fn(y),
        (Value::Error(x), Value::Error(y)) => x == y,
        _ => false,
    }
}

/// NaN equals NaN here so that equality stays reflexive.
fn float_equal(x: f64, y: f64) -> bool {
    x == y || (x.is_nan() && y.is_nan())
}

fn int_float_equal(i: i64, f: f64) -> bool {
    if !f.is_finite() || f.fract() != 0.0 {
        return false;
    }
    // i64::MAX as f64 rounds up to 2^63, which is out of range
    if f < i64::MIN as f64 || f >= i64::MAX as f64 {
        return false;
    }
    f as i64 == i
}
