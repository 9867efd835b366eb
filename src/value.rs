//! Interpreter value domain.
//!
//! Every collaborator speaks in [`Value`]: inputs bound before a run, the value a run
//! yields, and the values looked up afterwards. Keeping one tagged union at the boundary
//! lets the harness compare results from any dynamically-typed interpreter without
//! knowing its internal representation.

pub mod equality;

use crate::errors::ScriptError;
use im::HashMap;
use std::fmt;
use std::sync::Arc;

pub use equality::{value_equal, value_equal_with, NumericEquality};

/// Represents a value produced by, or handed to, the interpreter under test.
///
/// # Examples
///
/// ```rust
/// use scriptcase::Value;
/// let n = Value::Int(3);
/// assert_eq!(n.kind(), "int");
/// let s = Value::from("hello");
/// assert_eq!(s.kind(), "string");
/// let nil = Value::default();
/// assert!(nil.is_nil());
/// ```
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(HashMap<String, Value>),
    Func(NativeFn),
    Error(String),
}

impl Value {
    /// Returns the kind name of the value, as shown in mismatch reports.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use scriptcase::Value;
    /// assert_eq!(Value::Float(1.5).kind(), "float");
    /// assert_eq!(Value::Nil.kind(), "nil");
    /// ```
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Func(_) => "func",
            Value::Error(_) => "error",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Builds a list value from anything convertible into values.
    ///
    /// ```rust
    /// use scriptcase::Value;
    /// let v = Value::list([1, 2, 3]);
    /// assert_eq!(v, Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]));
    /// ```
    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Value::List(items.into_iter().map(Into::into).collect())
    }

    /// Builds a map value from `(key, value)` pairs. Later duplicates win.
    ///
    /// ```rust
    /// use scriptcase::Value;
    /// let a = Value::map([("x", 1), ("y", 2)]);
    /// let b = Value::map([("y", 2), ("x", 1)]);
    /// assert_eq!(a, b);
    /// ```
    pub fn map<I, K, T>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, T)>,
        K: Into<String>,
        T: Into<Value>,
    {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    // ------------------------------------------------------------------------
    // Display formatting helpers
    // ------------------------------------------------------------------------

    fn fmt_list(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
        write!(f, "[")?;
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", item)?;
        }
        write!(f, "]")
    }

    fn fmt_map(f: &mut fmt::Formatter<'_>, map: &HashMap<String, Value>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (key, value)) in sorted_entries(map).into_iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:?}: {}", key, value)?;
        }
        write!(f, "}}")
    }
}

/// Map entries ordered by key, so equal maps always render the same way.
fn sorted_entries(map: &HashMap<String, Value>) -> Vec<(&String, &Value)> {
    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        value_equal(self, other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "Nil"),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Int(n) => f.debug_tuple("Int").field(n).finish(),
            Value::Float(n) => f.debug_tuple("Float").field(n).finish(),
            Value::String(s) => f.debug_tuple("String").field(s).finish(),
            Value::List(items) => f.debug_tuple("List").field(items).finish(),
            Value::Map(map) => {
                write!(f, "Map(")?;
                f.debug_map().entries(sorted_entries(map)).finish()?;
                write!(f, ")")
            }
            Value::Func(func) => fmt::Debug::fmt(func, f),
            Value::Error(msg) => f.debug_tuple("Error").field(msg).finish(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            // `{:?}` keeps the trailing `.0` so floats never print like ints
            Value::Float(n) => write!(f, "{:?}", n),
            Value::String(s) => write!(f, "{:?}", s),
            Value::List(items) => Value::fmt_list(f, items),
            Value::Map(map) => Value::fmt_map(f, map),
            Value::Func(func) => write!(f, "<fn {}>", func.name()),
            Value::Error(msg) => write!(f, "error({:?})", msg),
        }
    }
}

// ============================================================================
// CONVERSIONS
// ============================================================================

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! impl_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(n: $ty) -> Self {
                    Value::Int(n as i64)
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<f32> for Value {
    fn from(n: f32) -> Self {
        Value::Float(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::list(items)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Nil, Into::into)
    }
}

impl From<NativeFn> for Value {
    fn from(func: NativeFn) -> Self {
        Value::Func(func)
    }
}

// ============================================================================
// NATIVE FUNCTIONS
// ============================================================================

type NativeBody = dyn Fn(&[Value]) -> Result<Value, ScriptError> + Send + Sync;

/// A host function exposed to scripts, usually registered by an environment hook.
///
/// Two `NativeFn` values are equal only when they share the same underlying closure.
#[derive(Clone)]
pub struct NativeFn {
    name: Arc<str>,
    body: Arc<NativeBody>,
}

impl NativeFn {
    pub fn new<F>(name: &str, body: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, ScriptError> + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name),
            body: Arc::new(body),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, args: &[Value]) -> Result<Value, ScriptError> {
        (self.body)(args)
    }

    /// True when both handles point at the same closure.
    pub fn same_fn(&self, other: &NativeFn) -> bool {
        Arc::ptr_eq(&self.body, &other.body)
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFn({})", self.name)
    }
}
