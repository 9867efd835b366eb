//! The seam between the harness and the interpreter under test.
//!
//! The harness never looks inside a program or an environment; it only drives the
//! operations below and compares what comes back.

use crate::errors::ScriptError;
use crate::value::Value;

/// Result of parsing a script.
///
/// Parsing may fail and still leave a (possibly empty or partial) program behind; the
/// runner executes whatever is here even when `error` is set.
#[derive(Debug, Clone, Default)]
pub struct Parsed<P> {
    pub program: P,
    pub error: Option<ScriptError>,
}

impl<P> Parsed<P> {
    pub fn ok(program: P) -> Self {
        Self {
            program,
            error: None,
        }
    }

    pub fn failed(program: P, error: ScriptError) -> Self {
        Self {
            program,
            error: Some(error),
        }
    }
}

impl<P: Default> Parsed<P> {
    /// Convenience for parsers that either succeed or produce nothing.
    pub fn from_result(result: Result<P, ScriptError>) -> Self {
        match result {
            Ok(program) => Self::ok(program),
            Err(error) => Self::failed(P::default(), error),
        }
    }
}

/// Result of running a program.
///
/// A failed run may still yield a value (for example, that of the last statement that
/// completed); the runner checks `value` and `error` independently.
#[derive(Debug, Clone, Default)]
pub struct Ran {
    pub value: Value,
    pub error: Option<ScriptError>,
}

impl Ran {
    pub fn ok(value: Value) -> Self {
        Self { value, error: None }
    }

    pub fn failed(value: Value, error: ScriptError) -> Self {
        Self {
            value,
            error: Some(error),
        }
    }
}

impl From<Result<Value, ScriptError>> for Ran {
    /// An error without a value observes `Nil`.
    fn from(result: Result<Value, ScriptError>) -> Self {
        match result {
            Ok(value) => Self::ok(value),
            Err(error) => Self::failed(Value::Nil, error),
        }
    }
}

/// A parser plus execution engine for one scripting language.
pub trait Interpreter {
    /// The parsed statement sequence.
    type Program;
    /// The name-binding context a program runs against.
    type Env: Environment;

    fn parse(&self, source: &str) -> Parsed<Self::Program>;

    /// A fresh, empty environment.
    fn new_env(&self) -> Self::Env;

    /// Run a program; the value is that of the last statement evaluated.
    fn run(&self, program: &Self::Program, env: &mut Self::Env) -> Ran;
}

/// The interpreter's mutable name-binding context.
pub trait Environment {
    /// Register `prototype`'s kind under `name`. A nil prototype is an error.
    fn define_type(&mut self, name: &str, prototype: &Value) -> Result<(), ScriptError>;

    fn define(&mut self, name: &str, value: Value) -> Result<(), ScriptError>;

    fn get(&self, name: &str) -> Result<Value, ScriptError>;

    /// Release resources held by the environment. Must be idempotent.
    fn destroy(&mut self);
}

/// Owns an environment for the length of one case and destroys it on every exit path.
pub(crate) struct EnvGuard<E: Environment> {
    env: E,
}

impl<E: Environment> EnvGuard<E> {
    pub(crate) fn new(env: E) -> Self {
        Self { env }
    }

    pub(crate) fn env(&self) -> &E {
        &self.env
    }

    pub(crate) fn env_mut(&mut self) -> &mut E {
        &mut self.env
    }
}

impl<E: Environment> Drop for EnvGuard<E> {
    fn drop(&mut self) {
        self.env.destroy();
    }
}
