//! Declarative test cases.
//!
//! A [`TestCase`] describes one scenario: the script, what parsing should report, how
//! to prepare the environment, what the run should report and yield, and which names
//! must be bound afterwards. The runner only ever reads it.

use crate::errors::ScriptError;
use crate::value::Value;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Hook that customizes a fresh environment before types and inputs are bound.
pub type EnvHook<E> = Arc<dyn Fn(&mut E) -> Result<(), ScriptError>>;

/// Caller-supplied verdict on an error (or on its absence). `Err` carries the reason.
pub type ErrorPredicate = Arc<dyn Fn(Option<&ScriptError>) -> Result<(), String>>;

// ============================================================================
// ERROR CHECK STRATEGY
// ============================================================================

/// How the parse or run error of a case is judged.
///
/// `Exact` compares the error message with the declared expected message (or requires
/// that no error occurred when none is declared). `Custom` replaces that comparison
/// entirely; the declared message is then ignored.
#[derive(Clone, Default)]
pub enum ErrorCheck {
    #[default]
    Exact,
    Custom(ErrorPredicate),
}

impl ErrorCheck {
    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(Option<&ScriptError>) -> Result<(), String> + 'static,
    {
        ErrorCheck::Custom(Arc::new(predicate))
    }

    /// Some error must occur; its message does not matter.
    pub fn any() -> Self {
        Self::custom(|error| match error {
            Some(_) => Ok(()),
            None => Err("expected an error, but none occurred".to_string()),
        })
    }

    /// An error must occur and its message must contain `needle`.
    ///
    /// ```rust
    /// use scriptcase::{ErrorCheck, ScriptError};
    /// let check = ErrorCheck::contains("undefined");
    /// let err = ScriptError::runtime("undefined symbol 'x'");
    /// assert!(check.verdict(Some(&err)).unwrap().is_ok());
    /// assert!(check.verdict(None).unwrap().is_err());
    /// ```
    pub fn contains(needle: impl Into<String>) -> Self {
        let needle = needle.into();
        Self::custom(move |error| match error {
            Some(e) if e.message.contains(&needle) => Ok(()),
            Some(e) => Err(format!("error {:?} does not contain {:?}", e.message, needle)),
            None => Err(format!("expected an error containing {:?}, but none occurred", needle)),
        })
    }

    /// An error must occur and its message must match `pattern`.
    pub fn matches(pattern: &str) -> Result<Self, regex::Error> {
        let re = Regex::new(pattern)?;
        Ok(Self::custom(move |error| match error {
            Some(e) if re.is_match(&e.message) => Ok(()),
            Some(e) => Err(format!("error {:?} does not match /{}/", e.message, re)),
            None => Err(format!("expected an error matching /{}/, but none occurred", re)),
        }))
    }

    /// The custom verdict, or `None` for `Exact`.
    pub fn verdict(&self, error: Option<&ScriptError>) -> Option<Result<(), String>> {
        match self {
            ErrorCheck::Exact => None,
            ErrorCheck::Custom(predicate) => Some(predicate(error)),
        }
    }
}

impl fmt::Debug for ErrorCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCheck::Exact => write!(f, "Exact"),
            ErrorCheck::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

// ============================================================================
// TEST CASE
// ============================================================================

/// One interpreter conformance scenario, generic over the environment type its
/// setup hook receives.
///
/// # Examples
///
/// ```rust
/// use scriptcase::{TestCase, Value};
/// # struct Env;
/// let case: TestCase<Env> = TestCase::new("x = x + 5")
///     .with_input("x", 10)
///     .expect_run_output(15)
///     .expect_binding("x", 15);
/// assert_eq!(case.inputs.get("x"), Some(&Value::Int(10)));
/// assert_eq!(case.label(), "x = x + 5");
/// ```
pub struct TestCase<E> {
    pub name: Option<String>,
    pub script: String,
    /// Expected parse error message; `None` means parsing must succeed.
    pub parse_error: Option<String>,
    pub parse_error_check: ErrorCheck,
    pub env_setup: Option<EnvHook<E>>,
    /// Name to prototype value whose kind is registered as a type.
    pub types: BTreeMap<String, Value>,
    pub inputs: BTreeMap<String, Value>,
    /// Expected run error message; `None` means the run must succeed.
    pub run_error: Option<String>,
    pub run_error_check: ErrorCheck,
    pub run_output: Value,
    /// Bindings that must hold after the run.
    pub outputs: BTreeMap<String, Value>,
}

impl<E> TestCase<E> {
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            name: None,
            script: script.into(),
            parse_error: None,
            parse_error_check: ErrorCheck::Exact,
            env_setup: None,
            types: BTreeMap::new(),
            inputs: BTreeMap::new(),
            run_error: None,
            run_error_check: ErrorCheck::Exact,
            run_output: Value::Nil,
            outputs: BTreeMap::new(),
        }
    }

    /// The name used in reports: the case name, or the script itself.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.script)
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn expect_parse_error(mut self, message: impl Into<String>) -> Self {
        self.parse_error = Some(message.into());
        self
    }

    pub fn check_parse_error(mut self, check: ErrorCheck) -> Self {
        self.parse_error_check = check;
        self
    }

    pub fn with_env_setup<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut E) -> Result<(), ScriptError> + 'static,
    {
        self.env_setup = Some(Arc::new(hook));
        self
    }

    pub fn with_type(mut self, name: impl Into<String>, prototype: impl Into<Value>) -> Self {
        self.types.insert(name.into(), prototype.into());
        self
    }

    pub fn with_input(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.inputs.insert(name.into(), value.into());
        self
    }

    pub fn expect_run_error(mut self, message: impl Into<String>) -> Self {
        self.run_error = Some(message.into());
        self
    }

    pub fn check_run_error(mut self, check: ErrorCheck) -> Self {
        self.run_error_check = check;
        self
    }

    pub fn expect_run_output(mut self, value: impl Into<Value>) -> Self {
        self.run_output = value.into();
        self
    }

    pub fn expect_binding(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.outputs.insert(name.into(), value.into());
        self
    }
}

impl<E> Clone for TestCase<E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            script: self.script.clone(),
            parse_error: self.parse_error.clone(),
            parse_error_check: self.parse_error_check.clone(),
            env_setup: self.env_setup.clone(),
            types: self.types.clone(),
            inputs: self.inputs.clone(),
            run_error: self.run_error.clone(),
            run_error_check: self.run_error_check.clone(),
            run_output: self.run_output.clone(),
            outputs: self.outputs.clone(),
        }
    }
}

impl<E> fmt::Debug for TestCase<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCase")
            .field("name", &self.name)
            .field("script", &self.script)
            .field("parse_error", &self.parse_error)
            .field("parse_error_check", &self.parse_error_check)
            .field("env_setup", &self.env_setup.as_ref().map(|_| ".."))
            .field("types", &self.types)
            .field("inputs", &self.inputs)
            .field("run_error", &self.run_error)
            .field("run_error_check", &self.run_error_check)
            .field("run_output", &self.run_output)
            .field("outputs", &self.outputs)
            .finish()
    }
}
