//! scriptcase: declarative conformance tests for embeddable interpreters.
//!
//! A [`TestCase`] states a script and what should happen when it is parsed, run, and
//! inspected afterwards. [`run_test_case`] drives any [`Interpreter`] through that
//! protocol and hands each discrepancy to a [`Reporter`]; [`run_tests`] and
//! [`assert_tests`] do the same for a whole suite.

pub use crate::case::{EnvHook, ErrorCheck, ErrorPredicate, TestCase};
pub use crate::config::{RunnerConfig, SuiteOptions};
pub use crate::errors::{
    ConfigError, Failure, FailureKind, Phase, ScriptError, ScriptErrorKind,
};
pub use crate::interpreter::{Environment, Interpreter, Parsed, Ran};
pub use crate::reporting::{CollectingReporter, ConsoleReporter, Reporter};
pub use crate::runner::{run_test_case, CaseOutcome};
pub use crate::suite::{assert_tests, run_tests, SuiteSummary};
pub use crate::value::{value_equal, value_equal_with, NativeFn, NumericEquality, Value};

pub mod case;
pub mod config;
pub mod errors;
pub mod interpreter;
pub mod reporting;
pub mod runner;
pub mod suite;
pub mod value;
