//! Error and failure types.
//!
//! Two families live here:
//! - [`ScriptError`]: what collaborators (parser, engine, environment, hooks) return.
//!   Its `Display` is the bare message, which is exactly what expected-error
//!   comparison looks at.
//! - [`Failure`]: what the runner hands to a [`Reporter`](crate::reporting::Reporter)
//!   when an observation does not match the test case.

use crate::value::Value;
use miette::{Diagnostic, SourceSpan};
use std::fmt;
use thiserror::Error;

// ============================================================================
// COLLABORATOR ERRORS
// ============================================================================

/// Which collaborator operation produced a [`ScriptError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptErrorKind {
    Parse,
    Runtime,
    Binding,
    Lookup,
    Setup,
}

/// An error reported by the interpreter under test or by a fixture hook.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("{message}")]
pub struct ScriptError {
    pub kind: ScriptErrorKind,
    pub message: String,
    #[label("here")]
    pub span: Option<SourceSpan>,
}

impl ScriptError {
    pub fn new(kind: ScriptErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            span: None,
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ScriptErrorKind::Parse, message)
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(ScriptErrorKind::Runtime, message)
    }

    pub fn binding(message: impl Into<String>) -> Self {
        Self::new(ScriptErrorKind::Binding, message)
    }

    pub fn lookup(message: impl Into<String>) -> Self {
        Self::new(ScriptErrorKind::Lookup, message)
    }

    pub fn setup(message: impl Into<String>) -> Self {
        Self::new(ScriptErrorKind::Setup, message)
    }

    /// Attach the byte range of the offending source text.
    pub fn with_span(mut self, offset: usize, len: usize) -> Self {
        self.span = Some(SourceSpan::from((offset, len)));
        self
    }
}

// ============================================================================
// FAILURES
// ============================================================================

/// The protocol phase a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Parse,
    Setup,
    Run,
    Verify,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Parse => "parse",
            Phase::Setup => "setup",
            Phase::Run => "run",
            Phase::Verify => "verify",
        };
        f.write_str(name)
    }
}

/// What went wrong in a single observation.
#[derive(Debug, Clone, Error, Diagnostic)]
pub enum FailureKind {
    #[error("parse error - received: {} - expected: {}", show_error(.received), show_error(.expected))]
    #[diagnostic(
        code(scriptcase::parse_error),
        help("expected parse errors are compared by message text")
    )]
    ParseError {
        received: Option<String>,
        expected: Option<String>,
    },

    #[error("run error - received: {} - expected: {}", show_error(.received), show_error(.expected))]
    #[diagnostic(
        code(scriptcase::run_error),
        help("expected run errors are compared by message text")
    )]
    RunError {
        received: Option<String>,
        expected: Option<String>,
    },

    #[error("{phase} error check failed: {message}")]
    #[diagnostic(code(scriptcase::custom_check))]
    CustomCheck { phase: Phase, message: String },

    #[error("environment setup error: {error}")]
    #[diagnostic(
        code(scriptcase::fixture::env_setup),
        help("a setup hook failed; the case was not run")
    )]
    EnvSetup { error: ScriptError },

    #[error("define type error: {error} - type name: {name}")]
    #[diagnostic(
        code(scriptcase::fixture::define_type),
        help("type descriptors are prototype values and must not be nil")
    )]
    DefineType { name: String, error: ScriptError },

    #[error("define error: {error} - input name: {name}")]
    #[diagnostic(
        code(scriptcase::fixture::define),
        help("an input could not be bound; the case was not run")
    )]
    Define { name: String, error: ScriptError },

    #[error(
        "run output - received: {received:?} ({}) - expected: {expected:?} ({})",
        .received.kind(),
        .expected.kind()
    )]
    #[diagnostic(code(scriptcase::run_output))]
    RunOutput { received: Value, expected: Value },

    #[error("get error: {error} - output name: {name}")]
    #[diagnostic(
        code(scriptcase::lookup),
        help("the name was not bound in the environment after the run")
    )]
    Lookup { name: String, error: ScriptError },

    #[error(
        "output {name} - received: {received:?} ({}) - expected: {expected:?} ({})",
        .received.kind(),
        .expected.kind()
    )]
    #[diagnostic(code(scriptcase::output))]
    Output {
        name: String,
        received: Value,
        expected: Value,
    },
}

impl FailureKind {
    pub fn phase(&self) -> Phase {
        match self {
            FailureKind::ParseError { .. } => Phase::Parse,
            FailureKind::CustomCheck { phase, .. } => *phase,
            FailureKind::EnvSetup { .. }
            | FailureKind::DefineType { .. }
            | FailureKind::Define { .. } => Phase::Setup,
            FailureKind::RunError { .. } | FailureKind::RunOutput { .. } => Phase::Run,
            FailureKind::Lookup { .. } | FailureKind::Output { .. } => Phase::Verify,
        }
    }

    /// Fixture errors abort the case; everything else is an expectation mismatch.
    pub fn is_fixture(&self) -> bool {
        matches!(
            self,
            FailureKind::EnvSetup { .. } | FailureKind::DefineType { .. } | FailureKind::Define { .. }
        )
    }

    /// The received and expected values, for value mismatches only.
    pub fn values(&self) -> Option<(&Value, &Value)> {
        match self {
            FailureKind::RunOutput { received, expected }
            | FailureKind::Output {
                received, expected, ..
            } => Some((received, expected)),
            _ => None,
        }
    }
}

fn show_error(error: &Option<String>) -> String {
    match error {
        Some(message) => message.clone(),
        None => "<none>".to_string(),
    }
}

/// A failure as delivered to a reporter: what went wrong plus the case it came from.
#[derive(Debug, Clone, Error)]
#[error("{kind} - script: {script}")]
pub struct Failure {
    /// Case label (the case name, or the script when unnamed).
    pub case: String,
    pub script: String,
    pub kind: FailureKind,
}

impl Failure {
    pub fn phase(&self) -> Phase {
        self.kind.phase()
    }

    pub fn is_fixture(&self) -> bool {
        self.kind.is_fixture()
    }
}

impl Diagnostic for Failure {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.kind.code()
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.kind.help()
    }
}

// ============================================================================
// CONFIGURATION ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}: expected one of {expected}")]
    #[diagnostic(code(scriptcase::config))]
    InvalidEnv {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}
