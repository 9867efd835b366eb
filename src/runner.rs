//! The case runner: parse, configure, run, verify.
//!
//! # Protocol
//!
//! 1. **Parse** the script. A parse error mismatch is reported, and the case goes on:
//!    whatever program the parser left behind is still executed.
//! 2. **Configure** a fresh environment: suite hook, case hook, types, inputs. Any error
//!    here is a fixture error and aborts the case.
//! 3. **Run** the program. The run error and the returned value are checked
//!    independently.
//! 4. **Verify** every expected binding. Lookup failures and mismatches are reported
//!    per name; the remaining names are still checked.
//!
//! The environment is released exactly once when the case ends, whatever happened.

use crate::case::{ErrorCheck, TestCase};
use crate::config::SuiteOptions;
use crate::errors::{Failure, FailureKind, Phase, ScriptError};
use crate::interpreter::{EnvGuard, Environment, Interpreter, Ran};
use crate::reporting::Reporter;
use crate::value::{value_equal_with, NumericEquality};
use tracing::{debug, error, warn};

/// How a single case ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseOutcome {
    Passed,
    /// All phases ran; `failures` mismatches were reported.
    Failed { failures: usize },
    /// A fixture error stopped the case before it ran.
    Aborted { failures: usize },
}

impl CaseOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, CaseOutcome::Passed)
    }

    pub fn failures(&self) -> usize {
        match self {
            CaseOutcome::Passed => 0,
            CaseOutcome::Failed { failures } | CaseOutcome::Aborted { failures } => *failures,
        }
    }
}

/// Forwards failures for one case to the reporter, stamping them with the case context.
struct CaseReport<'a, R: Reporter + ?Sized> {
    label: &'a str,
    script: &'a str,
    reporter: &'a mut R,
    failures: usize,
}

impl<'a, R: Reporter + ?Sized> CaseReport<'a, R> {
    fn fail(&mut self, kind: FailureKind) {
        if kind.is_fixture() {
            error!(phase = %kind.phase(), "{}", kind);
        } else {
            warn!(phase = %kind.phase(), "{}", kind);
        }
        self.failures += 1;
        self.reporter.report(Failure {
            case: self.label.to_string(),
            script: self.script.to_string(),
            kind,
        });
    }
}

// =============================================================================
// PUBLIC API
// =============================================================================

/// Run one test case against `interpreter`, reporting every discrepancy to `reporter`.
#[tracing::instrument(skip_all, fields(case = %case.label()))]
pub fn run_test_case<I, R>(
    interpreter: &I,
    case: &TestCase<I::Env>,
    options: &SuiteOptions<I::Env>,
    reporter: &mut R,
) -> CaseOutcome
where
    I: Interpreter,
    R: Reporter + ?Sized,
{
    let mut report = CaseReport {
        label: case.label(),
        script: &case.script,
        reporter,
        failures: 0,
    };

    let program = parse_phase(interpreter, case, &mut report);

    let mut guard = EnvGuard::new(interpreter.new_env());
    if let Err(kind) = setup_env_phase(guard.env_mut(), case, options) {
        report.fail(kind);
        return CaseOutcome::Aborted {
            failures: report.failures,
        };
    }

    run_phase(
        interpreter,
        &program,
        guard.env_mut(),
        case,
        options.config.numeric,
        &mut report,
    );
    verify_phase(guard.env(), case, options.config.numeric, &mut report);

    match report.failures {
        0 => CaseOutcome::Passed,
        failures => CaseOutcome::Failed { failures },
    }
}

// =============================================================================
// PHASES
// =============================================================================

fn parse_phase<I, R>(
    interpreter: &I,
    case: &TestCase<I::Env>,
    report: &mut CaseReport<'_, R>,
) -> I::Program
where
    I: Interpreter,
    R: Reporter + ?Sized,
{
    debug!("parse");
    let parsed = interpreter.parse(&case.script);
    if let Some(kind) = check_error(
        Phase::Parse,
        &case.parse_error_check,
        case.parse_error.as_deref(),
        parsed.error.as_ref(),
    ) {
        report.fail(kind);
    }
    parsed.program
}

fn setup_env_phase<E: Environment>(
    env: &mut E,
    case: &TestCase<E>,
    options: &SuiteOptions<E>,
) -> Result<(), FailureKind> {
    debug!("configure environment");
    for hook in options.env_setup.iter().chain(case.env_setup.iter()) {
        hook(&mut *env).map_err(|error| FailureKind::EnvSetup { error })?;
    }
    for (name, prototype) in &case.types {
        env.define_type(name, prototype)
            .map_err(|error| FailureKind::DefineType {
                name: name.clone(),
                error,
            })?;
    }
    for (name, value) in &case.inputs {
        env.define(name, value.clone())
            .map_err(|error| FailureKind::Define {
                name: name.clone(),
                error,
            })?;
    }
    Ok(())
}

fn run_phase<I, R>(
    interpreter: &I,
    program: &I::Program,
    env: &mut I::Env,
    case: &TestCase<I::Env>,
    numeric: NumericEquality,
    report: &mut CaseReport<'_, R>,
) where
    I: Interpreter,
    R: Reporter + ?Sized,
{
    debug!("run");
    let Ran { value, error } = interpreter.run(program, env);
    if let Some(kind) = check_error(
        Phase::Run,
        &case.run_error_check,
        case.run_error.as_deref(),
        error.as_ref(),
    ) {
        report.fail(kind);
    }
    if !value_equal_with(&value, &case.run_output, numeric) {
        report.fail(FailureKind::RunOutput {
            received: value,
            expected: case.run_output.clone(),
        });
    }
}

fn verify_phase<E, R>(
    env: &E,
    case: &TestCase<E>,
    numeric: NumericEquality,
    report: &mut CaseReport<'_, R>,
) where
    E: Environment,
    R: Reporter + ?Sized,
{
    debug!(outputs = case.outputs.len(), "verify");
    for (name, expected) in &case.outputs {
        let received = match env.get(name) {
            Ok(value) => value,
            Err(error) => {
                report.fail(FailureKind::Lookup {
                    name: name.clone(),
                    error,
                });
                continue;
            }
        };
        if !value_equal_with(&received, expected, numeric) {
            report.fail(FailureKind::Output {
                name: name.clone(),
                received,
                expected: expected.clone(),
            });
        }
    }
}

// =============================================================================
// ERROR EXPECTATIONS
// =============================================================================

/// Judge an observed error. A custom check decides alone; otherwise the messages must
/// be identical, with "no error" only matching "no error expected".
fn check_error(
    phase: Phase,
    check: &ErrorCheck,
    expected: Option<&str>,
    actual: Option<&ScriptError>,
) -> Option<FailureKind> {
    match check {
        ErrorCheck::Custom(predicate) => predicate(actual)
            .err()
            .map(|message| FailureKind::CustomCheck { phase, message }),
        ErrorCheck::Exact => {
            let received = actual.map(|e| e.to_string());
            if received.as_deref() == expected {
                return None;
            }
            let expected = expected.map(str::to_string);
            Some(match phase {
                Phase::Parse => FailureKind::ParseError { received, expected },
                _ => FailureKind::RunError { received, expected },
            })
        }
    }
}
