//! Suite runner: every case, in order, with one shared set of options.

use crate::case::TestCase;
use crate::config::SuiteOptions;
use crate::interpreter::Interpreter;
use crate::reporting::{CollectingReporter, Reporter};
use crate::runner::{run_test_case, CaseOutcome};
use std::fmt;
use tracing::info;

/// Counts of how the cases of a suite ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SuiteSummary {
    pub passed: usize,
    pub failed: usize,
    /// Cases stopped by a fixture error.
    pub aborted: usize,
    /// Cases skipped because the reporter asked the suite to stop.
    pub not_run: usize,
}

impl SuiteSummary {
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.aborted + self.not_run
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.aborted == 0 && self.not_run == 0
    }

    pub fn record(&mut self, outcome: CaseOutcome) {
        match outcome {
            CaseOutcome::Passed => self.passed += 1,
            CaseOutcome::Failed { .. } => self.failed += 1,
            CaseOutcome::Aborted { .. } => self.aborted += 1,
        }
    }
}

impl fmt::Display for SuiteSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total {}, passed {}, failed {}, aborted {}, not run {}",
            self.total(),
            self.passed,
            self.failed,
            self.aborted,
            self.not_run
        )
    }
}

/// Run every case in order. Failures never stop the suite; only the reporter can, through
/// [`Reporter::should_stop`], which is asked before each case.
#[tracing::instrument(skip_all, fields(cases = cases.len()))]
pub fn run_tests<I, R>(
    interpreter: &I,
    cases: &[TestCase<I::Env>],
    options: &SuiteOptions<I::Env>,
    reporter: &mut R,
) -> SuiteSummary
where
    I: Interpreter,
    R: Reporter + ?Sized,
{
    let mut summary = SuiteSummary::default();
    for (index, case) in cases.iter().enumerate() {
        if reporter.should_stop() {
            summary.not_run = cases.len() - index;
            info!(not_run = summary.not_run, "reporter stopped the suite");
            break;
        }
        summary.record(run_test_case(interpreter, case, options, reporter));
    }
    info!(%summary, "suite finished");
    summary
}

/// Run a suite and panic with every rendered failure if any case did not pass.
///
/// Meant to be called from a `#[test]` function.
#[track_caller]
pub fn assert_tests<I: Interpreter>(
    interpreter: &I,
    cases: &[TestCase<I::Env>],
    options: &SuiteOptions<I::Env>,
) -> SuiteSummary {
    let mut reporter = CollectingReporter::new().fail_fast(options.config.fail_fast);
    let summary = run_tests(interpreter, cases, options, &mut reporter);
    if !summary.is_success() {
        panic!(
            "{} of {} test cases did not pass ({})\n\n{}",
            summary.total() - summary.passed,
            summary.total(),
            summary,
            reporter.render()
        );
    }
    summary
}
