//! Reporting sinks.
//!
//! The runner pushes every [`Failure`] it finds into a [`Reporter`] and never looks
//! back. Reporters are append-only and must not fail; the only influence a reporter has
//! on a run is [`Reporter::should_stop`], checked by the suite runner between cases.

use crate::config::RunnerConfig;
use crate::errors::Failure;
use crate::suite::SuiteSummary;
use crate::value::Value;
use difference::{Changeset, Difference};
use miette::Diagnostic;
use std::io::{self, Write};
use termcolor::{Color, ColorSpec, StandardStream, WriteColor};

/// Destination for failures found while running cases.
pub trait Reporter {
    fn report(&mut self, failure: Failure);

    /// Whether the suite runner should stop before the next case.
    fn should_stop(&self) -> bool {
        false
    }
}

impl<R: Reporter + ?Sized> Reporter for &mut R {
    fn report(&mut self, failure: Failure) {
        (**self).report(failure)
    }

    fn should_stop(&self) -> bool {
        (**self).should_stop()
    }
}

// ============================================================================
// COLLECTING REPORTER
// ============================================================================

/// Keeps every failure in memory, in the order reported.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    failures: Vec<Failure>,
    fail_fast: bool,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop the suite once any failure has been recorded.
    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    pub fn into_failures(self) -> Vec<Failure> {
        self.failures
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Plain-text rendering of every failure, one block per failure.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for failure in &self.failures {
            out.push_str(&render_failure(failure));
        }
        out
    }
}

impl Reporter for CollectingReporter {
    fn report(&mut self, failure: Failure) {
        self.failures.push(failure);
    }

    fn should_stop(&self) -> bool {
        self.fail_fast && !self.failures.is_empty()
    }
}

/// Plain-text block for one failure: header, message, and the diagnostic code.
pub fn render_failure(failure: &Failure) -> String {
    let mut out = format!("FAIL [{}] {}\n  {}\n", failure.phase(), failure.case, failure);
    if let Some(code) = failure.code() {
        out.push_str(&format!("  code: {}\n", code));
    }
    if let Some((received, expected)) = failure.kind.values() {
        out.push_str(&format!(
            "  received kind: {} - expected kind: {}\n",
            received.kind(),
            expected.kind()
        ));
    }
    out
}

// ============================================================================
// CONSOLE REPORTER
// ============================================================================

/// Writes failures as they arrive, colored, with a diff for value mismatches.
pub struct ConsoleReporter<W: WriteColor = StandardStream> {
    out: W,
    failures: usize,
    fail_fast: bool,
}

impl ConsoleReporter<StandardStream> {
    /// Reporter on stderr, following the config's color and fail-fast settings.
    pub fn stderr(config: &RunnerConfig) -> Self {
        Self::with_writer(StandardStream::stderr(config.color_choice()), config)
    }
}

impl<W: WriteColor> ConsoleReporter<W> {
    pub fn with_writer(out: W, config: &RunnerConfig) -> Self {
        Self {
            out,
            failures: 0,
            fail_fast: config.fail_fast,
        }
    }

    pub fn failures(&self) -> usize {
        self.failures
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Prints the end-of-suite summary line.
    pub fn summary(&mut self, summary: &SuiteSummary) {
        let _ = self.write_summary(summary);
    }

    fn write_failure(&mut self, failure: &Failure) -> io::Result<()> {
        self.out
            .set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
        write!(self.out, "FAIL")?;
        self.out.reset()?;
        writeln!(self.out, " [{}] {}", failure.phase(), failure.case)?;
        writeln!(self.out, "  {}", failure.kind)?;
        writeln!(self.out, "  script: {}", failure.script)?;
        if let Some(help) = failure.help() {
            self.out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
            writeln!(self.out, "  help: {}", help)?;
            self.out.reset()?;
        }
        if let Some((received, expected)) = failure.kind.values() {
            self.write_value_diff(received, expected)?;
        }
        Ok(())
    }

    fn write_value_diff(&mut self, received: &Value, expected: &Value) -> io::Result<()> {
        writeln!(
            self.out,
            "  kinds: received {} / expected {}",
            received.kind(),
            expected.kind()
        )?;
        writeln!(self.out, "  diff (-expected +received):")?;
        for diff in value_diff(received, expected) {
            match diff {
                Difference::Same(ref x) => {
                    self.out.reset()?;
                    write_lines(&mut self.out, "   ", x)?;
                }
                Difference::Add(ref x) => {
                    self.out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
                    write_lines(&mut self.out, "  +", x)?;
                }
                Difference::Rem(ref x) => {
                    self.out.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
                    write_lines(&mut self.out, "  -", x)?;
                }
            }
        }
        self.out.reset()
    }

    fn write_summary(&mut self, summary: &SuiteSummary) -> io::Result<()> {
        write!(self.out, "\nTest summary: total {}, ", summary.total())?;
        write_colored(&mut self.out, Color::Green, "passed")?;
        write!(self.out, " {}, ", summary.passed)?;
        write_colored(&mut self.out, Color::Red, "failed")?;
        write!(self.out, " {}, ", summary.failed)?;
        write_colored(&mut self.out, Color::Red, "aborted")?;
        write!(self.out, " {}, ", summary.aborted)?;
        write_colored(&mut self.out, Color::Yellow, "not run")?;
        writeln!(self.out, " {}", summary.not_run)
    }
}

impl<W: WriteColor> Reporter for ConsoleReporter<W> {
    fn report(&mut self, failure: Failure) {
        self.failures += 1;
        // a broken terminal must not abort the run
        let _ = self.write_failure(&failure);
    }

    fn should_stop(&self) -> bool {
        self.fail_fast && self.failures > 0
    }
}

/// Line diff between the pretty `Debug` renderings of two values.
pub fn value_diff(received: &Value, expected: &Value) -> Vec<Difference> {
    let expected = format!("{:#?}", expected);
    let received = format!("{:#?}", received);
    Changeset::new(&expected, &received, "\n").diffs
}

fn write_lines<W: Write>(out: &mut W, prefix: &str, text: &str) -> io::Result<()> {
    for line in text.lines() {
        writeln!(out, "{}{}", prefix, line)?;
    }
    Ok(())
}

fn write_colored<W: WriteColor>(out: &mut W, color: Color, text: &str) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(color)))?;
    write!(out, "{}", text)?;
    out.reset()
}
