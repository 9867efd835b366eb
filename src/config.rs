//! Runner configuration.
//!
//! [`RunnerConfig`] holds the knobs that change how results are judged and shown;
//! [`SuiteOptions`] adds the suite-level environment hook that every case shares.

use crate::case::EnvHook;
use crate::errors::{ConfigError, ScriptError};
use crate::value::NumericEquality;
use std::fmt;
use std::sync::Arc;
use termcolor::ColorChoice;

const NUMERIC_VAR: &str = "SCRIPTCASE_NUMERIC";
const COLOR_VAR: &str = "SCRIPTCASE_COLOR";
const FAIL_FAST_VAR: &str = "SCRIPTCASE_FAIL_FAST";

/// Configuration for judging and reporting test cases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// How `Int` and `Float` results compare.
    pub numeric: NumericEquality,
    /// Color policy for console output; `Auto` still defers to `TERM` and `NO_COLOR`.
    pub color: ColorChoice,
    /// Ask reporters built from this config to stop the suite after the first failure.
    pub fail_fast: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            numeric: NumericEquality::Strict,
            color: detect_color(),
            fail_fast: false,
        }
    }
}

impl RunnerConfig {
    /// Defaults overridden by `SCRIPTCASE_NUMERIC` (`strict`|`coerce`),
    /// `SCRIPTCASE_COLOR` (`auto`|`always`|`never`) and `SCRIPTCASE_FAIL_FAST` (`0`|`1`).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(NUMERIC_VAR) {
            config.numeric = match value.trim().to_ascii_lowercase().as_str() {
                "strict" => NumericEquality::Strict,
                "coerce" => NumericEquality::Coerce,
                _ => return Err(invalid(NUMERIC_VAR, value, "strict, coerce")),
            };
        }

        if let Some(value) = lookup(COLOR_VAR) {
            config.color = match value.trim().to_ascii_lowercase().as_str() {
                "auto" => detect_color(),
                "always" => ColorChoice::Always,
                "never" => ColorChoice::Never,
                _ => return Err(invalid(COLOR_VAR, value, "auto, always, never")),
            };
        }

        if let Some(value) = lookup(FAIL_FAST_VAR) {
            config.fail_fast = match value.trim() {
                "1" | "true" => true,
                "0" | "false" | "" => false,
                _ => return Err(invalid(FAIL_FAST_VAR, value, "0, 1")),
            };
        }

        Ok(config)
    }

    pub fn with_numeric(mut self, numeric: NumericEquality) -> Self {
        self.numeric = numeric;
        self
    }

    /// `true` forces colors on, `false` turns them off.
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.color = if use_colors {
            ColorChoice::Always
        } else {
            ColorChoice::Never
        };
        self
    }

    pub fn with_color_choice(mut self, color: ColorChoice) -> Self {
        self.color = color;
        self
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn color_choice(&self) -> ColorChoice {
        self.color
    }
}

/// `Auto` on a terminal, `Never` when stderr is redirected.
fn detect_color() -> ColorChoice {
    if atty::is(atty::Stream::Stderr) {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    }
}

fn invalid(var: &'static str, value: String, expected: &'static str) -> ConfigError {
    ConfigError::InvalidEnv {
        var,
        value,
        expected,
    }
}

/// Options shared by every case of a suite run.
pub struct SuiteOptions<E> {
    /// Applied to every fresh environment before the case's own hook.
    pub env_setup: Option<EnvHook<E>>,
    pub config: RunnerConfig,
}

impl<E> SuiteOptions<E> {
    pub fn new(config: RunnerConfig) -> Self {
        Self {
            env_setup: None,
            config,
        }
    }

    pub fn with_env_setup<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut E) -> Result<(), ScriptError> + 'static,
    {
        self.env_setup = Some(Arc::new(hook));
        self
    }
}

impl<E> Default for SuiteOptions<E> {
    fn default() -> Self {
        Self::new(RunnerConfig::default())
    }
}

impl<E> Clone for SuiteOptions<E> {
    fn clone(&self) -> Self {
        Self {
            env_setup: self.env_setup.clone(),
            config: self.config.clone(),
        }
    }
}

impl<E> fmt::Debug for SuiteOptions<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuiteOptions")
            .field("env_setup", &self.env_setup.as_ref().map(|_| ".."))
            .field("config", &self.config)
            .finish()
    }
}
