//! Contention-window growth rules applied after a failed access attempt.

use std::fmt;

use serde::Serialize;

use crate::errors::ConfigError;

/// Backoff strategy together with its parameter.
///
/// The parameter is fixed at creation, except for [`BackoffStrategy::BackoffBackon`]
/// whose exponent advances every time the window collapses back to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum BackoffStrategy {
    /// `window += step`
    Linear {
        /// Amount added to the window on every failure, at least 1
        step: u64,
    },
    /// `window *= factor`
    Exponential {
        /// Multiplier applied on every failure, at least 2
        factor: u64,
    },
    /// `window = (trial_count + 1) ^ exponent`
    Polynomial {
        /// Power applied to the next trial number, at least 1
        exponent: u32,
    },
    /// Halves the window until it reaches one, then jumps to `2 ^ exponent`
    /// and bumps the exponent.
    BackoffBackon {
        /// Exponent used for the next jump
        exponent: u32,
    },
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        Self::Exponential { factor: 2 }
    }
}

impl BackoffStrategy {
    /// Builds a strategy from its selector name.
    ///
    /// Missing parameters fall back to the strategy default: linear 1,
    /// exponential 2, polynomial 2, backoff-backon 1.
    ///
    /// # Errors
    ///
    /// - `ConfigError::UnknownBackoffStrategy` - Selector is not recognised
    /// - `ConfigError::InvalidParameter` - Parameter is out of range for the strategy
    pub fn from_name(name: &str, param: Option<u64>) -> Result<Self, ConfigError> {
        let strategy = match name.trim().to_lowercase().as_str() {
            "linear" => Self::Linear {
                step: param.unwrap_or(1),
            },
            "exponential" => Self::Exponential {
                factor: param.unwrap_or(2),
            },
            "polynomial" => Self::Polynomial {
                exponent: exponent_param(param.unwrap_or(2))?,
            },
            "backoff-backon" | "backoff_backon" | "backon" => Self::BackoffBackon {
                exponent: exponent_param(param.unwrap_or(1))?,
            },
            _ => {
                return Err(ConfigError::UnknownBackoffStrategy {
                    name: name.to_string(),
                });
            }
        };
        strategy.validate()?;
        Ok(strategy)
    }

    /// Strategy with its default parameter for every supported selector.
    pub fn all_defaults() -> [Self; 4] {
        [
            Self::Linear { step: 1 },
            Self::Exponential { factor: 2 },
            Self::Polynomial { exponent: 2 },
            Self::BackoffBackon { exponent: 1 },
        ]
    }

    /// Checks that the parameter grows the window after a failure.
    ///
    /// A window stuck at one gives colliding devices a zero penalty and a
    /// zero wait, so they collide again on every tick.
    ///
    /// # Errors
    ///
    /// - `ConfigError::InvalidParameter` - Linear step is zero, exponential
    ///   factor is below 2 or polynomial exponent is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        let stuck = match *self {
            Self::Linear { step } => step == 0,
            Self::Exponential { factor } => factor < 2,
            Self::Polynomial { exponent } => exponent == 0,
            Self::BackoffBackon { .. } => false,
        };
        if stuck {
            return Err(ConfigError::invalid(
                "backoff_param",
                format!("{self} never grows the window"),
            ));
        }
        Ok(())
    }

    /// Selector name of this strategy.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Linear { .. } => "linear",
            Self::Exponential { .. } => "exponential",
            Self::Polynomial { .. } => "polynomial",
            Self::BackoffBackon { .. } => "backoff-backon",
        }
    }

    /// Current numeric parameter.
    pub fn param(&self) -> u64 {
        match *self {
            Self::Linear { step } => step,
            Self::Exponential { factor } => factor,
            Self::Polynomial { exponent } | Self::BackoffBackon { exponent } => {
                u64::from(exponent)
            }
        }
    }

    /// Computes the window to use after a failure.
    ///
    /// `trial_count` is the already-incremented trial number. The result is
    /// clamped to `[1, max_window]`.
    pub fn next_window(&mut self, window: u64, trial_count: u32, max_window: u64) -> u64 {
        self.grown_window(window, trial_count).clamp(1, max_window.max(1))
    }

    /// Window growth before clamping.
    ///
    /// Callers compare the result with their window cap to detect clamping.
    /// Backoff-backon advances its exponent here.
    pub fn grown_window(&mut self, window: u64, trial_count: u32) -> u64 {
        match self {
            Self::Linear { step } => window.saturating_add(*step),
            Self::Exponential { factor } => window.saturating_mul(*factor),
            Self::Polynomial { exponent } => {
                u64::from(trial_count).saturating_add(1).saturating_pow(*exponent)
            }
            Self::BackoffBackon { exponent } => {
                if window == 1 {
                    let jumped = 1u64.checked_shl(*exponent).unwrap_or(u64::MAX);
                    *exponent = exponent.saturating_add(1);
                    jumped
                } else {
                    window / 2
                }
            }
        }
    }
}

impl fmt::Display for BackoffStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.param())
    }
}

fn exponent_param(value: u64) -> Result<u32, ConfigError> {
    u32::try_from(value)
        .map_err(|_| ConfigError::invalid("backoff_param", format!("exponent {value} is too large")))
}
