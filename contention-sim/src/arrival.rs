//! Device arrival processes.
//!
//! An arrival source answers one question per tick: how many new devices
//! join the simulation. Sources are selected by [`ArrivalSpec`] and draw
//! randomness only from the generator lent to them by the simulation.

use std::fmt;
use std::str::FromStr;

use rand::distr::Bernoulli;
use rand_distr::{Normal, Poisson};
use serde::Serialize;

use crate::deterministic::DeterministicRng;
use crate::errors::{ConfigError, SimulationError};

/// Generator of per-tick arrival counts.
pub trait ArrivalSource: fmt::Debug + Send {
    /// Draws the raw arrival count for one tick.
    ///
    /// The value is non-negative but may be non-finite or arbitrarily large;
    /// [`next_arrivals`] applies the divergence guard.
    fn draw(&mut self, rng: &mut DeterministicRng) -> f64;

    /// Returns name of this arrival process.
    fn name(&self) -> &str;
}

/// Draws the next arrival count and enforces the per-tick cap.
///
/// # Errors
///
/// - `SimulationError::ArrivalDivergence` - Draw was non-finite or exceeded `limit`
pub fn next_arrivals(
    source: &mut dyn ArrivalSource,
    rng: &mut DeterministicRng,
    limit: u64,
) -> Result<u64, SimulationError> {
    let drawn = source.draw(rng);
    if !drawn.is_finite() || drawn > limit as f64 {
        return Err(SimulationError::ArrivalDivergence { drawn, limit });
    }
    Ok(drawn.max(0.0) as u64)
}

/// Same number of devices every tick.
#[derive(Debug, Clone)]
pub struct ConstantArrivals {
    count: u64,
}

impl ConstantArrivals {
    /// Emits `count` devices on every tick.
    pub fn new(count: u64) -> Self {
        Self { count }
    }
}

impl ArrivalSource for ConstantArrivals {
    fn draw(&mut self, _rng: &mut DeterministicRng) -> f64 {
        self.count as f64
    }

    fn name(&self) -> &str {
        "constant"
    }
}

/// Normally distributed count, rounded to the nearest integer.
///
/// Negative draws are floored at zero.
#[derive(Debug, Clone)]
pub struct GaussianArrivals {
    distribution: Normal<f64>,
}

impl GaussianArrivals {
    /// Creates source with given mean and standard deviation.
    ///
    /// # Errors
    ///
    /// - `ConfigError::InvalidParameter` - Standard deviation is negative or not finite
    pub fn new(mean: f64, std_dev: f64) -> Result<Self, ConfigError> {
        if !mean.is_finite() {
            return Err(ConfigError::invalid("mean", "must be finite"));
        }
        let distribution = Normal::new(mean, std_dev)
            .map_err(|e| ConfigError::invalid("std_dev", e.to_string()))?;
        Ok(Self { distribution })
    }
}

impl ArrivalSource for GaussianArrivals {
    fn draw(&mut self, rng: &mut DeterministicRng) -> f64 {
        let value: f64 = rng.sample(&self.distribution);
        value.round().max(0.0)
    }

    fn name(&self) -> &str {
        "gaussian"
    }
}

/// Poisson distributed count.
#[derive(Debug, Clone)]
pub struct PoissonArrivals {
    distribution: Poisson<f64>,
}

impl PoissonArrivals {
    /// Creates source with mean arrivals per tick `lambda`.
    ///
    /// # Errors
    ///
    /// - `ConfigError::InvalidParameter` - `lambda` is not strictly positive and finite
    pub fn new(lambda: f64) -> Result<Self, ConfigError> {
        let distribution =
            Poisson::new(lambda).map_err(|e| ConfigError::invalid("lambda", e.to_string()))?;
        Ok(Self { distribution })
    }
}

impl ArrivalSource for PoissonArrivals {
    fn draw(&mut self, rng: &mut DeterministicRng) -> f64 {
        rng.sample(&self.distribution)
    }

    fn name(&self) -> &str {
        "poisson"
    }
}

/// Zero or one device, one with the configured probability.
#[derive(Debug, Clone)]
pub struct BernoulliArrivals {
    distribution: Bernoulli,
}

impl BernoulliArrivals {
    /// # Errors
    ///
    /// - `ConfigError::InvalidParameter` - Probability is outside `[0, 1]`
    pub fn new(probability: f64) -> Result<Self, ConfigError> {
        let distribution = Bernoulli::new(probability)
            .map_err(|e| ConfigError::invalid("probability", e.to_string()))?;
        Ok(Self { distribution })
    }
}

impl ArrivalSource for BernoulliArrivals {
    fn draw(&mut self, rng: &mut DeterministicRng) -> f64 {
        if rng.sample(&self.distribution) {
            1.0
        } else {
            0.0
        }
    }

    fn name(&self) -> &str {
        "bernoulli"
    }
}

/// Heavy-tailed count `floor(1 / u)` with `u` uniform in `(0, 1)`.
///
/// Usually 1 or 2, occasionally huge.
#[derive(Debug, Clone, Default)]
pub struct BurstyArrivals;

impl ArrivalSource for BurstyArrivals {
    fn draw(&mut self, rng: &mut DeterministicRng) -> f64 {
        (1.0 / rng.random_open01()).floor()
    }

    fn name(&self) -> &str {
        "bursty"
    }
}

/// Arrival process selector with its parameters.
///
/// Parsed from `constant:N`, `gaussian:MEAN,STD_DEV`, `poisson:LAMBDA`,
/// `bernoulli:P` or `bursty`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ArrivalSpec {
    /// Fixed count per tick
    Constant {
        /// Devices per tick
        count: u64,
    },
    /// Rounded normal draw, floored at zero
    Gaussian {
        /// Mean devices per tick
        mean: f64,
        /// Standard deviation, non-negative
        std_dev: f64,
    },
    /// Poisson draw
    Poisson {
        /// Rate, strictly positive
        lambda: f64,
    },
    /// Zero or one device per tick
    Bernoulli {
        /// Chance of one device, in `[0, 1]`
        probability: f64,
    },
    /// Heavy-tailed `floor(1 / u)` draw
    Bursty,
}

impl Default for ArrivalSpec {
    fn default() -> Self {
        Self::Constant { count: 0 }
    }
}

impl ArrivalSpec {
    /// Instantiates the arrival source this selector describes.
    ///
    /// # Errors
    ///
    /// - `ConfigError::InvalidParameter` - Distribution parameters are out of range
    pub fn build(&self) -> Result<Box<dyn ArrivalSource>, ConfigError> {
        let source: Box<dyn ArrivalSource> = match *self {
            Self::Constant { count } => Box::new(ConstantArrivals::new(count)),
            Self::Gaussian { mean, std_dev } => Box::new(GaussianArrivals::new(mean, std_dev)?),
            Self::Poisson { lambda } => Box::new(PoissonArrivals::new(lambda)?),
            Self::Bernoulli { probability } => Box::new(BernoulliArrivals::new(probability)?),
            Self::Bursty => Box::new(BurstyArrivals),
        };
        Ok(source)
    }

    /// Checks that the parameters describe a valid distribution.
    ///
    /// # Errors
    ///
    /// - `ConfigError::InvalidParameter` - Distribution parameters are out of range
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.build().map(|_| ())
    }
}

impl FromStr for ArrivalSpec {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (selector, params) = match s.trim().split_once(':') {
            Some((selector, params)) => (selector, Some(params)),
            None => (s.trim(), None),
        };
        let params: Vec<&str> = params
            .map(|p| p.split(',').map(str::trim).collect())
            .unwrap_or_default();

        let spec = match selector.to_lowercase().as_str() {
            "constant" => {
                let [count] = expect_params::<1>("constant", &params)?;
                let count = count
                    .parse::<u64>()
                    .map_err(|e| ConfigError::invalid("count", e.to_string()))?;
                Self::Constant { count }
            }
            "gaussian" | "normal" => {
                let [mean, std_dev] = expect_params::<2>("gaussian", &params)?;
                Self::Gaussian {
                    mean: parse_float("mean", mean)?,
                    std_dev: parse_float("std_dev", std_dev)?,
                }
            }
            "poisson" => {
                let [lambda] = expect_params::<1>("poisson", &params)?;
                Self::Poisson {
                    lambda: parse_float("lambda", lambda)?,
                }
            }
            "bernoulli" | "uniform" => {
                let [probability] = expect_params::<1>("bernoulli", &params)?;
                Self::Bernoulli {
                    probability: parse_float("probability", probability)?,
                }
            }
            "bursty" => {
                expect_params::<0>("bursty", &params)?;
                Self::Bursty
            }
            _ => {
                return Err(ConfigError::UnknownArrivalProcess {
                    name: selector.to_string(),
                });
            }
        };

        spec.validate()?;
        Ok(spec)
    }
}

impl fmt::Display for ArrivalSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant { count } => write!(f, "constant:{count}"),
            Self::Gaussian { mean, std_dev } => write!(f, "gaussian:{mean},{std_dev}"),
            Self::Poisson { lambda } => write!(f, "poisson:{lambda}"),
            Self::Bernoulli { probability } => write!(f, "bernoulli:{probability}"),
            Self::Bursty => write!(f, "bursty"),
        }
    }
}

fn expect_params<'a, const N: usize>(
    selector: &str,
    params: &[&'a str],
) -> Result<[&'a str; N], ConfigError> {
    <[&str; N]>::try_from(params).map_err(|_| {
        ConfigError::invalid(
            selector,
            format!("expected {N} parameter(s), got {}", params.len()),
        )
    })
}

fn parse_float(name: &str, value: &str) -> Result<f64, ConfigError> {
    value
        .parse::<f64>()
        .map_err(|e| ConfigError::invalid(name, e.to_string()))
}
