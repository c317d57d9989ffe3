// SPDX-License-Identifier: AGPL-3.0-only

//! Sweep configuration: axes, fixed parameters, time grid, tolerances.
//!
//! Loaded once from JSON at sweep start and read-only afterwards. Every
//! field is optional in the file; missing fields fall back to the
//! reference double-well sweep:
//!
//! | Field | Default |
//! |-------|---------|
//! | `fixed` | m = 1, k = −1, α = 1 |
//! | `forcing` | [0.3, 0.7, 1.0] |
//! | `damping` | [0.1, 0.2] |
//! | `omega` | [1.0, 1.2, 1.4] |
//! | `initial_position` | linspace(−2, 2, 5) |
//! | `initial_velocity` | linspace(−2, 2, 5) |
//! | `time` | t ∈ [0, 100), dt = 0.01 |
//! | `solver` | rtol = 1e-6, atol = 1e-9 |
//! | `classifier` | θ_x = θ_v = 0.05 |
//! | `output_dir` | `data/raw` |
//! | `id_scheme` | `combination` |

use crate::classifier::ClassifierConfig;
use crate::duffing::{FixedParameters, ParameterSet};
use crate::error::ConfigError;
use crate::integrator::SolverConfig;
use crate::sampling::TimeSpan;
use crate::sweep::IdScheme;
use crate::tolerances::MAX_COMBINATIONS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Inclusive, evenly spaced values (`numpy.linspace` semantics).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Linspace {
    /// First value
    pub start: f64,
    /// Last value (included when `count > 1`)
    pub stop: f64,
    /// Number of values
    pub count: usize,
}

impl Linspace {
    /// New range.
    #[must_use]
    pub const fn new(start: f64, stop: f64, count: usize) -> Self {
        Self { start, stop, count }
    }

    /// Expand to the value list; the last value is exactly `stop`.
    #[must_use]
    pub fn values(&self) -> Vec<f64> {
        match self.count {
            0 => Vec::new(),
            1 => vec![self.start],
            n => {
                let step = (self.stop - self.start) / (n - 1) as f64;
                let mut v: Vec<f64> = (0..n).map(|i| self.start + i as f64 * step).collect();
                v[n - 1] = self.stop;
                v
            }
        }
    }

    fn validate(&self, name: &'static str) -> Result<(), ConfigError> {
        if self.count == 0 {
            return Err(ConfigError::EmptyAxis(name));
        }
        if !(self.start.is_finite() && self.stop.is_finite()) {
            return Err(ConfigError::NonFinite(name));
        }
        Ok(())
    }
}

/// Complete sweep configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Mass and stiffness terms shared by every combination
    pub fixed: FixedParameters,
    /// Forcing amplitudes F (outermost axis)
    pub forcing: Vec<f64>,
    /// Damping coefficients δ
    pub damping: Vec<f64>,
    /// Driving frequencies ω
    pub omega: Vec<f64>,
    /// Initial positions x₀
    pub initial_position: Linspace,
    /// Initial velocities v₀ (innermost axis)
    pub initial_velocity: Linspace,
    /// Sampling window and grid step
    pub time: TimeSpan,
    /// Integrator tolerances and limits
    pub solver: SolverConfig,
    /// Retention thresholds
    pub classifier: ClassifierConfig,
    /// Directory for CSV output
    pub output_dir: PathBuf,
    /// How retained trajectories are numbered
    pub id_scheme: IdScheme,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            fixed: FixedParameters::default(),
            forcing: vec![0.3, 0.7, 1.0],
            damping: vec![0.1, 0.2],
            omega: vec![1.0, 1.2, 1.4],
            initial_position: Linspace::new(-2.0, 2.0, 5),
            initial_velocity: Linspace::new(-2.0, 2.0, 5),
            time: TimeSpan::default(),
            solver: SolverConfig::default(),
            classifier: ClassifierConfig::default(),
            output_dir: PathBuf::from("data/raw"),
            id_scheme: IdScheme::default(),
        }
    }
}

impl SweepConfig {
    /// Parse from a JSON string (unvalidated).
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] on malformed JSON or wrong field types.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load from a JSON file and validate.
    ///
    /// Uses streaming `from_reader` so the file is never buffered as a string.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] if the file cannot be opened, [`ConfigError::Parse`]
    /// on bad JSON, or any validation error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file = std::fs::File::open(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let config: Self = serde_json::from_reader(std::io::BufReader::new(file))
            .map_err(|e| ConfigError::Parse(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every rule that must hold before integration starts.
    ///
    /// # Errors
    ///
    /// The first violated rule as a [`ConfigError`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, axis) in [
            ("forcing", &self.forcing),
            ("damping", &self.damping),
            ("omega", &self.omega),
        ] {
            if axis.is_empty() {
                return Err(ConfigError::EmptyAxis(name));
            }
        }
        self.initial_position.validate("initial_position")?;
        self.initial_velocity.validate("initial_velocity")?;
        if self.checked_combinations().map_or(true, |n| n > MAX_COMBINATIONS) {
            return Err(ConfigError::TooManyCombinations {
                limit: MAX_COMBINATIONS,
            });
        }

        for &forcing in &self.forcing {
            for &damping in &self.damping {
                for &omega in &self.omega {
                    ParameterSet::with_drive(self.fixed, forcing, damping, omega).validate()?;
                }
            }
        }

        self.time.validate()?;
        self.solver.validate()?;

        for (name, value) in [
            ("threshold_x", self.classifier.threshold_x),
            ("threshold_v", self.classifier.threshold_v),
        ] {
            check_non_negative(name, value)?;
        }
        Ok(())
    }

    /// Number of (F, δ, ω) drive combinations (saturating).
    #[must_use]
    pub fn n_parameter_sets(&self) -> usize {
        self.checked_parameter_sets().unwrap_or(usize::MAX)
    }

    /// Number of (x₀, v₀) initial states (saturating).
    #[must_use]
    pub fn n_initial_states(&self) -> usize {
        self.initial_position
            .count
            .saturating_mul(self.initial_velocity.count)
    }

    /// Total pipeline runs in the sweep (saturating; `validate` caps it at
    /// [`MAX_COMBINATIONS`]).
    #[must_use]
    pub fn n_combinations(&self) -> usize {
        self.checked_combinations().unwrap_or(usize::MAX)
    }

    fn checked_parameter_sets(&self) -> Option<usize> {
        self.forcing
            .len()
            .checked_mul(self.damping.len())?
            .checked_mul(self.omega.len())
    }

    fn checked_combinations(&self) -> Option<usize> {
        self.checked_parameter_sets()?
            .checked_mul(self.initial_position.count)?
            .checked_mul(self.initial_velocity.count)
    }
}

fn check_non_negative(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::NonFinite(name));
    }
    if value < 0.0 {
        return Err(ConfigError::NegativeParameter { name, value });
    }
    Ok(())
}
