// SPDX-License-Identifier: AGPL-3.0-only

//! Dispersion-based retain/discard decision for sampled trajectories.
//!
//! A trajectory is kept when the population standard deviation of either
//! its position or its velocity series exceeds a threshold. Static
//! trajectories and ones that settle onto a fixed point early fall below;
//! oscillating, limit-cycle and chaotic motion stays above.

use crate::sampling::Trajectory;
use crate::tolerances::{DISPERSION_THRESHOLD_V, DISPERSION_THRESHOLD_X};
use serde::{Deserialize, Serialize};

/// Retention thresholds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[must_use]
pub struct ClassifierConfig {
    /// Threshold θ_x on std(x)
    pub threshold_x: f64,
    /// Threshold θ_v on std(v)
    pub threshold_v: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            threshold_x: DISPERSION_THRESHOLD_X,
            threshold_v: DISPERSION_THRESHOLD_V,
        }
    }
}

/// Classifier outcome with the statistics that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RetentionDecision {
    /// Keep the trajectory
    pub retain: bool,
    /// Population std of x
    pub std_x: f64,
    /// Population std of v
    pub std_v: f64,
}

/// Population standard deviation (divisor n), Welford's single pass.
///
/// Returns `None` for fewer than two samples.
#[must_use]
pub fn population_std(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let mut n = 0_usize;
    let mut mean = 0.0_f64;
    let mut m2 = 0.0_f64;
    for x in values {
        n += 1;
        let delta = x - mean;
        mean += delta / n as f64;
        m2 += delta * (x - mean);
    }
    (n >= 2).then(|| (m2 / n as f64).sqrt())
}

/// Decide whether a trajectory carries dynamic signal.
///
/// Retains if `std(x) > θ_x` or `std(v) > θ_v`. Returns `None` for
/// trajectories shorter than two samples, for which dispersion is undefined.
#[must_use]
pub fn classify(trajectory: &Trajectory, config: &ClassifierConfig) -> Option<RetentionDecision> {
    let std_x = population_std(trajectory.positions())?;
    let std_v = population_std(trajectory.velocities())?;
    Some(RetentionDecision {
        retain: std_x > config.threshold_x || std_v > config.threshold_v,
        std_x,
        std_v,
    })
}
