// SPDX-License-Identifier: AGPL-3.0-only

//! Fixed-grid sampling of a dense solution.
//!
//! The grid is `t_start + i·dt` for `i = 0 .. floor((t_end − t_start)/dt)`,
//! the same points as `numpy.arange(t_start, t_end, dt)` for a span that is
//! a whole number of steps. Times are computed by multiplication, never by
//! accumulating `dt`, so the i-th point carries no drift.

use crate::error::{ConfigError, SamplingError};
use crate::integrator::DenseSolution;
use crate::tolerances::MAX_GRID_POINTS;
use serde::{Deserialize, Serialize};

/// Relative slack when deciding whether `span / dt` is a whole number.
///
/// `0.3 / 0.1` evaluates to 2.9999999999999996 in f64; without snapping,
/// `floor` would drop the last grid point of an exact multiple.
const GRID_SNAP_REL: f64 = 1e-9;

/// Sampling window and step.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[must_use]
pub struct TimeSpan {
    /// First grid time
    pub t_start: f64,
    /// Integration end (exclusive for the grid)
    pub t_end: f64,
    /// Grid spacing
    pub dt: f64,
}

impl Default for TimeSpan {
    fn default() -> Self {
        Self {
            t_start: 0.0,
            t_end: 100.0,
            dt: 0.01,
        }
    }
}

impl TimeSpan {
    /// New span (not validated).
    pub const fn new(t_start: f64, t_end: f64, dt: f64) -> Self {
        Self { t_start, t_end, dt }
    }

    /// Check finiteness, `dt > 0`, `t_end > t_start`, and a grid of at least
    /// two and at most [`MAX_GRID_POINTS`] points.
    ///
    /// # Errors
    ///
    /// The first violated rule as a [`ConfigError`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("t_start", self.t_start),
            ("t_end", self.t_end),
            ("dt", self.dt),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite(name));
            }
        }
        if self.dt <= 0.0 {
            return Err(ConfigError::NonPositiveStep(self.dt));
        }
        if self.t_end <= self.t_start {
            return Err(ConfigError::EmptySpan {
                t_start: self.t_start,
                t_end: self.t_end,
            });
        }
        let ratio = self.ratio();
        if ratio > MAX_GRID_POINTS as f64 {
            return Err(ConfigError::GridTooLarge {
                points: ratio,
                limit: MAX_GRID_POINTS,
            });
        }
        let n = self.n_points();
        if n < 2 {
            return Err(ConfigError::GridTooShort(n));
        }
        Ok(())
    }

    fn ratio(&self) -> f64 {
        (self.t_end - self.t_start) / self.dt
    }

    /// Number of grid points: `floor((t_end − t_start) / dt)`.
    #[must_use]
    pub fn n_points(&self) -> usize {
        let ratio = self.ratio();
        if !(ratio.is_finite() && ratio > 0.0) {
            return 0;
        }
        let nearest = ratio.round();
        let n = if (ratio - nearest).abs() <= GRID_SNAP_REL * nearest.max(1.0) {
            nearest
        } else {
            ratio.floor()
        };
        // Saturating float-to-int cast; `validate` rejects ratios above MAX_GRID_POINTS.
        n as usize
    }

    /// Time of grid point `i`.
    #[must_use]
    pub fn time(&self, i: usize) -> f64 {
        self.t_start + i as f64 * self.dt
    }

    /// Grid times in ascending order.
    pub fn times(&self) -> impl ExactSizeIterator<Item = f64> + '_ {
        (0..self.n_points()).map(|i| self.time(i))
    }
}

/// One sample `(t, x, v)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    /// Time
    pub t: f64,
    /// Position
    pub x: f64,
    /// Velocity
    pub v: f64,
}

/// Time-ascending fixed-grid trajectory. Immutable once produced.
#[derive(Clone, Debug, PartialEq)]
pub struct Trajectory {
    points: Vec<TrajectoryPoint>,
}

impl Trajectory {
    /// Wrap pre-sampled points (caller guarantees ascending time).
    #[must_use]
    pub fn from_points(points: Vec<TrajectoryPoint>) -> Self {
        Self { points }
    }

    /// All samples.
    #[must_use]
    pub fn points(&self) -> &[TrajectoryPoint] {
        &self.points
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// No samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Position series.
    pub fn positions(&self) -> impl ExactSizeIterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.x)
    }

    /// Velocity series.
    pub fn velocities(&self) -> impl ExactSizeIterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.v)
    }

    /// Time series.
    pub fn times(&self) -> impl ExactSizeIterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.t)
    }
}

/// Sample a two-component dense solution on the span's grid.
///
/// Every point is either an accepted-step endpoint or the quartic
/// Dormand–Prince interpolant within the step containing it.
///
/// # Errors
///
/// [`SamplingError::OutOfRange`] if any grid time lies outside the solved
/// interval; the whole trajectory is rejected, never truncated or padded.
pub fn sample(solution: &DenseSolution<2>, span: &TimeSpan) -> Result<Trajectory, SamplingError> {
    let n = span.n_points();
    if n > MAX_GRID_POINTS {
        return Err(SamplingError::GridTooLarge {
            points: n,
            limit: MAX_GRID_POINTS,
        });
    }
    if n > 0 {
        // Grid is ascending: checking the last point covers all of them.
        let last = span.time(n - 1);
        if span.t_start < solution.t_start() || last > solution.t_reached() {
            let t = if span.t_start < solution.t_start() {
                span.t_start
            } else {
                last
            };
            return Err(SamplingError::OutOfRange {
                t,
                start: solution.t_start(),
                reached: solution.t_reached(),
            });
        }
    }

    let mut cursor = solution.cursor();
    let mut points = Vec::with_capacity(n);
    for t in span.times() {
        let [x, v] = cursor.eval(t)?;
        points.push(TrajectoryPoint { t, x, v });
    }
    Ok(Trajectory { points })
}
