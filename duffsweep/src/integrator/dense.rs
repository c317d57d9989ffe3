// SPDX-License-Identifier: AGPL-3.0-only

//! Continuous solution assembled from accepted Dormand–Prince steps.
//!
//! Each accepted step stores its endpoints and the quartic interpolant
//! coefficients `Q = Kᵀ P`, so any `t` inside the step is evaluated to the
//! method's local order without re-evaluating the vector field.

use super::tableau::{P, STAGES};
use crate::error::SamplingError;
use serde::Serialize;

/// One accepted step `[t_old, t_new]` with its continuous extension.
#[derive(Clone, Debug)]
pub struct Segment<const N: usize> {
    /// Step start time
    pub t_old: f64,
    /// Step end time
    pub t_new: f64,
    /// State at `t_old`
    pub y_old: [f64; N],
    /// State at `t_new` (fifth-order solution)
    pub y_new: [f64; N],
    /// Interpolant coefficients per component (θ, θ², θ³, θ⁴)
    q: [[f64; 4]; N],
}

impl<const N: usize> Segment<N> {
    /// Build a segment from the seven stage derivatives of an accepted step.
    #[must_use]
    pub fn from_stages(
        t_old: f64,
        t_new: f64,
        y_old: [f64; N],
        y_new: [f64; N],
        k: &[[f64; N]; STAGES],
    ) -> Self {
        let mut q = [[0.0; 4]; N];
        for (i, qi) in q.iter_mut().enumerate() {
            for (j, qij) in qi.iter_mut().enumerate() {
                *qij = (0..STAGES).map(|s| k[s][i] * P[s][j]).sum();
            }
        }
        Self {
            t_old,
            t_new,
            y_old,
            y_new,
            q,
        }
    }

    /// Step size `t_new − t_old`.
    #[must_use]
    pub fn h(&self) -> f64 {
        self.t_new - self.t_old
    }

    /// Evaluate the interpolant at `t` (caller guarantees `t_old ≤ t ≤ t_new`).
    ///
    /// Endpoints return the stored accepted states exactly.
    #[must_use]
    pub fn eval(&self, t: f64) -> [f64; N] {
        if t == self.t_new {
            return self.y_new;
        }
        if t == self.t_old {
            return self.y_old;
        }
        let h = self.h();
        let theta = (t - self.t_old) / h;
        let powers = [theta, theta * theta, theta.powi(3), theta.powi(4)];
        let mut y = self.y_old;
        for (yi, qi) in y.iter_mut().zip(&self.q) {
            let poly: f64 = qi.iter().zip(&powers).map(|(c, p)| c * p).sum();
            *yi += h * poly;
        }
        y
    }
}

/// Integrator work counters (same meaning as scipy's `nfev`/accepted/rejected).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SolverStats {
    /// Accepted steps
    pub accepted: usize,
    /// Rejected steps
    pub rejected: usize,
    /// Vector-field evaluations
    pub nfev: usize,
}

/// Dense solution over `[t_start, t_reached]`.
#[derive(Clone, Debug)]
pub struct DenseSolution<const N: usize> {
    t_start: f64,
    y_start: [f64; N],
    segments: Vec<Segment<N>>,
    stats: SolverStats,
}

impl<const N: usize> DenseSolution<N> {
    /// Empty solution anchored at the initial condition.
    #[must_use]
    pub fn new(t_start: f64, y_start: [f64; N]) -> Self {
        Self {
            t_start,
            y_start,
            segments: Vec::new(),
            stats: SolverStats::default(),
        }
    }

    pub(crate) fn push(&mut self, segment: Segment<N>) {
        self.segments.push(segment);
    }

    pub(crate) fn set_stats(&mut self, stats: SolverStats) {
        self.stats = stats;
    }

    /// Start of the integrated interval.
    #[must_use]
    pub const fn t_start(&self) -> f64 {
        self.t_start
    }

    /// Furthest time reached by an accepted step.
    #[must_use]
    pub fn t_reached(&self) -> f64 {
        self.segments.last().map_or(self.t_start, |s| s.t_new)
    }

    /// State at the end of the last accepted step.
    #[must_use]
    pub fn final_state(&self) -> [f64; N] {
        self.segments.last().map_or(self.y_start, |s| s.y_new)
    }

    /// Accepted steps, time-ascending.
    #[must_use]
    pub fn segments(&self) -> &[Segment<N>] {
        &self.segments
    }

    /// Work counters.
    #[must_use]
    pub const fn stats(&self) -> SolverStats {
        self.stats
    }

    /// Evaluate at arbitrary `t` by binary search over the accepted steps.
    ///
    /// # Errors
    ///
    /// [`SamplingError::EmptySolution`] when no step was accepted, or
    /// [`SamplingError::OutOfRange`] when `t` lies outside the integrated interval.
    pub fn eval(&self, t: f64) -> Result<[f64; N], SamplingError> {
        self.check_range(t)?;
        if t == self.t_start {
            return Ok(self.y_start);
        }
        let idx = self.segments.partition_point(|s| s.t_new < t);
        Ok(self.segments[idx].eval(t))
    }

    /// Sequential evaluator for time-ascending queries (amortized O(1) per point).
    #[must_use]
    pub fn cursor(&self) -> Cursor<'_, N> {
        Cursor {
            solution: self,
            idx: 0,
        }
    }

    fn check_range(&self, t: f64) -> Result<(), SamplingError> {
        if self.segments.is_empty() {
            return Err(SamplingError::EmptySolution);
        }
        let reached = self.t_reached();
        if !(t >= self.t_start && t <= reached) {
            return Err(SamplingError::OutOfRange {
                t,
                start: self.t_start,
                reached,
            });
        }
        Ok(())
    }
}

/// Forward-walking evaluator over a [`DenseSolution`].
pub struct Cursor<'a, const N: usize> {
    solution: &'a DenseSolution<N>,
    idx: usize,
}

impl<const N: usize> Cursor<'_, N> {
    /// Evaluate at `t`; queries must be non-decreasing for the walk to stay valid.
    ///
    /// # Errors
    ///
    /// Same as [`DenseSolution::eval`].
    pub fn eval(&mut self, t: f64) -> Result<[f64; N], SamplingError> {
        let sol = self.solution;
        sol.check_range(t)?;
        if t == sol.t_start {
            return Ok(sol.y_start);
        }
        if sol.segments[self.idx].t_old > t {
            // Out-of-order query: fall back to a fresh search.
            self.idx = sol.segments.partition_point(|s| s.t_new < t);
        }
        while sol.segments[self.idx].t_new < t {
            self.idx += 1;
        }
        Ok(sol.segments[self.idx].eval(t))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    /// Linear motion y = y0 + t·v: any consistent stage set with K_s = v
    /// reproduces it exactly (rows of P sum to the b weights, Σb = 1).
    fn linear_segment(t_old: f64, t_new: f64, y_old: f64, v: f64) -> Segment<1> {
        let k = [[v]; STAGES];
        let y_new = [y_old + v * (t_new - t_old)];
        Segment::from_stages(t_old, t_new, [y_old], y_new, &k)
    }

    #[test]
    fn constant_slope_interpolates_exactly() {
        let seg = linear_segment(1.0, 3.0, 2.0, 0.5);
        for t in [1.0, 1.3, 2.0, 2.9, 3.0] {
            let y = seg.eval(t)[0];
            assert!((y - (2.0 + 0.5 * (t - 1.0))).abs() < 1e-14, "t={t} y={y}");
        }
    }

    #[test]
    fn endpoints_are_exact() {
        let seg = linear_segment(0.0, 0.1, 1.0, 3.0);
        assert_eq!(seg.eval(0.0), seg.y_old);
        assert_eq!(seg.eval(0.1), seg.y_new);
    }

    #[test]
    fn eval_rejects_outside_interval() {
        let mut sol = DenseSolution::new(0.0, [1.0]);
        sol.push(linear_segment(0.0, 1.0, 1.0, 1.0));
        sol.push(linear_segment(1.0, 2.5, 2.0, 1.0));
        assert!((sol.eval(2.0).unwrap()[0] - 3.0).abs() < 1e-14);
        assert!(matches!(
            sol.eval(2.6),
            Err(SamplingError::OutOfRange { reached, .. }) if reached == 2.5
        ));
        assert!(sol.eval(-0.1).is_err());
    }

    #[test]
    fn empty_solution_errors() {
        let sol = DenseSolution::<2>::new(0.0, [0.0, 0.0]);
        assert_eq!(sol.eval(0.0), Err(SamplingError::EmptySolution));
        assert_eq!(sol.t_reached(), 0.0);
    }

    #[test]
    fn cursor_matches_binary_search() {
        let mut sol = DenseSolution::new(0.0, [0.0]);
        let mut y = 0.0;
        let mut t = 0.0;
        for (i, h) in [0.3, 0.05, 0.7, 0.2].into_iter().enumerate() {
            let v = i as f64 + 1.0;
            sol.push(linear_segment(t, t + h, y, v));
            y += v * h;
            t += h;
        }
        let mut cursor = sol.cursor();
        for i in 0..25 {
            let tq = f64::from(i) * 0.05;
            assert_eq!(cursor.eval(tq).unwrap(), sol.eval(tq).unwrap());
        }
        // Out-of-order query still answers correctly.
        assert_eq!(cursor.eval(0.1).unwrap(), sol.eval(0.1).unwrap());
    }
}
