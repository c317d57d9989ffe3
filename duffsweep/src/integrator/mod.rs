// SPDX-License-Identifier: AGPL-3.0-only

//! Adaptive Dormand–Prince 5(4) integrator with dense output.
//!
//! Each step evaluates six new stages (FSAL reuses the last derivative),
//! propagates the fifth-order solution (local extrapolation) and estimates
//! the local error from the embedded fourth-order weights. A step of size h
//! is accepted when, for every component,
//!
//! ```text
//! |err_i| ≤ atol + rtol · max(|y_i|, |y_new_i|)
//! ```
//!
//! and the next step is scaled by
//! `min(FAC_MAX, max(FAC_MIN, SAFETY · (1/err)^(1/5)))`.
//!
//! The solver is generic over the state dimension so it can be checked on
//! scalar problems with known solutions; the Duffing pipeline uses `N = 2`.

pub mod dense;
pub mod tableau;

pub use dense::{Cursor, DenseSolution, Segment, SolverStats};

use crate::error::{ConfigError, IntegrationError};
use crate::tolerances::{
    DEFAULT_ATOL, DEFAULT_MAX_STEPS, DEFAULT_MIN_STEP, DEFAULT_RTOL, FAC_MAX, FAC_MIN,
    INITIAL_STEP_FALLBACK_FRACTION, SAFETY, STEP_FLOOR_EPS_MULTIPLE,
};
use serde::{Deserialize, Serialize};
use tableau::{A, B, C, E, STAGES};

/// Exponent of the optimal step factor: 1 / (embedded order + 1).
const ERROR_EXPONENT: f64 = 1.0 / 5.0;

/// Solver tolerances and step limits.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[must_use]
pub struct SolverConfig {
    /// Relative tolerance
    pub rtol: f64,
    /// Absolute tolerance
    pub atol: f64,
    /// Absolute step-size floor
    pub min_step: f64,
    /// Maximum attempted steps (accepted + rejected)
    pub max_steps: usize,
    /// Initial step override; `None` selects one from the derivatives
    pub first_step: Option<f64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            rtol: DEFAULT_RTOL,
            atol: DEFAULT_ATOL,
            min_step: DEFAULT_MIN_STEP,
            max_steps: DEFAULT_MAX_STEPS,
            first_step: None,
        }
    }
}

impl SolverConfig {
    /// Same limits with different tolerances.
    pub const fn with_tolerances(self, rtol: f64, atol: f64) -> Self {
        Self { rtol, atol, ..self }
    }

    /// Check tolerances and limits.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidTolerance`] for any non-positive or non-finite value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut checks = vec![
            ("rtol", self.rtol),
            ("atol", self.atol),
            ("min_step", self.min_step),
        ];
        if let Some(h) = self.first_step {
            checks.push(("first_step", h));
        }
        for (name, value) in checks {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidTolerance { name, value });
            }
        }
        if self.max_steps == 0 {
            return Err(ConfigError::InvalidTolerance {
                name: "max_steps",
                value: 0.0,
            });
        }
        Ok(())
    }
}

/// Integrate `dy/dt = f(t, y)` from `t_start` to `t_end`.
///
/// The returned [`DenseSolution`] covers exactly `[t_start, t_end]`: the
/// final step is shortened to land on `t_end`.
///
/// # Errors
///
/// - [`IntegrationError::InvalidSpan`] for a non-finite or empty span.
/// - [`IntegrationError::NonFiniteState`] when the initial state is not
///   finite, or when stage evaluations stay non-finite down to the step floor.
/// - [`IntegrationError::StepSizeUnderflow`] when the error test still fails
///   at the step floor.
/// - [`IntegrationError::TooManySteps`] when `max_steps` is exhausted.
pub fn integrate<const N: usize, F>(
    f: F,
    t_start: f64,
    t_end: f64,
    y0: [f64; N],
    config: &SolverConfig,
) -> Result<DenseSolution<N>, IntegrationError>
where
    F: Fn(f64, &[f64; N]) -> [f64; N],
{
    if !(t_start.is_finite() && t_end.is_finite() && t_end > t_start) {
        return Err(IntegrationError::InvalidSpan { t_start, t_end });
    }
    if !all_finite(&y0) {
        return Err(IntegrationError::NonFiniteState { t: t_start });
    }

    let mut stats = SolverStats::default();
    let mut t = t_start;
    let mut y = y0;
    let mut f_old = f(t, &y);
    stats.nfev += 1;
    if !all_finite(&f_old) {
        return Err(IntegrationError::NonFiniteState { t });
    }

    let span = t_end - t_start;
    let mut h = match config.first_step {
        Some(h0) => h0.min(span),
        None => {
            stats.nfev += 1;
            initial_step(&f, t, &y, &f_old, span, config)
        }
    };

    let mut solution = DenseSolution::new(t_start, y0);
    let mut attempts = 0_usize;

    while t < t_end {
        let floor = step_floor(t, config.min_step);
        h = h.max(floor);
        let mut rejected_this_step = false;
        let mut non_finite_seen = false;

        loop {
            if attempts >= config.max_steps {
                return Err(IntegrationError::TooManySteps { t, steps: attempts });
            }
            attempts += 1;

            let (t_new, h_step) = if t + h >= t_end {
                (t_end, t_end - t)
            } else {
                (t + h, h)
            };

            let (y_new, k) = dp_step(&f, t, &y, &f_old, h_step);
            stats.nfev += STAGES - 1;

            let err = if all_finite(&y_new) && all_finite(&k[STAGES - 1]) {
                error_norm(&y, &y_new, &k, h_step, config)
            } else {
                non_finite_seen = true;
                f64::INFINITY
            };

            if err <= 1.0 {
                let mut factor = step_factor(err);
                if rejected_this_step {
                    factor = factor.min(1.0);
                }
                solution.push(Segment::from_stages(t, t_new, y, y_new, &k));
                stats.accepted += 1;
                t = t_new;
                y = y_new;
                f_old = k[STAGES - 1];
                h = h_step * factor;
                break;
            }

            stats.rejected += 1;
            if h_step <= floor {
                return Err(if non_finite_seen {
                    IntegrationError::NonFiniteState { t }
                } else {
                    IntegrationError::StepSizeUnderflow { t, h: h_step }
                });
            }
            h = (h_step * step_factor(err)).max(floor);
            rejected_this_step = true;
        }
    }

    solution.set_stats(stats);
    tracing::debug!(
        accepted = stats.accepted,
        rejected = stats.rejected,
        nfev = stats.nfev,
        "integration complete"
    );
    Ok(solution)
}

/// One Dormand–Prince step: fifth-order state and all seven stage derivatives.
fn dp_step<const N: usize, F>(
    f: &F,
    t: f64,
    y: &[f64; N],
    f_old: &[f64; N],
    h: f64,
) -> ([f64; N], [[f64; N]; STAGES])
where
    F: Fn(f64, &[f64; N]) -> [f64; N],
{
    let mut k = [[0.0; N]; STAGES];
    k[0] = *f_old;
    for s in 1..6 {
        let mut ys = *y;
        for (i, yi) in ys.iter_mut().enumerate() {
            let incr: f64 = (0..s).map(|j| A[s][j] * k[j][i]).sum();
            *yi += h * incr;
        }
        k[s] = f(t + C[s] * h, &ys);
    }
    let mut y_new = *y;
    for (i, yi) in y_new.iter_mut().enumerate() {
        let incr: f64 = (0..6).map(|j| B[j] * k[j][i]).sum();
        *yi += h * incr;
    }
    k[STAGES - 1] = f(t + h, &y_new);
    (y_new, k)
}

/// Largest component of the scaled local error estimate.
fn error_norm<const N: usize>(
    y: &[f64; N],
    y_new: &[f64; N],
    k: &[[f64; N]; STAGES],
    h: f64,
    config: &SolverConfig,
) -> f64 {
    let mut worst = 0.0_f64;
    for i in 0..N {
        let err: f64 = h * (0..STAGES).map(|s| E[s] * k[s][i]).sum::<f64>();
        let scale = config.atol + config.rtol * y[i].abs().max(y_new[i].abs());
        let ratio = (err / scale).abs();
        if !ratio.is_finite() {
            return f64::INFINITY;
        }
        worst = worst.max(ratio);
    }
    worst
}

/// Step-size change factor from a scaled error norm.
fn step_factor(err: f64) -> f64 {
    if err == 0.0 {
        return FAC_MAX;
    }
    if !err.is_finite() {
        return FAC_MIN;
    }
    (SAFETY * err.powf(-ERROR_EXPONENT)).clamp(FAC_MIN, FAC_MAX)
}

/// Step floor at time `t`: the configured minimum or 10 ulps of `t`.
fn step_floor(t: f64, min_step: f64) -> f64 {
    min_step.max(STEP_FLOOR_EPS_MULTIPLE * f64::EPSILON * t.abs())
}

/// Starting step from derivative magnitudes (Hairer, Nørsett & Wanner, §II.4).
///
/// Always returns a positive step no larger than the span.
fn initial_step<const N: usize, F>(
    f: &F,
    t: f64,
    y: &[f64; N],
    f0: &[f64; N],
    span: f64,
    config: &SolverConfig,
) -> f64
where
    F: Fn(f64, &[f64; N]) -> [f64; N],
{
    let mut scale = [0.0; N];
    for (s, yi) in scale.iter_mut().zip(y) {
        *s = config.atol + config.rtol * yi.abs();
    }
    let scaled_max = |v: &[f64; N]| {
        v.iter()
            .zip(&scale)
            .map(|(a, s)| (a / s).abs())
            .fold(0.0_f64, f64::max)
    };

    let d0 = scaled_max(y);
    let d1 = scaled_max(f0);
    let h0 = if d0 < 1e-5 || d1 < 1e-5 {
        1e-6
    } else {
        0.01 * d0 / d1
    };
    let h0 = h0.min(span);

    let mut y1 = *y;
    for (yi, fi) in y1.iter_mut().zip(f0) {
        *yi += h0 * fi;
    }
    let f1 = f(t + h0, &y1);
    let mut df = [0.0; N];
    for (d, (a, b)) in df.iter_mut().zip(f1.iter().zip(f0)) {
        *d = a - b;
    }
    let d2 = scaled_max(&df) / h0;

    let h1 = if d1.max(d2) <= 1e-15 {
        (h0 * 1e-3).max(1e-6)
    } else {
        (0.01 / d1.max(d2)).powf(ERROR_EXPONENT)
    };

    let h = (100.0 * h0).min(h1).min(span);
    if h.is_finite() && h > 0.0 {
        h
    } else {
        INITIAL_STEP_FALLBACK_FRACTION * span
    }
}

fn all_finite<const N: usize>(y: &[f64; N]) -> bool {
    y.iter().all(|v| v.is_finite())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::tolerances::{TIGHT_ATOL, TIGHT_RTOL};

    fn decay(_t: f64, y: &[f64; 1]) -> [f64; 1] {
        [-y[0]]
    }

    #[test]
    fn exponential_decay_matches_closed_form() {
        let cfg = SolverConfig::default().with_tolerances(TIGHT_RTOL, TIGHT_ATOL);
        let sol = integrate(decay, 0.0, 5.0, [1.0], &cfg).unwrap();
        assert_eq!(sol.t_reached(), 5.0);
        let y_end = sol.final_state()[0];
        assert!((y_end - (-5.0_f64).exp()).abs() < 1e-9, "y(5)={y_end}");
        for t in [0.37, 1.0, 2.2, 4.99] {
            let y = sol.eval(t).unwrap()[0];
            assert!((y - (-t).exp()).abs() < 1e-9, "t={t} y={y}");
        }
    }

    #[test]
    fn lands_exactly_on_t_end() {
        let sol = integrate(decay, 0.0, 0.3, [1.0], &SolverConfig::default()).unwrap();
        assert_eq!(sol.t_reached(), 0.3);
        let segs = sol.segments();
        for pair in segs.windows(2) {
            assert_eq!(pair[0].t_new, pair[1].t_old);
        }
    }

    #[test]
    fn tighter_tolerance_takes_more_steps() {
        let loose = integrate(decay, 0.0, 10.0, [1.0], &SolverConfig::default()).unwrap();
        let cfg = SolverConfig::default().with_tolerances(TIGHT_RTOL, TIGHT_ATOL);
        let tight = integrate(decay, 0.0, 10.0, [1.0], &cfg).unwrap();
        assert!(tight.stats().accepted > loose.stats().accepted);
    }

    #[test]
    fn zero_field_grows_step_and_stays_put() {
        let zero = |_: f64, _: &[f64; 2]| [0.0, 0.0];
        let sol = integrate(zero, 0.0, 100.0, [0.0, 0.0], &SolverConfig::default()).unwrap();
        assert_eq!(sol.final_state(), [0.0, 0.0]);
        // 5× growth from 1e-6 reaches the span within a couple dozen steps.
        assert!(sol.stats().accepted < 40, "{:?}", sol.stats());
    }

    #[test]
    fn finite_time_blowup_reports_failure() {
        // y' = y², y(0) = 1 → y = 1/(1 − t), singular at t = 1.
        let square = |_: f64, y: &[f64; 1]| [y[0] * y[0]];
        let err = integrate(square, 0.0, 2.0, [1.0], &SolverConfig::default()).unwrap_err();
        match err {
            IntegrationError::StepSizeUnderflow { t, .. }
            | IntegrationError::NonFiniteState { t }
            | IntegrationError::TooManySteps { t, .. } => {
                assert!(t > 0.9 && t < 1.01, "failed at t={t}");
            }
            IntegrationError::InvalidSpan { .. } => panic!("unexpected {err:?}"),
        }
    }

    #[test]
    fn step_budget_is_enforced() {
        let cfg = SolverConfig {
            max_steps: 3,
            ..SolverConfig::default()
        };
        let err = integrate(decay, 0.0, 100.0, [1.0], &cfg).unwrap_err();
        assert!(matches!(err, IntegrationError::TooManySteps { steps: 3, .. }));
    }

    #[test]
    fn rejects_invalid_span_and_state() {
        let cfg = SolverConfig::default();
        assert!(matches!(
            integrate(decay, 1.0, 1.0, [1.0], &cfg),
            Err(IntegrationError::InvalidSpan { .. })
        ));
        assert!(matches!(
            integrate(decay, 0.0, f64::NAN, [1.0], &cfg),
            Err(IntegrationError::InvalidSpan { .. })
        ));
        assert_eq!(
            integrate(decay, 0.0, 1.0, [f64::NAN], &cfg).unwrap_err(),
            IntegrationError::NonFiniteState { t: 0.0 }
        );
    }

    #[test]
    fn nan_field_is_surfaced() {
        let err = integrate(|_, _: &[f64; 1]| [f64::NAN], 0.0, 1.0, [1.0], &SolverConfig::default())
            .unwrap_err();
        assert_eq!(err, IntegrationError::NonFiniteState { t: 0.0 });
    }

    #[test]
    fn deterministic_bitwise() {
        let f = |t: f64, y: &[f64; 2]| [y[1], -0.1 * y[1] - y[0] + 0.5 * t.cos()];
        let cfg = SolverConfig::default();
        let a = integrate(f, 0.0, 20.0, [1.0, 0.0], &cfg).unwrap();
        let b = integrate(f, 0.0, 20.0, [1.0, 0.0], &cfg).unwrap();
        assert_eq!(a.stats(), b.stats());
        for (sa, sb) in a.final_state().iter().zip(&b.final_state()) {
            assert_eq!(sa.to_bits(), sb.to_bits());
        }
    }

    #[test]
    fn step_factor_is_clamped() {
        assert_eq!(step_factor(0.0), FAC_MAX);
        assert_eq!(step_factor(1e-30), FAC_MAX);
        assert_eq!(step_factor(1e30), FAC_MIN);
        assert_eq!(step_factor(f64::INFINITY), FAC_MIN);
        assert!((step_factor(1.0) - SAFETY).abs() < 1e-15);
    }

    #[test]
    fn config_validation() {
        assert!(SolverConfig::default().validate().is_ok());
        let bad = SolverConfig::default().with_tolerances(0.0, 1e-9);
        assert!(matches!(
            bad.validate(),
            Err(ConfigError::InvalidTolerance { name: "rtol", .. })
        ));
        let bad = SolverConfig {
            first_step: Some(-1.0),
            ..SolverConfig::default()
        };
        assert!(bad.validate().is_err());
    }
}
