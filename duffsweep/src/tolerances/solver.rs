// SPDX-License-Identifier: AGPL-3.0-only

//! Adaptive Runge–Kutta controller constants and default tolerances.

// ═══════════════════════════════════════════════════════════════════
// Step-size controller (Hairer, Nørsett & Wanner, Solving ODEs I, §II.4)
// ═══════════════════════════════════════════════════════════════════

/// Safety factor applied to the optimal step estimate.
///
/// The optimal factor `(1/err)^(1/5)` assumes the error estimate is exact;
/// 0.9 keeps the next step slightly inside the predicted acceptable region
/// so that the rejection rate stays low.
pub const SAFETY: f64 = 0.9;

/// Smallest allowed step-size change factor (one step can shrink h by 5×).
pub const FAC_MIN: f64 = 0.2;

/// Largest allowed step-size change factor (one step can grow h by 5×).
///
/// Clamping both directions prevents oscillatory growth/shrink cycles
/// when the error estimate is noisy.
pub const FAC_MAX: f64 = 5.0;

/// Multiple of machine epsilon (relative to |t|) below which a step is
/// indistinguishable from zero in time arithmetic.
///
/// Same floor scipy's `RK45` uses: `10 * |nextafter(t, ∞) − t|`.
pub const STEP_FLOOR_EPS_MULTIPLE: f64 = 10.0;

/// Absolute minimum step size.
///
/// The effective floor is `max(DEFAULT_MIN_STEP, 10ε|t|)`. Reaching it with
/// the error still above tolerance means the dynamics are stiff or singular
/// on the scale of the span, and the trajectory is reported as failed.
pub const DEFAULT_MIN_STEP: f64 = 1e-12;

/// Hard cap on attempted steps per trajectory (accepted + rejected).
///
/// The forced double-well over t ∈ [0, 100] needs ~2–4k accepted steps at
/// rtol=1e-6; 1e6 leaves more than two orders of magnitude of headroom.
pub const DEFAULT_MAX_STEPS: usize = 1_000_000;

/// Fraction of the span used as the initial step when the derivative-based
/// heuristic cannot produce a usable estimate (zero or non-finite norms).
pub const INITIAL_STEP_FALLBACK_FRACTION: f64 = 1e-6;

// ═══════════════════════════════════════════════════════════════════
// Default tolerances (literals of the original Python sweep)
// ═══════════════════════════════════════════════════════════════════

/// Default relative tolerance (`solve_ivp(..., rtol=1e-6)`).
pub const DEFAULT_RTOL: f64 = 1e-6;

/// Default absolute tolerance (`solve_ivp(..., atol=1e-9)`).
pub const DEFAULT_ATOL: f64 = 1e-9;

// ═══════════════════════════════════════════════════════════════════
// Validation tolerances
// ═══════════════════════════════════════════════════════════════════

/// Tight relative tolerance for closed-form comparisons.
pub const TIGHT_RTOL: f64 = 1e-10;

/// Tight absolute tolerance for closed-form comparisons.
pub const TIGHT_ATOL: f64 = 1e-12;

/// Headroom of the closed-form acceptance bound over the solver's own
/// per-step tolerance.
///
/// `rtol`/`atol` bound the local error estimate of each accepted step, not
/// the error of a sampled point. Local errors accumulate over the ~10³ steps
/// of a 30-unit run and the quartic interpolant adds O(h⁵) between step
/// endpoints, so the pointwise global error can sit orders of magnitude above the
/// per-step allowance. 10⁴ covers that accumulation with margin.
pub const SHO_GLOBAL_TOL_FACTOR: f64 = 1e4;

/// Absolute part of the acceptance bound for the undamped linear oscillator:
/// the tight per-step allowance at unit amplitude, `atol + rtol`, times
/// [`SHO_GLOBAL_TOL_FACTOR`].
pub const SHO_GLOBAL_ABS: f64 = SHO_GLOBAL_TOL_FACTOR * (TIGHT_ATOL + TIGHT_RTOL);

/// Relative part of the acceptance bound for the undamped linear oscillator.
pub const SHO_GLOBAL_REL: f64 = SHO_GLOBAL_TOL_FACTOR * TIGHT_RTOL;
