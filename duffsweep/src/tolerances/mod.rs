// SPDX-License-Identifier: AGPL-3.0-only

//! Centralized numeric constants with their justification.
//!
//! Step-controller factors, default solver tolerances, classifier thresholds
//! and the acceptance tolerances used by tests and validation binaries all
//! live here. No ad-hoc magic numbers elsewhere in the crate.
//!
//! # Categories
//!
//! | Category | Basis | Example |
//! |----------|-------|---------|
//! | Machine precision | IEEE 754 f64 | step-size floor relative to `t` |
//! | Numerical method | Dormand–Prince 5(4) controller | safety 0.9, growth ≤ 5× |
//! | Dataset policy | Original sweep literals | dispersion threshold 0.05 |
//! | Validation | Closed-form comparisons | SHO global error bound |

/// Dataset size limits, dispersion thresholds and reference-case bounds.
pub mod dynamics;
/// Dormand–Prince controller factors, default tolerances, step floors.
pub mod solver;

pub use dynamics::{
    DISPERSION_MARGIN, DISPERSION_THRESHOLD_V, DISPERSION_THRESHOLD_X, FORCED_WELL_STD_X_MIN,
    HEAVY_DAMPING_STD_MAX, MAX_COMBINATIONS, MAX_GRID_POINTS,
};
pub use solver::{
    DEFAULT_ATOL, DEFAULT_MAX_STEPS, DEFAULT_MIN_STEP, DEFAULT_RTOL, FAC_MAX, FAC_MIN,
    INITIAL_STEP_FALLBACK_FRACTION, SAFETY, SHO_GLOBAL_ABS, SHO_GLOBAL_REL, SHO_GLOBAL_TOL_FACTOR,
    STEP_FLOOR_EPS_MULTIPLE, TIGHT_ATOL, TIGHT_RTOL,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(clippy::assertions_on_constants)] // constants sanity check
    fn controller_factor_ordering() {
        assert!(FAC_MIN > 0.0 && FAC_MIN < 1.0);
        assert!(FAC_MAX > 1.0);
        assert!(SAFETY > FAC_MIN && SAFETY < 1.0);
    }

    #[test]
    #[allow(clippy::assertions_on_constants)]
    fn tolerance_ordering() {
        assert!(TIGHT_ATOL < DEFAULT_ATOL);
        assert!(TIGHT_RTOL < DEFAULT_RTOL);
        assert!(DEFAULT_MIN_STEP > 0.0);
        assert!(SHO_GLOBAL_ABS > TIGHT_ATOL);
        assert!(SHO_GLOBAL_TOL_FACTOR > 1.0);
        assert!(SHO_GLOBAL_REL > TIGHT_RTOL);
    }

    #[test]
    #[allow(clippy::assertions_on_constants)]
    fn reference_bounds_bracket_threshold() {
        assert!(FORCED_WELL_STD_X_MIN > DISPERSION_THRESHOLD_X);
        assert!(HEAVY_DAMPING_STD_MAX < DISPERSION_THRESHOLD_X);
        assert!(DISPERSION_MARGIN > 1.0);
    }

    #[test]
    #[allow(clippy::assertions_on_constants)]
    fn size_limits_admit_reference_sweep() {
        assert!(MAX_GRID_POINTS >= 10_000);
        assert!(MAX_COMBINATIONS >= 450);
    }
}
