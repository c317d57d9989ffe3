// SPDX-License-Identifier: AGPL-3.0-only

//! Typed errors for Duffing sweeps.
//!
//! Each stage of the pipeline has its own failure enum so the sweep driver
//! can tell a fatal configuration problem apart from a per-trajectory solver
//! failure or a rejected sink write. `DuffingError` wraps the failures that
//! end a run, for callers (binaries) that only need to report and exit.
//! Per-trajectory failures stay in the sweep report.

use std::path::PathBuf;

/// Invalid sweep configuration. Fatal: reported before any integration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Mass must be strictly positive.
    #[error("mass must be > 0 (got {0})")]
    NonPositiveMass(f64),

    /// Sampling step must be strictly positive.
    #[error("sampling step dt must be > 0 (got {0})")]
    NonPositiveStep(f64),

    /// `t_end` must lie strictly after `t_start`.
    #[error("time span is empty: t_end ({t_end}) <= t_start ({t_start})")]
    EmptySpan {
        /// Requested start time
        t_start: f64,
        /// Requested end time
        t_end: f64,
    },

    /// A swept axis has no values.
    #[error("sweep axis `{0}` is empty")]
    EmptyAxis(&'static str),

    /// The sampling grid would hold fewer than two points.
    #[error("sampling grid has {0} point(s); at least 2 are required")]
    GridTooShort(usize),

    /// The sampling grid would exceed the per-trajectory point limit.
    #[error("sampling grid would hold {points:.3e} points; the limit is {limit}")]
    GridTooLarge {
        /// Requested `(t_end − t_start) / dt`
        points: f64,
        /// Largest accepted grid
        limit: usize,
    },

    /// The Cartesian product of the axes exceeds the combination limit.
    #[error("sweep would run more than {limit} combinations")]
    TooManyCombinations {
        /// Largest accepted sweep
        limit: usize,
    },

    /// Solver tolerance is non-positive or non-finite.
    #[error("solver tolerance `{name}` must be finite and > 0 (got {value})")]
    InvalidTolerance {
        /// Tolerance name (`rtol`, `atol`, ...)
        name: &'static str,
        /// Offending value
        value: f64,
    },

    /// A physical parameter that must be non-negative is negative.
    #[error("parameter `{name}` must be >= 0 (got {value})")]
    NegativeParameter {
        /// Parameter name
        name: &'static str,
        /// Offending value
        value: f64,
    },

    /// A configuration value is NaN or infinite.
    #[error("configuration value `{0}` is not finite")]
    NonFinite(&'static str),

    /// Configuration file could not be read.
    #[error("cannot read config {path}: {message}")]
    Io {
        /// Config file path
        path: PathBuf,
        /// Underlying IO error message
        message: String,
    },

    /// Configuration file is not valid JSON for `SweepConfig`.
    #[error("cannot parse config: {0}")]
    Parse(String),
}

/// Per-trajectory integration failure. Recorded, never fatal to a sweep.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IntegrationError {
    /// Step size fell below the floor without meeting tolerance.
    #[error("step size underflow at t={t:.6} (h={h:.3e})")]
    StepSizeUnderflow {
        /// Time at which the controller gave up
        t: f64,
        /// Rejected step size
        h: f64,
    },

    /// The vector field or an RK stage produced NaN/inf.
    #[error("non-finite state at t={t:.6}")]
    NonFiniteState {
        /// Time of the last accepted step
        t: f64,
    },

    /// The step budget ran out before reaching `t_end`.
    #[error("step budget exhausted at t={t:.6} after {steps} steps")]
    TooManySteps {
        /// Time reached
        t: f64,
        /// Attempted steps (accepted + rejected)
        steps: usize,
    },

    /// Integration span is empty, reversed or non-finite.
    #[error("invalid integration span [{t_start}, {t_end}]")]
    InvalidSpan {
        /// Start time
        t_start: f64,
        /// End time
        t_end: f64,
    },
}

/// Fixed-grid sampling failure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SamplingError {
    /// A grid point lies outside the integrated interval.
    #[error("grid point t={t:.6} outside integrated interval [{start:.6}, {reached:.6}]")]
    OutOfRange {
        /// Requested time
        t: f64,
        /// Solution start time
        start: f64,
        /// Furthest time the integrator reached
        reached: f64,
    },

    /// The solution holds no accepted steps to interpolate.
    #[error("solution has no accepted steps")]
    EmptySolution,

    /// The grid exceeds the per-trajectory point limit.
    #[error("grid of {points} points exceeds the limit of {limit}")]
    GridTooLarge {
        /// Grid points requested
        points: usize,
        /// Largest accepted grid
        limit: usize,
    },
}

/// Failure of one (parameter set, initial state) pipeline run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TrajectoryError {
    /// The integrator gave up.
    #[error("integration failed: {0}")]
    Integration(#[from] IntegrationError),

    /// The dense solution does not cover the grid.
    #[error("sampling failed: {0}")]
    Sampling(#[from] SamplingError),

    /// Fewer than two samples: dispersion is undefined.
    #[error("trajectory has {0} sample(s); classification needs at least 2")]
    TooShort(usize),
}

/// Trajectory sink rejected a write.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// Filesystem error while persisting.
    #[error("sink IO error at {path}: {source}")]
    Io {
        /// Target path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Sink-specific rejection (duplicate identifier, closed sink, ...).
    #[error("sink rejected write: {0}")]
    Rejected(String),
}

/// Crate-wide error for binaries and top-level entry points.
#[derive(Debug, thiserror::Error)]
pub enum DuffingError {
    /// Fatal configuration problem.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Sink failure.
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// Report/manifest output failed.
    #[error("report output failed: {0}")]
    Report(String),

    /// Worker pool could not be built.
    #[error("thread pool: {0}")]
    ThreadPool(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_config_errors() {
        assert_eq!(
            ConfigError::NonPositiveMass(0.0).to_string(),
            "mass must be > 0 (got 0)"
        );
        assert!(ConfigError::EmptyAxis("forcing")
            .to_string()
            .contains("forcing"));
        let span = ConfigError::EmptySpan {
            t_start: 1.0,
            t_end: 1.0,
        };
        assert!(span.to_string().contains("t_end (1) <= t_start (1)"));
    }

    #[test]
    fn display_integration_underflow() {
        let err = IntegrationError::StepSizeUnderflow { t: 2.5, h: 1e-20 };
        let msg = err.to_string();
        assert!(msg.contains("underflow"));
        assert!(msg.contains("2.500000"));
    }

    #[test]
    fn wraps_into_crate_error() {
        let err: DuffingError = ConfigError::EmptyAxis("omega").into();
        assert!(matches!(err, DuffingError::Config(_)));
        assert_eq!(err.to_string(), "sweep axis `omega` is empty");
    }

    #[test]
    fn display_size_limits() {
        let err = ConfigError::GridTooLarge {
            points: 1e20,
            limit: 10,
        };
        assert_eq!(
            err.to_string(),
            "sampling grid would hold 1.000e20 points; the limit is 10"
        );
        let err = SamplingError::GridTooLarge {
            points: 11,
            limit: 10,
        };
        assert_eq!(err.to_string(), "grid of 11 points exceeds the limit of 10");
    }

    #[test]
    fn trajectory_error_names_stage() {
        let err: TrajectoryError = SamplingError::EmptySolution.into();
        assert_eq!(err.to_string(), "sampling failed: solution has no accepted steps");
        let err: TrajectoryError = IntegrationError::TooManySteps { t: 3.0, steps: 7 }.into();
        assert!(err.to_string().starts_with("integration failed"));
    }

    #[test]
    fn sink_io_keeps_source() {
        let err = SinkError::Io {
            path: PathBuf::from("/nope/x.csv"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let dyn_err: &dyn std::error::Error = &err;
        assert!(dyn_err.source().is_some());
        assert!(err.to_string().contains("/nope/x.csv"));
    }
}
