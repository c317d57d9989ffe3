// SPDX-License-Identifier: AGPL-3.0-only

//! duffsweep: Duffing oscillator dataset generator
//!
//! Integrates the driven, damped double-well oscillator
//! `m x'' + δ x' + k x + α x³ = F cos(ω t)` over a Cartesian grid of drive
//! parameters and initial states, samples each solution on a fixed time
//! grid, and keeps only trajectories whose position or velocity dispersion
//! shows non-trivial dynamics.
//!
//! ## Pipeline
//!   - `duffing`: parameter set, phase-space state, vector field
//!   - `integrator`: adaptive Dormand–Prince 5(4) with dense output
//!   - `sampling`: fixed-grid resampling of a dense solution
//!   - `classifier`: population-std retain/discard decision
//!   - `sweep`: combination enumeration and parallel driver
//!   - `sink`: trajectory persistence (CSV directory, in-memory)
//!
//! ## Support
//!   - `config`: JSON sweep configuration with validated defaults
//!   - `report`: JSON manifest and console summary
//!   - `tolerances`: every numeric constant with its rationale
//!   - `validation`: pass/fail harness for validation binaries
//!   - `error`: typed error taxonomy
//!
//! ## Binaries
//!   - `duffing_sweep`: run a sweep, write CSVs and a manifest
//!   - `validate_duffing`: closed-form and reference-case checks

pub mod classifier;
pub mod config;
pub mod duffing;
pub mod error;
pub mod integrator;
pub mod report;
pub mod sampling;
pub mod sink;
pub mod sweep;
pub mod tolerances;
pub mod validation;

pub use classifier::{classify, ClassifierConfig, RetentionDecision};
pub use config::{Linspace, SweepConfig};
pub use duffing::{vector_field, FixedParameters, ParameterSet, State};
pub use error::{
    ConfigError, DuffingError, IntegrationError, SamplingError, SinkError, TrajectoryError,
};
pub use integrator::{integrate, DenseSolution, SolverConfig, SolverStats};
pub use sampling::{sample, TimeSpan, Trajectory, TrajectoryPoint};
pub use sink::{CsvDirectorySink, MemorySink, TrajectorySink};
pub use sweep::{run_sweep, simulate, IdScheme, SweepOptions, SweepReport, TrajectoryId};
