// SPDX-License-Identifier: AGPL-3.0-only

//! Parameter × initial-condition sweep driver.
//!
//! Combinations are enumerated lexicographically over the axes in declared
//! order: F (outermost), δ, ω, x₀, v₀ (innermost). Every combination has a
//! flat index in that order and runs the full pipeline
//!
//! ```text
//! vector_field → integrate → sample → classify → (retained) sink.write
//! ```
//!
//! exactly once. Pipeline runs share no mutable state and execute on a rayon
//! pool, one chunk of combinations at a time; outcomes are then handed to the
//! sink on the calling thread in enumeration order. Identifiers therefore
//! depend only on the configuration, never on thread count or completion
//! order.
//!
//! A failed integration or a rejected sink write is recorded in the
//! [`SweepReport`] and the sweep moves on. Only an invalid configuration is
//! fatal, and it is reported before any integration starts.

use crate::classifier::{classify, RetentionDecision};
use crate::config::SweepConfig;
use crate::duffing::{rhs, ParameterSet, State};
use crate::error::{DuffingError, TrajectoryError};
use crate::integrator::{integrate, SolverConfig, SolverStats};
use crate::sampling::{sample, TimeSpan, Trajectory};
use crate::sink::TrajectorySink;
use rayon::prelude::*;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Combinations integrated per parallel batch.
pub const DEFAULT_CHUNK_SIZE: usize = 64;

/// How retained trajectories are numbered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdScheme {
    /// Flat combination index (gaps where trajectories were discarded)
    #[default]
    Combination,
    /// Dense 0, 1, 2, … over retained trajectories in enumeration order
    Retained,
}

impl fmt::Display for IdScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Combination => write!(f, "combination"),
            Self::Retained => write!(f, "retained"),
        }
    }
}

/// Stable identifier of a retained trajectory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TrajectoryId {
    /// Number used in names (depends on the [`IdScheme`])
    pub serial: usize,
    /// Flat combination index the trajectory came from
    pub combination: usize,
}

impl fmt::Display for TrajectoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.serial)
    }
}

/// One point of the sweep's Cartesian product.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Combination {
    /// Flat lexicographic index
    pub index: usize,
    /// Position on each axis: (F, δ, ω, x₀, v₀)
    pub axis_indices: [usize; 5],
    /// Full parameter set
    pub params: ParameterSet,
    /// Initial state
    pub initial: State,
}

/// Expand the configuration into its ordered combinations.
#[must_use]
pub fn enumerate_combinations(config: &SweepConfig) -> Vec<Combination> {
    let positions = config.initial_position.values();
    let velocities = config.initial_velocity.values();
    let mut out = Vec::with_capacity(config.n_combinations());
    for (fi, &forcing) in config.forcing.iter().enumerate() {
        for (di, &damping) in config.damping.iter().enumerate() {
            for (wi, &omega) in config.omega.iter().enumerate() {
                let params = ParameterSet::with_drive(config.fixed, forcing, damping, omega);
                for (xi, &x0) in positions.iter().enumerate() {
                    for (vi, &v0) in velocities.iter().enumerate() {
                        out.push(Combination {
                            index: out.len(),
                            axis_indices: [fi, di, wi, xi, vi],
                            params,
                            initial: State::new(x0, v0),
                        });
                    }
                }
            }
        }
    }
    out
}

/// Integrate one (parameter set, initial state) pair and sample it on the grid.
///
/// # Errors
///
/// [`TrajectoryError::Integration`] if the solver gives up,
/// [`TrajectoryError::Sampling`] if the solution does not cover the grid.
pub fn simulate(
    params: &ParameterSet,
    initial: State,
    span: &TimeSpan,
    solver: &SolverConfig,
) -> Result<(Trajectory, SolverStats), TrajectoryError> {
    let solution = integrate(
        |t, y| rhs(t, y, params),
        span.t_start,
        span.t_end,
        initial.into(),
        solver,
    )?;
    let trajectory = sample(&solution, span)?;
    Ok((trajectory, solution.stats()))
}

/// Result of one pipeline run, before the sink sees it.
#[derive(Debug)]
pub enum Outcome {
    /// Dispersion above threshold; forwarded to the sink
    Retained {
        /// Sampled trajectory
        trajectory: Trajectory,
        /// Classifier statistics
        decision: RetentionDecision,
        /// Integrator work
        stats: SolverStats,
    },
    /// Dispersion at or below threshold
    Discarded {
        /// Classifier statistics
        decision: RetentionDecision,
        /// Integrator work
        stats: SolverStats,
    },
    /// Pipeline failed for this combination
    Failed(TrajectoryError),
}

/// Run the pipeline for one combination.
#[must_use]
pub fn run_combination(combination: &Combination, config: &SweepConfig) -> Outcome {
    let (trajectory, stats) = match simulate(
        &combination.params,
        combination.initial,
        &config.time,
        &config.solver,
    ) {
        Ok(result) => result,
        Err(e) => return Outcome::Failed(e),
    };
    match classify(&trajectory, &config.classifier) {
        Some(decision) if decision.retain => Outcome::Retained {
            trajectory,
            decision,
            stats,
        },
        Some(decision) => Outcome::Discarded { decision, stats },
        None => Outcome::Failed(TrajectoryError::TooShort(trajectory.len())),
    }
}

/// Execution options that do not affect results.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SweepOptions {
    /// Worker threads; `None` uses rayon's default
    pub threads: Option<usize>,
    /// Classify only, never call the sink
    pub dry_run: bool,
    /// Combinations per parallel batch (bounds resident trajectories)
    pub chunk_size: usize,
}

impl Default for SweepOptions {
    fn default() -> Self {
        Self {
            threads: None,
            dry_run: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// A retained trajectory.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RetainedCase {
    /// Assigned identifier
    pub id: TrajectoryId,
    /// Parameter set
    pub params: ParameterSet,
    /// Initial state
    pub initial: State,
    /// Population std of x
    pub std_x: f64,
    /// Population std of v
    pub std_v: f64,
    /// Where the sink stored it (`None` on dry runs or sink failure)
    pub location: Option<String>,
    /// Integrator work
    pub stats: SolverStats,
}

/// A trajectory dropped by the classifier.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DiscardedCase {
    /// Flat combination index
    pub combination: usize,
    /// Parameter set
    pub params: ParameterSet,
    /// Initial state
    pub initial: State,
    /// Population std of x
    pub std_x: f64,
    /// Population std of v
    pub std_v: f64,
}

/// A combination whose pipeline run failed.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FailedCase {
    /// Flat combination index
    pub combination: usize,
    /// Offending parameter set
    pub params: ParameterSet,
    /// Offending initial state
    pub initial: State,
    /// What went wrong
    #[serde(serialize_with = "serialize_display")]
    pub error: TrajectoryError,
}

/// A retained trajectory the sink refused.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SinkFailure {
    /// Identifier the write was attempted under
    pub id: TrajectoryId,
    /// Sink error message
    pub error: String,
}

/// Aggregated sweep outcome.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SweepReport {
    /// Combinations enumerated
    pub total_combinations: usize,
    /// Identifier scheme in effect
    pub id_scheme: IdScheme,
    /// Whether sink writes were skipped
    pub dry_run: bool,
    /// Retained trajectories in enumeration order
    pub retained: Vec<RetainedCase>,
    /// Classifier discards in enumeration order
    pub discarded: Vec<DiscardedCase>,
    /// Failed combinations in enumeration order
    pub failed: Vec<FailedCase>,
    /// Rejected sink writes
    pub sink_failures: Vec<SinkFailure>,
}

impl SweepReport {
    /// Every combination ran and every retained trajectory was stored.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.sink_failures.is_empty()
    }

    /// Combinations accounted for (must equal `total_combinations`).
    #[must_use]
    pub fn n_accounted(&self) -> usize {
        self.retained.len() + self.discarded.len() + self.failed.len()
    }

    /// Total RHS evaluations spent on retained trajectories.
    #[must_use]
    pub fn total_nfev(&self) -> usize {
        self.retained.iter().map(|c| c.stats.nfev).sum()
    }
}

/// Run the whole sweep, forwarding retained trajectories to `sink`.
///
/// # Errors
///
/// [`DuffingError::Config`] for an invalid configuration and
/// [`DuffingError::ThreadPool`] if the worker pool cannot be built. Per-case
/// failures land in the report instead.
pub fn run_sweep<S: TrajectorySink + ?Sized>(
    config: &SweepConfig,
    sink: &mut S,
    options: &SweepOptions,
) -> Result<SweepReport, DuffingError> {
    sweep_with(config, sink, options, run_combination)
}

fn sweep_with<S, P>(
    config: &SweepConfig,
    sink: &mut S,
    options: &SweepOptions,
    pipeline: P,
) -> Result<SweepReport, DuffingError>
where
    S: TrajectorySink + ?Sized,
    P: Fn(&Combination, &SweepConfig) -> Outcome + Sync,
{
    config.validate()?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.threads.unwrap_or(0))
        .build()
        .map_err(|e| DuffingError::ThreadPool(e.to_string()))?;

    let combinations = enumerate_combinations(config);
    tracing::info!(
        combinations = combinations.len(),
        threads = pool.current_num_threads(),
        id_scheme = %config.id_scheme,
        dry_run = options.dry_run,
        "starting sweep"
    );

    let mut report = SweepReport {
        total_combinations: combinations.len(),
        id_scheme: config.id_scheme,
        dry_run: options.dry_run,
        ..SweepReport::default()
    };
    let mut next_serial = 0_usize;

    for chunk in combinations.chunks(options.chunk_size.max(1)) {
        let outcomes: Vec<Outcome> =
            pool.install(|| chunk.par_iter().map(|c| pipeline(c, config)).collect());

        for (combination, outcome) in chunk.iter().zip(outcomes) {
            let p = &combination.params;
            match outcome {
                Outcome::Retained {
                    trajectory,
                    decision,
                    stats,
                } => {
                    let serial = match config.id_scheme {
                        IdScheme::Combination => combination.index,
                        IdScheme::Retained => next_serial,
                    };
                    next_serial += 1;
                    let id = TrajectoryId {
                        serial,
                        combination: combination.index,
                    };
                    tracing::debug!(
                        id = %id,
                        accepted = stats.accepted,
                        rejected = stats.rejected,
                        nfev = stats.nfev,
                        "solver statistics"
                    );

                    let location = if options.dry_run {
                        None
                    } else {
                        match sink.write(&id, p, &trajectory) {
                            Ok(location) => {
                                tracing::info!(
                                    id = %id,
                                    location = %location,
                                    std_x = decision.std_x,
                                    std_v = decision.std_v,
                                    "saved trajectory"
                                );
                                Some(location)
                            }
                            Err(e) => {
                                tracing::warn!(id = %id, error = %e, "sink rejected trajectory");
                                report.sink_failures.push(SinkFailure {
                                    id,
                                    error: e.to_string(),
                                });
                                None
                            }
                        }
                    };
                    report.retained.push(RetainedCase {
                        id,
                        params: *p,
                        initial: combination.initial,
                        std_x: decision.std_x,
                        std_v: decision.std_v,
                        location,
                        stats,
                    });
                }
                Outcome::Discarded { decision, .. } => {
                    tracing::info!(
                        combination = combination.index,
                        f = p.forcing,
                        delta = p.damping,
                        omega = p.omega,
                        std_x = decision.std_x,
                        std_v = decision.std_v,
                        "skipped static trajectory"
                    );
                    report.discarded.push(DiscardedCase {
                        combination: combination.index,
                        params: *p,
                        initial: combination.initial,
                        std_x: decision.std_x,
                        std_v: decision.std_v,
                    });
                }
                Outcome::Failed(error) => {
                    tracing::warn!(
                        combination = combination.index,
                        f = p.forcing,
                        delta = p.damping,
                        omega = p.omega,
                        x0 = combination.initial.x,
                        v0 = combination.initial.v,
                        error = %error,
                        "combination failed"
                    );
                    report.failed.push(FailedCase {
                        combination: combination.index,
                        params: *p,
                        initial: combination.initial,
                        error,
                    });
                }
            }
        }
    }

    tracing::info!(
        retained = report.retained.len(),
        discarded = report.discarded.len(),
        failed = report.failed.len(),
        sink_failures = report.sink_failures.len(),
        "sweep complete"
    );
    Ok(report)
}

fn serialize_display<T: fmt::Display, S: Serializer>(value: &T, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(value)
}
