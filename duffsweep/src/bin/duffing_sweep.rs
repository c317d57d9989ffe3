// SPDX-License-Identifier: AGPL-3.0-only

//! Duffing dataset sweep
//!
//! Runs the full (F, δ, ω) × (x₀, v₀) sweep, writes every retained
//! trajectory as `F{F}_d{δ}_w{ω}_sim_{id}.csv` under the output directory,
//! and optionally a JSON manifest of all outcomes.
//!
//! Log verbosity follows `RUST_LOG` (default `duffsweep=info`).
//!
//! Exit codes: 0 sweep completed with no failures, 1 fatal error,
//! 2 sweep completed but some combinations or writes failed.

use clap::{Parser, ValueEnum};
use duffsweep::report::{print_summary, write_manifest};
use duffsweep::sweep::{run_sweep, IdScheme, SweepOptions, DEFAULT_CHUNK_SIZE};
use duffsweep::{CsvDirectorySink, DuffingError, MemorySink, SweepConfig, SweepReport};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum IdArg {
    /// Flat combination index
    Combination,
    /// Sequential over retained trajectories
    Retained,
}

impl From<IdArg> for IdScheme {
    fn from(arg: IdArg) -> Self {
        match arg {
            IdArg::Combination => Self::Combination,
            IdArg::Retained => Self::Retained,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "duffing_sweep", version)]
#[command(about = "Generate Duffing oscillator trajectories over a parameter grid")]
struct Cli {
    /// Sweep configuration (JSON); built-in defaults when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output directory for CSV files (overrides the config)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Worker threads (default: all cores)
    #[arg(long)]
    threads: Option<usize>,

    /// Identifier scheme (overrides the config)
    #[arg(long, value_enum)]
    id_scheme: Option<IdArg>,

    /// Classify only; write nothing
    #[arg(long)]
    dry_run: bool,

    /// Write a JSON manifest of every outcome to this path
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Combinations integrated per parallel batch
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("duffsweep=info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║  Duffing Oscillator Sweep                                    ║");
    println!("║  Dormand–Prince 5(4) → fixed grid → dispersion filter        ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    match run(&cli) {
        Ok(report) if report.is_clean() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(2),
        Err(e) => {
            tracing::error!(error = %e, "sweep aborted");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<SweepReport, DuffingError> {
    let mut config = match &cli.config {
        Some(path) => SweepConfig::load(path)?,
        None => SweepConfig::default(),
    };
    if let Some(dir) = &cli.output {
        config.output_dir.clone_from(dir);
    }
    if let Some(scheme) = cli.id_scheme {
        config.id_scheme = scheme.into();
    }
    config.validate()?;

    println!("  Parameter sets:  {}", config.n_parameter_sets());
    println!("  Initial states:  {}", config.n_initial_states());
    println!("  Grid points:     {}", config.time.n_points());
    println!(
        "  Tolerances:      rtol={:.0e} atol={:.0e}",
        config.solver.rtol, config.solver.atol
    );
    if cli.dry_run {
        println!("  Output:          (dry run)");
    } else {
        println!("  Output:          {}", config.output_dir.display());
    }
    println!();

    let options = SweepOptions {
        threads: cli.threads,
        dry_run: cli.dry_run,
        chunk_size: cli.chunk_size,
    };

    let start = Instant::now();
    let report = if cli.dry_run {
        run_sweep(&config, &mut MemorySink::default(), &options)?
    } else {
        let mut sink = CsvDirectorySink::create(&config.output_dir)?;
        run_sweep(&config, &mut sink, &options)?
    };
    let elapsed = start.elapsed().as_secs_f64();

    print_summary(&report, elapsed);
    if let Some(path) = &cli.manifest {
        let written = write_manifest(path, &config, &report)?;
        println!("\n  Manifest saved to: {}", written.display());
    }
    for failure in &report.failed {
        println!(
            "  failed #{}: F={} δ={} ω={} x0={} v0={}: {}",
            failure.combination,
            failure.params.forcing,
            failure.params.damping,
            failure.params.omega,
            failure.initial.x,
            failure.initial.v,
            failure.error
        );
    }
    for failure in &report.sink_failures {
        println!("  sink failure sim_{}: {}", failure.id, failure.error);
    }
    Ok(report)
}
