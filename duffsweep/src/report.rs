// SPDX-License-Identifier: AGPL-3.0-only

//! Sweep manifest (JSON) and console summary box.

use crate::config::SweepConfig;
use crate::error::DuffingError;
use crate::sweep::SweepReport;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Outcome counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Totals {
    /// Combinations enumerated
    pub combinations: usize,
    /// Retained by the classifier
    pub retained: usize,
    /// Discarded by the classifier
    pub discarded: usize,
    /// Pipeline failures
    pub failed: usize,
    /// Rejected sink writes
    pub sink_failures: usize,
}

impl Totals {
    /// Count a report.
    #[must_use]
    pub fn of(report: &SweepReport) -> Self {
        Self {
            combinations: report.total_combinations,
            retained: report.retained.len(),
            discarded: report.discarded.len(),
            failed: report.failed.len(),
            sink_failures: report.sink_failures.len(),
        }
    }
}

/// Everything needed to reproduce and audit a sweep.
#[derive(Debug, Serialize)]
pub struct Manifest<'a> {
    /// Crate name and version that produced the data
    pub generator: String,
    /// Configuration the sweep ran with
    pub config: &'a SweepConfig,
    /// Outcome counts
    pub totals: Totals,
    /// Per-combination outcomes
    pub report: &'a SweepReport,
}

impl<'a> Manifest<'a> {
    /// Bundle a finished sweep.
    #[must_use]
    pub fn new(config: &'a SweepConfig, report: &'a SweepReport) -> Self {
        Self {
            generator: format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            config,
            totals: Totals::of(report),
            report,
        }
    }
}

/// Write the manifest as pretty JSON, creating the parent directory if needed.
///
/// # Errors
///
/// [`DuffingError::Report`] if serialization or the file write fails.
pub fn write_manifest(
    path: &Path,
    config: &SweepConfig,
    report: &SweepReport,
) -> Result<PathBuf, DuffingError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| DuffingError::Report(format!("create {}: {e}", parent.display())))?;
    }
    let json = serde_json::to_string_pretty(&Manifest::new(config, report))
        .map_err(|e| DuffingError::Report(format!("JSON serialize: {e}")))?;
    std::fs::write(path, json)
        .map_err(|e| DuffingError::Report(format!("write {}: {e}", path.display())))?;
    Ok(path.to_path_buf())
}

/// Summary box lines (without trailing newlines).
#[must_use]
pub fn summary_lines(report: &SweepReport, elapsed_s: f64) -> Vec<String> {
    let t = Totals::of(report);
    let mode = if report.dry_run { "dry run" } else { "written" };
    vec![
        "╔══════════════════════════════════════════════════════════════╗".to_string(),
        format!("║  {:<60}║", format!("Duffing sweep summary ({mode})")),
        "╠══════════════════════════════════════════════════════════════╣".to_string(),
        format!("║  Combinations:   {:>8}{:36}║", t.combinations, ""),
        format!("║  Retained:       {:>8}{:36}║", t.retained, ""),
        format!("║  Discarded:      {:>8}{:36}║", t.discarded, ""),
        format!("║  Failed:         {:>8}{:36}║", t.failed, ""),
        format!("║  Sink failures:  {:>8}{:36}║", t.sink_failures, ""),
        format!("║  RHS evals:      {:>12}{:32}║", report.total_nfev(), ""),
        format!("║  Wall time:      {elapsed_s:>10.1}s{:33}║", ""),
        "╚══════════════════════════════════════════════════════════════╝".to_string(),
    ]
}

/// Print the summary box to stdout.
pub fn print_summary(report: &SweepReport, elapsed_s: f64) {
    println!();
    for line in summary_lines(report, elapsed_s) {
        println!("{line}");
    }
}
