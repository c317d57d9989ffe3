// SPDX-License-Identifier: AGPL-3.0-only

//! Pass/fail harness for validation binaries.
//!
//! A validation binary records explicit checks against documented
//! tolerances (see [`crate::tolerances`]), prints one line per check, and
//! exits 0 when every check passes, 1 otherwise.

use std::fmt;
use std::process;

/// How a check's bound is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToleranceMode {
    /// |observed − expected| < tol
    Absolute,
    /// |observed − expected| ≤ atol + rtol·|expected|
    Mixed,
    /// observed < bound
    UpperBound,
    /// observed > bound
    LowerBound,
    /// Boolean condition
    Condition,
}

impl fmt::Display for ToleranceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Absolute => "abs",
            Self::Mixed => "atol+rtol",
            Self::UpperBound => "<",
            Self::LowerBound => ">",
            Self::Condition => "bool",
        };
        f.write_str(s)
    }
}

/// One recorded check.
#[derive(Debug, Clone)]
pub struct Check {
    /// Label printed in the summary
    pub label: String,
    /// Outcome
    pub passed: bool,
    /// Measured value
    pub observed: f64,
    /// Reference value or bound
    pub expected: f64,
    /// Effective tolerance
    pub tolerance: f64,
    /// How the tolerance was applied
    pub mode: ToleranceMode,
}

/// Collects checks for one validation binary.
#[derive(Debug, Default)]
#[must_use]
pub struct ValidationHarness {
    /// Binary name
    pub name: String,
    /// Checks in recording order
    pub checks: Vec<Check>,
}

impl ValidationHarness {
    /// Empty harness.
    #[must_use = "validation harness must be used to run checks"]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            checks: Vec::new(),
        }
    }

    fn record(
        &mut self,
        label: &str,
        passed: bool,
        observed: f64,
        expected: f64,
        tolerance: f64,
        mode: ToleranceMode,
    ) {
        self.checks.push(Check {
            label: label.to_string(),
            passed,
            observed,
            expected,
            tolerance,
            mode,
        });
    }

    /// |observed − expected| < tolerance
    pub fn check_abs(&mut self, label: &str, observed: f64, expected: f64, tolerance: f64) {
        let passed = (observed - expected).abs() < tolerance;
        self.record(label, passed, observed, expected, tolerance, ToleranceMode::Absolute);
    }

    /// Solver-style bound: |observed − expected| ≤ atol + rtol·|expected|.
    pub fn check_within(
        &mut self,
        label: &str,
        observed: f64,
        expected: f64,
        atol: f64,
        rtol: f64,
    ) {
        let bound = atol + rtol * expected.abs();
        let passed = (observed - expected).abs() <= bound;
        self.record(label, passed, observed, expected, bound, ToleranceMode::Mixed);
    }

    /// observed < bound
    pub fn check_upper(&mut self, label: &str, observed: f64, bound: f64) {
        self.record(label, observed < bound, observed, bound, bound, ToleranceMode::UpperBound);
    }

    /// observed > bound
    pub fn check_lower(&mut self, label: &str, observed: f64, bound: f64) {
        self.record(label, observed > bound, observed, bound, bound, ToleranceMode::LowerBound);
    }

    /// Boolean condition.
    pub fn check_bool(&mut self, label: &str, passed: bool) {
        self.record(
            label,
            passed,
            f64::from(u8::from(passed)),
            1.0,
            0.0,
            ToleranceMode::Condition,
        );
    }

    /// Number of passing checks.
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.checks.iter().filter(|c| c.passed).count()
    }

    /// Number of checks.
    #[must_use]
    pub const fn total_count(&self) -> usize {
        self.checks.len()
    }

    /// Every check passed (vacuously true when empty).
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    /// Summary text: header line plus one line per check.
    #[must_use]
    pub fn format_summary(&self) -> String {
        use std::fmt::Write;
        let mut s = String::new();
        let _ = writeln!(
            s,
            "═══ {} validation: {}/{} checks passed ═══",
            self.name,
            self.passed_count(),
            self.total_count()
        );
        for check in &self.checks {
            let icon = if check.passed { "✓" } else { "✗" };
            let _ = writeln!(
                s,
                "  {icon} {}: observed={:.6e}, expected={:.6e}, tol={:.2e} ({})",
                check.label, check.observed, check.expected, check.tolerance, check.mode
            );
        }
        s
    }

    /// Print the summary and exit 0 (all passed) or 1.
    pub fn finish(&self) -> ! {
        println!();
        print!("{}", self.format_summary());
        if self.all_passed() {
            println!("ALL CHECKS PASSED");
            process::exit(0);
        }
        let failed: Vec<&str> = self
            .checks
            .iter()
            .filter(|c| !c.passed)
            .map(|c| c.label.as_str())
            .collect();
        println!("FAILED CHECKS: {}", failed.join(", "));
        process::exit(1);
    }
}
