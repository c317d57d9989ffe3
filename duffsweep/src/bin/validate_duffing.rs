// SPDX-License-Identifier: AGPL-3.0-only

//! Duffing pipeline validation
//!
//! Checks the integrator, sampler, classifier and sweep driver against
//! closed-form solutions and reference cases with known outcomes:
//!   - undamped linear oscillator vs `x(t) = x₀ cos(ω₀t) + (v₀/ω₀) sin(ω₀t)`
//!   - forced double well from the origin (must be retained)
//!   - unforced, heavily damped rest state (must be discarded)
//!   - classifier decisions stable under halving dt
//!   - sweep identifiers independent of thread count
//!   - one escaping trajectory does not suppress the others
//!
//! **Provenance**: all expected values are analytical or follow from the
//! potential's geometry; no stored baselines.

use duffsweep::classifier::{classify, ClassifierConfig};
use duffsweep::config::{Linspace, SweepConfig};
use duffsweep::duffing::{vector_field, FixedParameters, ParameterSet, State};
use duffsweep::integrator::SolverConfig;
use duffsweep::sampling::TimeSpan;
use duffsweep::sink::MemorySink;
use duffsweep::sweep::{run_sweep, simulate, SweepOptions};
use duffsweep::tolerances;
use duffsweep::validation::ValidationHarness;

fn main() {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║  Duffing Pipeline Validation                                 ║");
    println!("║  closed form · reference cases · sweep determinism           ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    let mut harness = ValidationHarness::new("duffing");

    check_vector_field(&mut harness);
    check_linear_oscillator(&mut harness);
    check_reference_cases(&mut harness);
    check_sweep(&mut harness);

    harness.finish();
}

fn check_vector_field(harness: &mut ValidationHarness) {
    println!("═══ Vector field ═══");
    let p = ParameterSet::with_drive(FixedParameters::default(), 0.3, 0.2, 1.2);
    let s = State::new(0.7, -0.4);
    let a = vector_field(2.5, s, &p);
    let b = vector_field(2.5, s, &p);
    harness.check_bool(
        "vector field bit-identical on repeat",
        a.x.to_bits() == b.x.to_bits() && a.v.to_bits() == b.v.to_bits(),
    );
    let expected = -0.2 * -0.4 + 0.7 - 0.7_f64.powi(3) + 0.3 * (1.2_f64 * 2.5).cos();
    harness.check_abs("dv/dt formula", a.v, expected, 1e-14);
    println!("  f(2.5, (0.7, −0.4)) = ({:.6}, {:.6})", a.x, a.v);
}

fn check_linear_oscillator(harness: &mut ValidationHarness) {
    println!("═══ Undamped linear oscillator (closed form) ═══");
    let fixed = FixedParameters {
        mass: 2.0,
        linear_stiffness: 8.0,
        cubic_stiffness: 0.0,
    };
    let p = ParameterSet::with_drive(fixed, 0.0, 0.0, 0.0);
    let omega0 = (fixed.linear_stiffness / fixed.mass).sqrt();
    let (x0, v0) = (1.0, 0.5);
    let span = TimeSpan::new(0.0, 20.0, 0.01);
    let solver =
        SolverConfig::default().with_tolerances(tolerances::TIGHT_RTOL, tolerances::TIGHT_ATOL);

    match simulate(&p, State::new(x0, v0), &span, &solver) {
        Ok((traj, stats)) => {
            harness.check_bool("grid length = floor(span/dt)", traj.len() == span.n_points());
            let mut worst_excess = f64::NEG_INFINITY;
            let mut max_err = 0.0_f64;
            for pt in traj.points() {
                let exact_x = x0 * (omega0 * pt.t).cos() + v0 / omega0 * (omega0 * pt.t).sin();
                let exact_v = -x0 * omega0 * (omega0 * pt.t).sin() + v0 * (omega0 * pt.t).cos();
                for (got, want) in [(pt.x, exact_x), (pt.v, exact_v)] {
                    let err = (got - want).abs();
                    let bound =
                        tolerances::SHO_GLOBAL_ABS + tolerances::SHO_GLOBAL_REL * want.abs();
                    max_err = max_err.max(err);
                    worst_excess = worst_excess.max(err - bound);
                }
            }
            println!(
                "  {} steps ({} rejected), {} RHS evals, max |err| = {max_err:.3e}",
                stats.accepted, stats.rejected, stats.nfev
            );
            harness.check_upper("SHO pointwise error − bound", worst_excess, 0.0);
            if let Some(last) = traj.points().last() {
                let exact_x = x0 * (omega0 * last.t).cos() + v0 / omega0 * (omega0 * last.t).sin();
                harness.check_within(
                    "SHO x at last grid point",
                    last.x,
                    exact_x,
                    tolerances::SHO_GLOBAL_ABS,
                    tolerances::SHO_GLOBAL_REL,
                );
            }
        }
        Err(e) => {
            println!("  integration failed: {e}");
            harness.check_bool("SHO integrates", false);
        }
    }
}

fn reference_std(f: f64, delta: f64, omega: f64, dt: f64) -> Option<(bool, f64, f64)> {
    let p = ParameterSet::with_drive(FixedParameters::default(), f, delta, omega);
    let span = TimeSpan::new(0.0, 100.0, dt);
    let (traj, _) =
        simulate(&p, State::new(0.0, 0.0), &span, &SolverConfig::default()).ok()?;
    let d = classify(&traj, &ClassifierConfig::default())?;
    Some((d.retain, d.std_x, d.std_v))
}

fn check_reference_cases(harness: &mut ValidationHarness) {
    println!("═══ Reference cases (t ∈ [0, 100), origin start) ═══");
    let cases = [
        ("forced double well F=0.3 δ=0.2 ω=1.2", 0.3, 0.2, 1.2, true),
        ("unforced heavy damping F=0 δ=5", 0.0, 5.0, 1.2, false),
    ];
    for (label, f, delta, omega, expect_retain) in cases {
        let Some((retain, std_x, std_v)) = reference_std(f, delta, omega, 0.01) else {
            harness.check_bool(&format!("{label}: pipeline ran"), false);
            continue;
        };
        println!("  {label}: std_x={std_x:.4}, std_v={std_v:.4}, retain={retain}");
        harness.check_bool(&format!("{label}: decision"), retain == expect_retain);
        if expect_retain {
            harness.check_lower(
                &format!("{label}: std_x"),
                std_x,
                tolerances::FORCED_WELL_STD_X_MIN,
            );
        } else {
            harness.check_upper(
                &format!("{label}: std_x"),
                std_x,
                tolerances::HEAVY_DAMPING_STD_MAX,
            );
            harness.check_upper(
                &format!("{label}: std_v"),
                std_v,
                tolerances::HEAVY_DAMPING_STD_MAX,
            );
        }

        let halved = reference_std(f, delta, omega, 0.005);
        harness.check_bool(
            &format!("{label}: decision stable at dt/2"),
            halved.is_some_and(|(r, _, _)| r == retain),
        );
    }
}

fn check_sweep(harness: &mut ValidationHarness) {
    println!("═══ Sweep driver ═══");
    let config = SweepConfig {
        forcing: vec![0.3, 1.0],
        damping: vec![0.2],
        omega: vec![1.2],
        initial_position: Linspace::new(-1.0, 1.0, 3),
        initial_velocity: Linspace::new(-0.5, 0.5, 2),
        time: TimeSpan::new(0.0, 20.0, 0.01),
        ..SweepConfig::default()
    };

    let mut ids = Vec::new();
    for threads in [1, 4] {
        let options = SweepOptions {
            threads: Some(threads),
            ..SweepOptions::default()
        };
        let mut sink = MemorySink::default();
        match run_sweep(&config, &mut sink, &options) {
            Ok(report) => {
                let mapping: Vec<(usize, usize)> = report
                    .retained
                    .iter()
                    .map(|c| (c.id.combination, c.id.serial))
                    .collect();
                println!(
                    "  {threads} thread(s): {} retained, {} discarded, {} failed",
                    report.retained.len(),
                    report.discarded.len(),
                    report.failed.len()
                );
                ids.push(mapping);
            }
            Err(e) => {
                println!("  sweep failed: {e}");
                harness.check_bool("sweep runs", false);
                return;
            }
        }
    }
    harness.check_bool("identifiers independent of thread count", ids[0] == ids[1]);

    // Softening spring: x₀ = 3 starts beyond the barrier at x = 1 and
    // escapes to infinity in finite time; x₀ = 0.5 oscillates in the well.
    let escaping = SweepConfig {
        fixed: FixedParameters {
            mass: 1.0,
            linear_stiffness: 1.0,
            cubic_stiffness: -1.0,
        },
        forcing: vec![0.0],
        damping: vec![0.1],
        omega: vec![1.0],
        initial_position: Linspace::new(0.5, 3.0, 2),
        initial_velocity: Linspace::new(0.0, 0.0, 1),
        time: TimeSpan::new(0.0, 10.0, 0.01),
        ..SweepConfig::default()
    };
    let mut sink = MemorySink::default();
    match run_sweep(&escaping, &mut sink, &SweepOptions::default()) {
        Ok(report) => {
            harness.check_bool("escaping case recorded as failed", report.failed.len() == 1);
            harness.check_bool("bounded case still retained", report.retained.len() == 1);
            if let Some(f) = report.failed.first() {
                println!("  x0={}: {}", f.initial.x, f.error);
            }
        }
        Err(e) => {
            println!("  sweep failed: {e}");
            harness.check_bool("failure isolation sweep runs", false);
        }
    }
}
