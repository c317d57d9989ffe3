// SPDX-License-Identifier: AGPL-3.0-only

//! Integration tests: integrator + sampler against closed-form solutions.

use duffsweep::duffing::{rhs, vector_field, FixedParameters, ParameterSet, State};
use duffsweep::integrator::{integrate, SolverConfig};
use duffsweep::sampling::{sample, TimeSpan};
use duffsweep::sweep::simulate;
use duffsweep::tolerances;

fn linear_oscillator(mass: f64, stiffness: f64) -> ParameterSet {
    let fixed = FixedParameters {
        mass,
        linear_stiffness: stiffness,
        cubic_stiffness: 0.0,
    };
    ParameterSet::with_drive(fixed, 0.0, 0.0, 0.0)
}

#[test]
fn undamped_linear_oscillator_matches_closed_form() {
    let p = linear_oscillator(1.0, 4.0);
    let w = 2.0;
    let (x0, v0) = (0.3, -1.1);
    let span = TimeSpan::new(0.0, 30.0, 0.01);
    let solver =
        SolverConfig::default().with_tolerances(tolerances::TIGHT_RTOL, tolerances::TIGHT_ATOL);
    let (traj, _) = simulate(&p, State::new(x0, v0), &span, &solver).expect("SHO integrates");

    for pt in traj.points() {
        let x = x0 * (w * pt.t).cos() + v0 / w * (w * pt.t).sin();
        let v = -x0 * w * (w * pt.t).sin() + v0 * (w * pt.t).cos();
        let bound_x = tolerances::SHO_GLOBAL_ABS + tolerances::SHO_GLOBAL_REL * x.abs();
        let bound_v = tolerances::SHO_GLOBAL_ABS + tolerances::SHO_GLOBAL_REL * v.abs();
        assert!((pt.x - x).abs() <= bound_x, "t={}: x={} exact={x}", pt.t, pt.x);
        assert!((pt.v - v).abs() <= bound_v, "t={}: v={} exact={v}", pt.t, pt.v);
    }
}

#[test]
fn default_tolerances_track_oscillator_phase() {
    let p = linear_oscillator(1.0, 1.0);
    let span = TimeSpan::new(0.0, 10.0, 0.1);
    let (traj, stats) = simulate(&p, State::new(1.0, 0.0), &span, &SolverConfig::default())
        .expect("SHO integrates");
    assert!(stats.accepted > 10);
    assert_eq!(stats.nfev, 2 + 6 * (stats.accepted + stats.rejected));
    for pt in traj.points() {
        assert!((pt.x - pt.t.cos()).abs() < 1e-4, "t={} x={}", pt.t, pt.x);
    }
}

#[test]
fn energy_conserved_without_damping_or_forcing() {
    let p = ParameterSet::with_drive(FixedParameters::default(), 0.0, 0.0, 1.0);
    let start = State::new(1.5, 0.0);
    let e0 = p.energy(start);
    let span = TimeSpan::new(0.0, 50.0, 0.05);
    let solver =
        SolverConfig::default().with_tolerances(tolerances::TIGHT_RTOL, tolerances::TIGHT_ATOL);
    let (traj, _) = simulate(&p, start, &span, &solver).expect("double well integrates");
    for pt in traj.points() {
        let e = p.energy(State::new(pt.x, pt.v));
        assert!((e - e0).abs() < 1e-6, "t={} energy drift {}", pt.t, e - e0);
    }
}

#[test]
fn sampler_length_is_floor_of_span_over_dt() {
    let p = ParameterSet::with_drive(FixedParameters::default(), 0.3, 0.2, 1.2);
    for span in [
        TimeSpan::new(0.0, 100.0, 0.01),
        TimeSpan::new(0.0, 10.0, 0.3),
        TimeSpan::new(1.0, 4.0, 0.25),
        TimeSpan::new(0.0, 0.3, 0.1),
    ] {
        let (traj, _) = simulate(&p, State::new(0.0, 0.0), &span, &SolverConfig::default())
            .expect("pipeline runs");
        let expected = ((span.t_end - span.t_start) / span.dt + 1e-9).floor() as usize;
        assert_eq!(traj.len(), expected, "span {span:?}");
        assert_eq!(traj.points()[0].t, span.t_start);
        assert!(traj.times().zip(traj.times().skip(1)).all(|(a, b)| b > a));
    }
}

#[test]
fn dense_output_hits_accepted_step_endpoints_exactly() {
    let p = ParameterSet::with_drive(FixedParameters::default(), 0.7, 0.1, 1.4);
    let sol = integrate(
        |t, y| rhs(t, y, &p),
        0.0,
        20.0,
        [1.0, -1.0],
        &SolverConfig::default(),
    )
    .expect("integrates");
    for seg in sol.segments() {
        assert_eq!(sol.eval(seg.t_new).expect("in range"), seg.y_new);
    }
    assert_eq!(sol.t_reached(), 20.0);
    let span = TimeSpan::new(0.0, 20.0, 0.5);
    let traj = sample(&sol, &span).expect("grid covered");
    assert_eq!(traj.len(), 40);
}

#[test]
fn pipeline_is_bitwise_deterministic() {
    let p = ParameterSet::with_drive(FixedParameters::default(), 1.0, 0.1, 1.4);
    let s = State::new(-2.0, 2.0);
    let a = vector_field(3.25, s, &p);
    let b = vector_field(3.25, s, &p);
    assert_eq!(a.x.to_bits(), b.x.to_bits());
    assert_eq!(a.v.to_bits(), b.v.to_bits());

    let span = TimeSpan::new(0.0, 25.0, 0.01);
    let (t1, s1) = simulate(&p, s, &span, &SolverConfig::default()).expect("runs");
    let (t2, s2) = simulate(&p, s, &span, &SolverConfig::default()).expect("runs");
    assert_eq!(s1, s2);
    assert!(t1
        .points()
        .iter()
        .zip(t2.points())
        .all(|(a, b)| a.x.to_bits() == b.x.to_bits() && a.v.to_bits() == b.v.to_bits()));
}
