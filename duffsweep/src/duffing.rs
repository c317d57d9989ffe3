// SPDX-License-Identifier: AGPL-3.0-only

//! Duffing oscillator: parameters, phase-space state and vector field.
//!
//! Second-order model:
//! ```text
//! m x'' + δ x' + k x + α x³ = F cos(ω t)
//! ```
//! As a first-order system in (x, v):
//! ```text
//! dx/dt = v
//! dv/dt = (1/m)(−δ v − k x − α x³ + F cos(ω t))
//! ```
//! With k < 0, α > 0 the potential `k x²/2 + α x⁴/4` is a double well with
//! minima at `x = ±sqrt(−k/α)` and an unstable equilibrium at the origin.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Parameters held fixed across a sweep (mass and stiffness terms).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixedParameters {
    /// Mass m (> 0)
    pub mass: f64,
    /// Linear stiffness k (negative: double well)
    pub linear_stiffness: f64,
    /// Cubic stiffness α
    pub cubic_stiffness: f64,
}

impl Default for FixedParameters {
    fn default() -> Self {
        Self {
            mass: 1.0,
            linear_stiffness: -1.0,
            cubic_stiffness: 1.0,
        }
    }
}

/// Full parameter set for one sweep combination.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[must_use]
pub struct ParameterSet {
    /// Mass m (> 0)
    pub mass: f64,
    /// Linear stiffness k
    pub linear_stiffness: f64,
    /// Cubic stiffness α
    pub cubic_stiffness: f64,
    /// Damping δ (≥ 0)
    pub damping: f64,
    /// Forcing amplitude F (≥ 0)
    pub forcing: f64,
    /// Driving frequency ω (≥ 0)
    pub omega: f64,
}

impl ParameterSet {
    /// Combine the fixed terms with one (F, δ, ω) drive combination.
    pub const fn with_drive(
        fixed: FixedParameters,
        forcing: f64,
        damping: f64,
        omega: f64,
    ) -> Self {
        Self {
            mass: fixed.mass,
            linear_stiffness: fixed.linear_stiffness,
            cubic_stiffness: fixed.cubic_stiffness,
            damping,
            forcing,
            omega,
        }
    }

    /// Check the physical constraints: m > 0; δ, F, ω ≥ 0; all finite.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint as a [`ConfigError`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("mass", self.mass),
            ("linear_stiffness", self.linear_stiffness),
            ("cubic_stiffness", self.cubic_stiffness),
            ("damping", self.damping),
            ("forcing", self.forcing),
            ("omega", self.omega),
        ];
        if let Some((name, _)) = fields.into_iter().find(|(_, v)| !v.is_finite()) {
            return Err(ConfigError::NonFinite(name));
        }
        if self.mass <= 0.0 {
            return Err(ConfigError::NonPositiveMass(self.mass));
        }
        for (name, value) in [
            ("damping", self.damping),
            ("forcing", self.forcing),
            ("omega", self.omega),
        ] {
            if value < 0.0 {
                return Err(ConfigError::NegativeParameter { name, value });
            }
        }
        Ok(())
    }

    /// Potential energy `k x²/2 + α x⁴/4` per unit mass convention of the model.
    #[must_use]
    pub fn potential(&self, x: f64) -> f64 {
        let x2 = x * x;
        0.5 * self.linear_stiffness * x2 + 0.25 * self.cubic_stiffness * x2 * x2
    }

    /// Total mechanical energy `m v²/2 + V(x)`.
    #[must_use]
    pub fn energy(&self, state: State) -> f64 {
        0.5 * self.mass * state.v * state.v + self.potential(state.x)
    }
}

/// Phase-space point (position, velocity).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// Position x
    pub x: f64,
    /// Velocity v
    pub v: f64,
}

impl State {
    /// New state.
    #[must_use]
    pub const fn new(x: f64, v: f64) -> Self {
        Self { x, v }
    }

    /// Both components finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.v.is_finite()
    }
}

impl From<[f64; 2]> for State {
    fn from(y: [f64; 2]) -> Self {
        Self { x: y[0], v: y[1] }
    }
}

impl From<State> for [f64; 2] {
    fn from(s: State) -> Self {
        [s.x, s.v]
    }
}

/// Duffing vector field: returns `(dx/dt, dv/dt)` at time `t`.
///
/// Pure and deterministic. Non-finite inputs propagate to non-finite output;
/// the integrator is responsible for detecting them.
#[must_use]
#[inline]
pub fn vector_field(t: f64, state: State, params: &ParameterSet) -> State {
    let State { x, v } = state;
    let restoring = params.linear_stiffness * x + params.cubic_stiffness * x * x * x;
    let drive = params.forcing * (params.omega * t).cos();
    let accel = (-params.damping * v - restoring + drive) / params.mass;
    State { x: v, v: accel }
}

/// Array form of [`vector_field`] for the generic integrator.
#[must_use]
#[inline]
pub fn rhs(t: f64, y: &[f64; 2], params: &ParameterSet) -> [f64; 2] {
    vector_field(t, State::from(*y), params).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> ParameterSet {
        ParameterSet::with_drive(FixedParameters::default(), 0.3, 0.2, 1.2)
    }

    #[test]
    fn velocity_component_is_v() {
        let p = reference();
        let d = vector_field(0.7, State::new(0.4, -1.3), &p);
        assert_eq!(d.x, -1.3);
    }

    #[test]
    fn acceleration_matches_formula() {
        let p = ParameterSet {
            mass: 2.0,
            linear_stiffness: 3.0,
            cubic_stiffness: 0.5,
            damping: 0.1,
            forcing: 1.5,
            omega: 2.0,
        };
        let (t, x, v) = (0.25_f64, 1.2_f64, -0.4_f64);
        let expected = (-0.1 * v - 3.0 * x - 0.5 * x.powi(3) + 1.5 * (2.0 * t).cos()) / 2.0;
        let d = vector_field(t, State::new(x, v), &p);
        assert!((d.v - expected).abs() < 1e-14);
    }

    #[test]
    fn bit_identical_repeated_evaluation() {
        let p = reference();
        let s = State::new(-1.7, 0.9);
        let a = vector_field(13.37, s, &p);
        let b = vector_field(13.37, s, &p);
        assert_eq!(a.x.to_bits(), b.x.to_bits());
        assert_eq!(a.v.to_bits(), b.v.to_bits());
    }

    #[test]
    fn origin_unforced_is_equilibrium() {
        let p = ParameterSet::with_drive(FixedParameters::default(), 0.0, 5.0, 1.2);
        let d = vector_field(3.0, State::default(), &p);
        assert_eq!(d, State::new(0.0, 0.0));
    }

    #[test]
    fn wells_are_force_free() {
        let p = ParameterSet::with_drive(FixedParameters::default(), 0.0, 0.0, 0.0);
        for x in [-1.0, 1.0] {
            assert_eq!(vector_field(0.0, State::new(x, 0.0), &p).v, 0.0);
        }
        assert!(p.potential(1.0) < p.potential(0.0));
    }

    #[test]
    fn non_finite_propagates() {
        let p = reference();
        let d = vector_field(0.0, State::new(f64::NAN, 0.0), &p);
        assert!(d.v.is_nan());
    }

    #[test]
    fn validate_rejects_bad_parameters() {
        let mut p = reference();
        p.mass = 0.0;
        assert_eq!(p.validate(), Err(ConfigError::NonPositiveMass(0.0)));
        let mut p = reference();
        p.damping = -0.1;
        assert!(matches!(
            p.validate(),
            Err(ConfigError::NegativeParameter { name: "damping", .. })
        ));
        let mut p = reference();
        p.omega = f64::INFINITY;
        assert_eq!(p.validate(), Err(ConfigError::NonFinite("omega")));
        assert!(reference().validate().is_ok());
    }

    #[test]
    fn array_round_trip_through_rhs() {
        let p = reference();
        let y = [0.5, 0.25];
        let d = rhs(1.0, &y, &p);
        let s = vector_field(1.0, State::new(0.5, 0.25), &p);
        assert_eq!(d, [s.x, s.v]);
    }
}
