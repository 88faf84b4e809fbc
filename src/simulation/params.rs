//! Numerical and physical parameters for the simulation
//!
//! `Parameters` holds runtime settings:
//! - integration step size and integration scheme,
//! - gravity (along -y),
//! - the energy dissipation coefficient (carried for damping, inert for now),
//! - which constraint kinds drift correction covers

use crate::configuration::config::IntegratorConfig;

/// Constraint kinds the post-integration drift correction repairs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriftCoverage {
    pub pivots: bool,
    pub sliders: bool,
}

impl Default for DriftCoverage {
    fn default() -> Self {
        Self { pivots: true, sliders: false }
    }
}

#[derive(Debug, Clone)]
pub struct Parameters {
    pub time_step: f64, // dt per step
    pub gravity: f64, // along -y
    pub energy_dissipation_coefficient: f64, // unused by the integrators
    pub integrator: IntegratorConfig, // euler or rk4
    pub drift: DriftCoverage,
}

impl Parameters {
    pub fn uses_runge_kutta(&self) -> bool {
        matches!(self.integrator, IntegratorConfig::Rk4)
    }
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            time_step: 0.01,
            gravity: 9.81,
            energy_dissipation_coefficient: 0.0,
            integrator: IntegratorConfig::Euler,
            drift: DriftCoverage::default(),
        }
    }
}
