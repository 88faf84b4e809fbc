//! Configuration types for loading simulation scenarios from YAML.
//!
//! This module defines a thin, `serde`-deserializable representation of a
//! scene. A scenario consists of:
//!
//! - [`ParametersConfig`] – step size, gravity, integrator, drift coverage
//! - [`SolidConfig`]      – mass, inertia and initial pose of each solid
//! - [`ConstraintConfig`] – pivots and sliders, referencing solids by name
//! - [`ReleaseConfig`]    – rules that take a constraint out mid-run
//! - [`ScenarioConfig`]   – top-level wrapper used to load a scenario from YAML
//!
//! # YAML format
//! A single pendulum matching these types:
//!
//! ```yaml
//! parameters:
//!   time_step: 0.01         # dt per step
//!   gravity: 9.81           # along -y
//!   integrator: "rk4"       # or "euler"
//!
//! solids:
//!   - name: "Bob"
//!     mass: 1.0
//!     inertia: 0.1          # zz, a full 3x3 matrix, or { sphere: radius }
//!     position: [1.0, 0.0]
//!
//! constraints:
//!   - name: "Hinge"
//!     kind: "pivot"
//!     object1: "Bob"
//!     object1_position: [-1.0, 0.0]   # body frame; no object2 -> ground
//!
//! steps: 200
//! ```
//!
//! The scenario builder maps this configuration onto the engine's runtime
//! types, resolving names to ids.

use serde::Deserialize;

/// Which integrator the engine uses
/// `integrator: "euler"` or `integrator: "rk4"`
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntegratorConfig {
    #[serde(rename = "euler")] // Semi-implicit Euler, one solve per step
    #[default]
    Euler,

    #[serde(rename = "rk4")] // Classical 4th-order Runge–Kutta, four solves per step
    Rk4,
}

/// Constraint kinds the drift correction repairs after each step
#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(default)]
pub struct DriftConfig {
    pub pivots: bool,
    pub sliders: bool,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self { pivots: true, sliders: false }
    }
}

/// Global numerical and physical parameters for a scenario
#[derive(Deserialize, Debug, Clone)]
pub struct ParametersConfig {
    pub time_step: f64, // dt per step
    pub gravity: f64, // along -y
    #[serde(default)]
    pub energy_dissipation_coefficient: f64, // kept for damping, not used yet
    #[serde(default)]
    pub integrator: IntegratorConfig,
    #[serde(default)]
    pub drift: DriftConfig,
}

/// Inertia as its zz value (same on every axis), a full 3x3 matrix, or the
/// radius of a solid sphere (`{ sphere: 0.16 }`) computed from the mass
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum InertiaConfig {
    Scalar(f64),
    Matrix(Vec<Vec<f64>>),
    Sphere { sphere: f64 },
}

/// Configuration for a single solid
#[derive(Deserialize, Debug, Clone)]
pub struct SolidConfig {
    pub name: String, // unique, referenced by constraints
    pub mass: f64,
    pub inertia: InertiaConfig,
    pub position: Vec<f64>, // center of mass, world frame: [x, y] or [x, y, z]
    #[serde(default)]
    pub rotation: f64, // initial heading in radians
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKindConfig {
    Pivot,
    Slider,
}

/// Configuration for a single constraint
#[derive(Deserialize, Debug, Clone)]
pub struct ConstraintConfig {
    pub name: String,
    pub kind: ConstraintKindConfig,
    pub object1: String, // solid name
    pub object1_position: Vec<f64>, // body frame of object1
    #[serde(default)]
    pub object2: Option<String>, // absent: tied to ground
    #[serde(default)]
    pub object2_position: Option<Vec<f64>>, // body frame of object2
    #[serde(default)]
    pub axis: Option<Vec<f64>>, // sliders only, object2 frame (or world)
}

/// When a constraint is taken out of the active set
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum ReleaseRule {
    /// A slider lets go once it would have to pull object1 towards the rail
    LiftOff,
    /// Release once `solid` rises with a speed heading below `angle` (radians)
    SpeedAngleBelow { solid: String, angle: f64 },
}

#[derive(Deserialize, Debug, Clone)]
pub struct ReleaseConfig {
    pub constraint: String,
    #[serde(flatten)]
    pub rule: ReleaseRule,
}

/// Top-level scenario configuration loaded from YAML.
#[derive(Deserialize, Debug, Clone)]
pub struct ScenarioConfig {
    pub parameters: ParametersConfig,
    pub solids: Vec<SolidConfig>,
    pub constraints: Vec<ConstraintConfig>,
    #[serde(default)]
    pub releases: Vec<ReleaseConfig>,
    #[serde(default = "default_steps")]
    pub steps: usize, // how many steps the runner performs
}

fn default_steps() -> usize {
    100
}
