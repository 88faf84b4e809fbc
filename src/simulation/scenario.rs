//! Build fully-initialized simulation scenarios from configuration
//!
//! Takes a `ScenarioConfig` (YAML-facing) and produces a runtime bundle
//! containing:
//! - the engine (`Engine`) with its solids, constraints and parameters
//! - release rules (`Release`) that drop constraints while running
//! - the number of steps the runner should perform
//!
//! Releases are a caller policy on top of the engine: after each step the
//! scenario checks them and calls `Engine::remove_constraint`.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use tracing::info;

use crate::configuration::config::{
    ConstraintConfig, ConstraintKindConfig, InertiaConfig, ReleaseRule, ScenarioConfig, SolidConfig,
};

use super::assembler::slider_frame;
use super::engine::{Engine, EngineSettings, StepOptions, StepReport};
use super::error::{Result, SimError};
use super::geometry::{planar_angle, sphere_inertia, uniform_inertia, NMat3, NVec3};
use super::params::{DriftCoverage, Parameters};
use super::states::{Constraint, ConstraintId, ConstraintKind, Solid, SolidId};

/// Release rule with names resolved to ids
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Trigger {
    LiftOff,
    SpeedAngleBelow { solid: SolidId, angle: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Release {
    pub constraint: ConstraintId,
    pub trigger: Trigger,
    pub fired: bool,
}

impl Release {
    /// Whether the trigger condition holds for the engine's current state
    pub fn is_due(&self, engine: &Engine) -> bool {
        let c = engine.constraint(self.constraint);
        if self.fired || !c.active {
            return false;
        }
        match self.trigger {
            Trigger::LiftOff => match c.kind {
                // the rail may push object1 away but never pull it back
                ConstraintKind::Slider { axis } => {
                    let (_, n) = slider_frame(engine.system(), c, &axis);
                    n.dot(&c.force_applied_to_first_object) < 0.0
                }
                ConstraintKind::Pivot => false,
            },
            Trigger::SpeedAngleBelow { solid, angle } => {
                // only a rising solid counts, a body sliding along y = 0 has a
                // heading of +-pi depending on the sign of a vanishing vy
                let speed = engine.solid(solid).speed;
                speed.y > 0.0 && planar_angle(&speed) < angle
            }
        }
    }
}

/// Runtime bundle built from a [`ScenarioConfig`]
pub struct Scenario {
    pub engine: Engine,
    pub releases: Vec<Release>,
    pub steps: usize,
}

fn vector(values: &[f64], what: &str) -> Result<NVec3> {
    match values {
        [x, y] => Ok(NVec3::new(*x, *y, 0.0)),
        [x, y, z] => Ok(NVec3::new(*x, *y, *z)),
        _ => Err(SimError::InvalidConfig(format!("{what}: expected 2 or 3 components, got {}", values.len()))),
    }
}

fn inertia(cfg: &InertiaConfig, mass: f64, what: &str) -> Result<NMat3> {
    match cfg {
        InertiaConfig::Scalar(v) => Ok(uniform_inertia(*v)),
        InertiaConfig::Sphere { sphere } => Ok(sphere_inertia(mass, *sphere)),
        InertiaConfig::Matrix(rows) => {
            if rows.len() != 3 || rows.iter().any(|r| r.len() != 3) {
                return Err(SimError::InvalidConfig(format!("{what}: inertia must be 3x3")));
            }
            Ok(NMat3::from_fn(|i, j| rows[i][j]))
        }
    }
}

fn build_solid(cfg: &SolidConfig) -> Result<Solid> {
    let position = vector(&cfg.position, &cfg.name)?;
    let inertia = inertia(&cfg.inertia, cfg.mass, &cfg.name)?;
    Ok(Solid::new(cfg.name.clone(), cfg.mass, inertia, position).with_rotation(cfg.rotation))
}

fn build_constraint(cfg: &ConstraintConfig, solids: &[Solid]) -> Result<Constraint> {
    let lookup = |name: &str| {
        solids
            .iter()
            .position(|s| s.name == name)
            .map(SolidId)
            .ok_or_else(|| SimError::UnknownSolid(name.to_string()))
    };

    let object1 = lookup(&cfg.object1)?;
    let position1 = vector(&cfg.object1_position, &cfg.name)?;
    let mut constraint = match cfg.kind {
        ConstraintKindConfig::Pivot => Constraint::pivot(cfg.name.clone(), object1, position1),
        ConstraintKindConfig::Slider => {
            let axis = cfg
                .axis
                .as_deref()
                .ok_or_else(|| SimError::InvalidConfig(format!("{}: slider needs an axis", cfg.name)))?;
            Constraint::slider(cfg.name.clone(), object1, position1, vector(axis, &cfg.name)?)
        }
    };

    if let Some(name) = &cfg.object2 {
        let position2 = match &cfg.object2_position {
            Some(p) => vector(p, &cfg.name)?,
            None => NVec3::zeros(),
        };
        constraint = constraint.with_object2(lookup(name)?, position2);
    }
    Ok(constraint)
}

impl Scenario {
    pub fn build_scenario(cfg: ScenarioConfig) -> Result<Self> {
        // Solids: map `SolidConfig` -> runtime `Solid`
        let solids = cfg.solids.iter().map(build_solid).collect::<Result<Vec<_>>>()?;

        // Constraints: resolve solid names to ids
        let constraints = cfg
            .constraints
            .iter()
            .map(|c| build_constraint(c, &solids))
            .collect::<Result<Vec<_>>>()?;

        // Parameters (runtime) from ParametersConfig
        let p_cfg = cfg.parameters;
        let parameters = Parameters {
            time_step: p_cfg.time_step,
            gravity: p_cfg.gravity,
            energy_dissipation_coefficient: p_cfg.energy_dissipation_coefficient,
            integrator: p_cfg.integrator,
            drift: DriftCoverage { pivots: p_cfg.drift.pivots, sliders: p_cfg.drift.sliders },
        };

        let engine = Engine::new(EngineSettings { solids, constraints, parameters })?;

        let releases = cfg
            .releases
            .iter()
            .map(|r| -> Result<Release> {
                let constraint = engine
                    .find_constraint(&r.constraint)
                    .ok_or_else(|| SimError::UnknownConstraint(r.constraint.clone()))?;
                let trigger = match &r.rule {
                    ReleaseRule::LiftOff => Trigger::LiftOff,
                    ReleaseRule::SpeedAngleBelow { solid, angle } => Trigger::SpeedAngleBelow {
                        solid: engine.find_solid(solid).ok_or_else(|| SimError::UnknownSolid(solid.clone()))?,
                        angle: *angle,
                    },
                };
                Ok(Release { constraint, trigger, fired: false })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { engine, releases, steps: cfg.steps })
    }

    /// Read and build a scenario from a YAML file
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let cfg: ScenarioConfig = serde_yaml::from_reader(reader)?;
        Self::build_scenario(cfg)
    }

    /// One engine step, then fire any release that became due
    pub fn step(&mut self, options: StepOptions) -> Result<StepReport> {
        let report = self.engine.run_one_step(options)?;
        if options.dry_run {
            return Ok(report);
        }
        for i in 0..self.releases.len() {
            if self.releases[i].is_due(&self.engine) {
                let release = &mut self.releases[i];
                release.fired = true;
                self.engine.remove_constraint(release.constraint)?;
                info!(
                    constraint = %self.engine.constraint(release.constraint).name,
                    t = self.engine.time(),
                    "released"
                );
            }
        }
        Ok(report)
    }
}
