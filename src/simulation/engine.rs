//! Engine orchestrator
//!
//! Owns the solid/constraint arenas and runs the per-step pipeline:
//! assemble -> solve -> write back -> integrate (Euler or RK4) ->
//! drift-correct -> advance the clock.

use tracing::{debug, info};

use super::assembler::{expected_rows, EquationSet};
use super::chain::ChainTree;
use super::drift::{correct_drift, DriftReport};
use super::equations::Equation;
use super::error::{Result, SimError};
use super::integrator::{euler_integrator, rk4_integrator, solve_step};
use super::params::Parameters;
use super::solver::Solutions;
use super::states::{Constraint, ConstraintId, ConstraintKind, Solid, SolidId, System};

/// Everything needed to build an `Engine`
#[derive(Debug, Clone, Default)]
pub struct EngineSettings {
    pub solids: Vec<Solid>,
    pub constraints: Vec<Constraint>, // object ids index into `solids`
    pub parameters: Parameters,
}

/// Per-call options of `Engine::run_one_step`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepOptions {
    pub dry_run: bool, // solve only, do not advance time
    pub time_step: Option<f64>, // overrides `Parameters::time_step` for this call
}

impl StepOptions {
    pub fn dry_run() -> Self {
        Self { dry_run: true, time_step: None }
    }

    pub fn with_time_step(dt: f64) -> Self {
        Self { dry_run: false, time_step: Some(dt) }
    }
}

/// What one step did
#[derive(Debug, Clone, Default)]
pub struct StepReport {
    pub solutions: Solutions,
    pub equations: usize,
    pub drift: DriftReport,
}

pub struct Engine {
    system: System,
    parameters: Parameters,
    equations: EquationSet,
    initialized: bool,
    last_equation_count: usize,
}

impl Engine {
    /// Validate handles and slider axes, and record every constraint's world
    /// attachment point
    pub fn new(settings: EngineSettings) -> Result<Self> {
        let EngineSettings { solids, constraints, parameters } = settings;
        let mut engine = Self {
            system: System { solids, constraints: Vec::with_capacity(constraints.len()), t: 0.0 },
            equations: EquationSet::standard(parameters.gravity),
            parameters,
            initialized: false,
            last_equation_count: 0,
        };
        for c in constraints {
            engine.add_constraint(c)?;
        }
        Ok(engine)
    }

    /// Check every solid is held by a constraint and clear velocities and
    /// accelerations. Runs exactly once, before the first step.
    pub fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            return Err(SimError::AlreadyInitialized);
        }
        self.run_checks()?;
        for s in self.system.solids.iter_mut() {
            s.clear_kinematics();
        }
        self.initialized = true;
        info!(
            solids = self.system.solids.len(),
            constraints = self.system.active_constraints().count(),
            "engine initialized"
        );
        Ok(())
    }

    fn run_checks(&self) -> Result<()> {
        if let Some(s) = self.system.solid_ids().find(|id| self.system.constraints_of(*id).next().is_none()) {
            return Err(SimError::UnconstrainedSolid(self.system.solid(s).name.clone()));
        }
        Ok(())
    }

    /// Solve and, unless `dry_run`, integrate, drift-correct and advance time
    ///
    /// Entities are only written after the solve succeeded; on error the
    /// state is exactly as before the call.
    pub fn run_one_step(&mut self, options: StepOptions) -> Result<StepReport> {
        if !self.initialized {
            return Err(SimError::NotInitialized);
        }
        if options.dry_run {
            let solutions = solve_step(&mut self.system, &self.equations)?;
            self.last_equation_count = solutions.len();
            return Ok(StepReport { equations: solutions.len(), solutions, ..StepReport::default() });
        }

        let dt = options.time_step.unwrap_or(self.parameters.time_step);
        let solutions = if self.parameters.uses_runge_kutta() {
            rk4_integrator(&mut self.system, &self.equations, dt)?
        } else {
            euler_integrator(&mut self.system, &self.equations, dt)?
        };
        let drift = correct_drift(&mut self.system, self.parameters.drift);
        self.system.t += dt;
        self.last_equation_count = solutions.len();

        debug!(t = self.system.t, unknowns = solutions.len(), max_drift = drift.max_correction, "step done");
        Ok(StepReport { equations: solutions.len(), solutions, drift })
    }

    /// Add a constraint to the active set; it takes part from the next step
    pub fn add_constraint(&mut self, mut constraint: Constraint) -> Result<ConstraintId> {
        let n = self.system.solids.len();
        if constraint.object1.solid.0 >= n {
            return Err(SimError::UnknownSolid(constraint.object1.solid.to_string()));
        }
        if let Some(a2) = &constraint.object2 {
            if a2.solid.0 >= n {
                return Err(SimError::UnknownSolid(a2.solid.to_string()));
            }
        }
        if let ConstraintKind::Slider { axis } = &constraint.kind {
            if !(axis.norm() > 0.0) {
                return Err(SimError::InvalidSliderAxis(constraint.name));
            }
        }

        constraint.initial_position = self.system.attachment_world(&constraint.object1);
        constraint.active = true;
        let id = ConstraintId(self.system.constraints.len());
        info!(name = %constraint.name, kind = constraint.kind.label(), "constraint added");
        self.system.constraints.push(constraint);
        Ok(id)
    }

    /// Take a constraint out of the active set; its last loads are kept
    pub fn remove_constraint(&mut self, id: ConstraintId) -> Result<()> {
        let c = self
            .system
            .constraints
            .get_mut(id.0)
            .filter(|c| c.active)
            .ok_or_else(|| SimError::UnknownConstraint(id.to_string()))?;
        c.active = false;
        info!(name = %c.name, t = self.system.t, "constraint removed");
        Ok(())
    }

    /// Put every solid back to its construction pose at rest and zero the
    /// clock; the constraint set is kept as it is
    pub fn reset(&mut self) {
        for s in self.system.solids.iter_mut() {
            s.restore_initial();
        }
        for c in self.system.constraints.iter_mut() {
            c.clear_loads();
        }
        self.system.t = 0.0;
        info!("engine reset");
    }

    /// Elapsed simulated time
    pub fn time(&self) -> f64 {
        self.system.t
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn system(&self) -> &System {
        &self.system
    }

    pub fn solids(&self) -> &[Solid] {
        &self.system.solids
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.system.constraints
    }

    pub fn solid(&self, id: SolidId) -> &Solid {
        self.system.solid(id)
    }

    pub fn constraint(&self, id: ConstraintId) -> &Constraint {
        self.system.constraint(id)
    }

    pub fn find_solid(&self, name: &str) -> Option<SolidId> {
        self.system.find_solid(name)
    }

    pub fn find_constraint(&self, name: &str) -> Option<ConstraintId> {
        self.system.find_constraint(name)
    }

    /// Rows of the system solved by the last successful `run_one_step`
    pub fn last_equation_count(&self) -> usize {
        self.last_equation_count
    }

    /// Rows the next step will assemble
    pub fn expected_equation_count(&self) -> usize {
        expected_rows(&self.system)
    }

    /// Equations for the current state, without solving them
    pub fn assemble(&self) -> Vec<Equation> {
        self.equations.assemble(&self.system)
    }

    /// Pivot chains hanging from the ground, as drift correction walks them
    pub fn chain(&self) -> Result<ChainTree> {
        let tree = ChainTree::build(&self.system);
        if !tree.has_ground() {
            return Err(SimError::NoGroundPivot);
        }
        Ok(tree)
    }

    /// One drift-correction pass outside of a step
    pub fn correct_drift(&mut self) -> DriftReport {
        correct_drift(&mut self.system, self.parameters.drift)
    }
}
