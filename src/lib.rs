pub mod simulation;
pub mod configuration;
pub mod benchmark;

pub use simulation::states::{Solid, SolidId, Constraint, ConstraintId, ConstraintKind, System};
pub use simulation::geometry::{NVec3, NMat3};
pub use simulation::error::SimError;
pub use simulation::equations::{Equation, EquationTerm, Unknown, UnknownFactor, Element};
pub use simulation::solver::{Solver, Solutions};
pub use simulation::engine::{Engine, EngineSettings, StepOptions, StepReport};
pub use simulation::params::{Parameters, DriftCoverage};
pub use simulation::scenario::Scenario;

pub use configuration::config::{IntegratorConfig, ParametersConfig, SolidConfig, ConstraintConfig, ScenarioConfig};

pub use benchmark::benchmark::{bench_solver, bench_step};
