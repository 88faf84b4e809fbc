pub mod geometry;
pub mod error;
pub mod states;
pub mod equations;
pub mod assembler;
pub mod solver;
pub mod params;
pub mod integrator;
pub mod chain;
pub mod drift;
pub mod engine;
pub mod scenario;
