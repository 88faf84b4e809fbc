//! Error types for the simulation core.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("solid \"{0}\" has no constraint, which is not supported")]
    UnconstrainedSolid(String),

    #[error("no pivot ties the structure to the ground")]
    NoGroundPivot,

    #[error("axis of slider \"{0}\" must have a positive norm")]
    InvalidSliderAxis(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown solid: {0}")]
    UnknownSolid(String),

    #[error("unknown constraint: {0}")]
    UnknownConstraint(String),

    #[error("engine is not initialized, call initialize() first")]
    NotInitialized,

    #[error("engine is already initialized")]
    AlreadyInitialized,

    #[error("system has more unknowns than equations ({unknowns} > {equations})")]
    Overdetermined { unknowns: usize, equations: usize },

    #[error("system is hyperstatic, fewer unknowns than equations ({unknowns} < {equations})")]
    Underdetermined { unknowns: usize, equations: usize },

    #[error("singular {size}x{size} system, constraints are redundant or inconsistent")]
    Singular { size: usize },

    #[error("cannot merge solutions covering different unknowns")]
    SolutionMerge,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
