//! Error types for mesh handling and aerodynamic solves.

use thiserror::Error;
use vsp_core::CoreError;
use vsp_groups::GroupError;

/// Errors that can occur while building or solving an aerodynamic case.
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("Mesh parse error at line {line}: {what}")]
    MeshParse { line: usize, what: String },

    #[error("Invalid mesh: {what}")]
    InvalidMesh { what: String },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: String },

    #[error("Compressibility correction undefined for Mach {mach}")]
    Supersonic { mach: f64 },

    #[error("Linear solve failed: {what}")]
    Singular { what: String },

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Group error: {0}")]
    Group(#[from] GroupError),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SolverResult<T> = Result<T, SolverError>;
