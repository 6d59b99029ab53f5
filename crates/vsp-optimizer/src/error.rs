//! Error types for the optimization driver.

use std::path::PathBuf;
use thiserror::Error;
use vsp_core::CoreError;
use vsp_groups::GroupError;
use vsp_solver::SolverError;

#[derive(Error, Debug)]
pub enum OptimizerError {
    #[error("Case file error at line {line}: {what}")]
    CaseFile { line: usize, what: String },

    #[error("Failed to read {path}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Too many {what}: {count} exceeds the limit of {limit}")]
    Capacity {
        what: &'static str,
        count: usize,
        limit: usize,
    },

    /// A call made out of the Setup → Solve → query order.
    #[error("Out of sequence: {what}")]
    Sequence { what: &'static str },

    #[error("Index out of range: {what} (index={index}, len={len})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("Invalid argument: {0}")]
    InvalidArg(String),

    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),

    #[error("Group error: {0}")]
    Group(#[from] GroupError),

    #[error("Core error: {0}")]
    Core(CoreError),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type OptimizerResult<T> = Result<T, OptimizerError>;

impl From<CoreError> for OptimizerError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::IndexOob { what, index, len } => {
                OptimizerError::IndexOutOfRange { what, index, len }
            }
            other => OptimizerError::Core(other),
        }
    }
}
