//! Error types for component group operations.

use thiserror::Error;

/// Errors raised by group kinematics and group data files.
#[derive(Error, Debug)]
pub enum GroupError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Singular matrix: {what}")]
    Singular { what: &'static str },

    #[error("Group data parse error at line {line}: {what}")]
    Parse { line: usize, what: String },

    #[error("No group record found before end of input")]
    EndOfInput,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type GroupResult<T> = Result<T, GroupError>;
