use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AeroStructError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Missing input: {what}")]
    MissingInput { what: &'static str },

    #[error("Invalid path: {path}")]
    InvalidPath { path: PathBuf },
}

pub type AeroStructResult<T> = Result<T, AeroStructError>;
