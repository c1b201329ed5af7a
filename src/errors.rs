// src/errors.rs

//! Crate-wide error aliases and helpers.
//!
//! Only configuration and plumbing failures are errors. Per-process spawn,
//! readiness and signal failures are recorded as outcomes in the reports
//! (see [`crate::supervisor::report`]).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcsetError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("State file error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ProcsetError>;
