//! Runner errors

use crate::config::ConfigError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Runtime task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("{0}")]
    Usage(String),
}
