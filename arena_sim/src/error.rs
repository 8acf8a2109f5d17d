//! Error types for the simulation harness.

use crate::oracle::OracleViolation;
use arena_core::ConfigError;
use arena_env::{EnvError, TickId};
use thiserror::Error;

/// Errors surfaced by the harness and CLI.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid arena config: {0}")]
    Config(#[from] ConfigError),

    #[error("environment error: {0}")]
    Env(#[from] EnvError),

    #[error("invalid fault profile: {0}")]
    InvalidFaults(String),

    #[error("unknown pairing policy: {0}")]
    UnknownPolicy(String),

    #[error("invariant broken at {tick}: {violation}")]
    Invariant {
        tick: TickId,
        violation: OracleViolation,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
