//! errors.rs - Custom error types for the curationgym-core library.
//!
//! This module defines a structured error enum for the library, providing
//! specific, actionable error types that can be handled programmatically.
//!
//! License: MIT OR Apache-2.0

use thiserror::Error;

/// All possible error kinds surfaced by `curationgym-core`.
///
/// `#[non_exhaustive]` signals to consumers that new variants may be added
/// in future versions, so they should not match all variants exhaustively.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CurationError {
    #[error("invalid policy configuration: {0}")]
    InvalidPolicy(String),

    #[error("operator configuration error: {0}")]
    OperatorConfig(String),

    #[error("reader failed to parse record: {0}")]
    MalformedInput(String),

    #[error("failed to serialize value for hashing/storage: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(String),

    #[error("artifact store error: {0}")]
    Storage(String),

    #[error("shard task '{task_id}' failed: {message}")]
    ShardFailure { task_id: String, message: String },

    #[error("artifact not found: {0}")]
    NotFound(String),

    #[error("an unexpected I/O error occurred: {0}")]
    Io(#[from] std::io::Error),

    #[error("a critical system error occurred: {0}")]
    AnyhowWrapper(#[from] anyhow::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, CurationError>;
