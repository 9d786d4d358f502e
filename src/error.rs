use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type for the entire application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Chain read error: {0}")]
    Read(#[from] ReadError),

    #[error("Submission error: {0}")]
    Submit(#[from] SubmitError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Chain state read errors
#[derive(Error, Debug, Clone)]
pub enum ReadError {
    #[error("Transient read failure for {key}: {message}")]
    Transient { key: String, message: String },

    #[error("Failed to read {key} after {attempts} attempts: {last}")]
    RetriesExhausted {
        key: String,
        attempts: u32,
        last: String,
    },

    #[error("Unexpected value for {key}: {message}")]
    Malformed { key: String, message: String },
}

impl ReadError {
    pub fn transient(key: impl Into<String>, message: impl Into<String>) -> Self {
        ReadError::Transient {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Whether another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, ReadError::Transient { .. })
    }
}

/// Decoded reason a transaction failed inside a block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DispatchFailure {
    /// Module error resolved against chain metadata
    Module {
        section: String,
        method: String,
        docs: String,
    },
    /// BadOrigin, CannotLookup and friends carry no extra info
    Other(String),
}

impl fmt::Display for DispatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchFailure::Module {
                section,
                method,
                docs,
            } => write!(f, "{}.{}: {}", section, method, docs),
            DispatchFailure::Other(reason) => write!(f, "{}", reason),
        }
    }
}

/// Why a transaction never made it into a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DropReason {
    Dropped,
    Invalid,
    Usurped,
    Retracted,
    FinalityTimeout,
    StreamClosed,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            DropReason::Dropped => "dropped",
            DropReason::Invalid => "invalid",
            DropReason::Usurped => "usurped",
            DropReason::Retracted => "retracted",
            DropReason::FinalityTimeout => "finality timeout reported by node",
            DropReason::StreamClosed => "status stream closed before a terminal status",
        };
        write!(f, "{}", reason)
    }
}

/// Transaction submission errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("Dispatch failed in block {block_hash}: {failure}")]
    Dispatch {
        block_hash: String,
        failure: DispatchFailure,
    },

    #[error("Batch interrupted at item {index} in block {block_hash}: {failure}")]
    BatchInterrupted {
        block_hash: String,
        index: u32,
        failure: DispatchFailure,
    },

    #[error("Batch completed with errors in block {block_hash}")]
    BatchCompletedWithErrors { block_hash: String },

    #[error("Transaction not included: {0}")]
    NotIncluded(DropReason),

    #[error("Timed out after {0}s waiting for finality")]
    Timeout(u64),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl SubmitError {
    /// Partial failures of a batch wrapper, as opposed to a rejected extrinsic
    pub fn is_batch_partial_failure(&self) -> bool {
        matches!(
            self,
            SubmitError::BatchInterrupted { .. } | SubmitError::BatchCompletedWithErrors { .. }
        )
    }
}

/// Configuration errors, fatal at startup
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("No networks found for type: {0}")]
    NoMatchingNetworks(String),

    #[error("Unknown network type: {0}")]
    UnknownNetworkType(String),

    #[error("Missing secret: {0}")]
    MissingSecret(&'static str),

    #[error("Invalid value for {field} on network {network}: {message}")]
    Invalid {
        network: String,
        field: &'static str,
        message: String,
    },

    #[error("Invalid schedule: {0}")]
    Schedule(String),

    #[error("Failed to load chain snapshot {path}: {message}")]
    Snapshot { path: String, message: String },
}

/// Result type alias for the application
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for chain reads
pub type ReadResult<T> = Result<T, ReadError>;
