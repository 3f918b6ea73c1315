use std::io;

use thiserror::Error;

use crate::blockchain::Invalid;

/// Errors raised by the chain core (factory + store).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// `tip()` before genesis was inserted: a startup-ordering bug.
    #[error("chain is empty")]
    EmptyChain,

    #[error("block rejected: {0}")]
    Rejected(#[from] Invalid),

    #[error("proof-of-work search cancelled")]
    Cancelled,
}

/// Reasons a peer session ends abnormally.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Peer sent a line that is not a decimal integer.
    #[error("{line:?} is not a number: {reason}")]
    Protocol { line: String, reason: String },

    #[error("line exceeds {max} bytes")]
    LineTooLong { max: usize },

    #[error(transparent)]
    Submit(#[from] SubmitError),
}

/// Failure of a build-and-append cycle that is not a plain rejection.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("block search task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}
