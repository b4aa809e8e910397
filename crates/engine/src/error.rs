//! Engine error type.

use thiserror::Error;

/// Error raised by a listener callback. Listener failures never abort the
/// row pass that triggered them; they are handed back to the caller once
/// the pending queue has drained.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum GridError {
    /// A configuration value or lookup argument was rejected.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The grid is not in a state that allows the operation.
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// A listener failed while a row was being applied.
    #[error("listener failed: {0}")]
    Listener(#[source] ListenerError),
}

impl GridError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        GridError::InvalidArgument(msg.into())
    }

    pub(crate) fn illegal(msg: impl Into<String>) -> Self {
        GridError::IllegalState(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, GridError>;
