// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/fakesense

//! Error types for the synthetic sensor drivers

/// Result type alias
pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Driver error types
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// History buffer, class device, or bus advertisement could not be created
    #[error("allocation failed: {0}")]
    AllocationFailure(String),

    /// Caller's buffer cannot hold a single sample
    #[error("buffer holds {capacity} bytes, one sample needs {required}")]
    InsufficientBuffer {
        /// Bytes offered by the caller
        capacity: usize,
        /// Encoded size of one sample
        required: usize,
    },

    /// Lifecycle verb intentionally unsupported
    #[error("{0}: not implemented")]
    NotImplemented(&'static str),

    /// No driver registered under this name
    #[error("unknown driver '{0}'")]
    UnknownDriver(String),

    /// Command verb not recognized
    #[error("unrecognized command '{0}'")]
    UnknownVerb(String),

    /// Sample encode/decode failed
    #[error("sample encoding: {0}")]
    Encoding(#[from] bincode::Error),
}

impl DriverError {
    /// Informational results that should not fail a command
    pub fn is_benign(&self) -> bool {
        matches!(self, DriverError::NotImplemented(_))
    }
}
