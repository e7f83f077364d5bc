//! Common error types for SDLS.

use thiserror::Error;

/// Result type alias using the SDLS error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for SDLS construction and configuration.
///
/// Per-frame verification outcomes are not errors; see
/// `sdls_crypto::VerificationStatus`.
#[derive(Debug, Error)]
pub enum Error {
    /// Key material does not have the length the cipher suite requires
    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// Hex decoding of key or sequence number material failed
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a serialization error from any displayable type.
    pub fn serialization(msg: impl std::fmt::Display) -> Self {
        Self::Serialization(msg.to_string())
    }

    /// Create a config error from any displayable type.
    pub fn config(msg: impl std::fmt::Display) -> Self {
        Self::Config(msg.to_string())
    }
}
