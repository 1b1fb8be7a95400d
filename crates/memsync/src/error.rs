//! Error types for transport and sync operations.

/// Errors returned by transport implementations.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum TransportError {
    /// The request could not be sent or the connection failed.
    #[error("request failed: {0}")]
    Request(String),
    /// The server answered with a non-success status.
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },
    /// The response body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// Errors returned by coordinator mutation operations.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum SyncError {
    /// Rejected locally before any network call.
    #[error("validation failed: {0}")]
    Validation(String),
    /// The transport call failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}
