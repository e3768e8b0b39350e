use thiserror::Error;

/// Errors produced by backend collaborators.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The backend rejected or failed a request.
    #[error("Backend error: {0}")]
    Backend(String),

    /// The realtime transport failed to establish or keep a subscription.
    #[error("Realtime transport error: {0}")]
    Transport(String),

    /// A response body could not be decoded.
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ApiError>;
