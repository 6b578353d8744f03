//! Error types for token acquisition and decoding.

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, OAuthError>;

/// Errors that can occur while obtaining or decoding tokens.
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    /// Network/HTTP error talking to the token endpoint.
    #[error("Network error: {0}")]
    Network(String),

    /// Token endpoint returned an error.
    #[error("Token endpoint error: {0}")]
    Backend(String),

    /// Invalid request parameters.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Access token could not be decoded into claims.
    #[error("Token decode error: {0}")]
    Decode(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<reqwest::Error> for OAuthError {
    fn from(e: reqwest::Error) -> Self {
        OAuthError::Network(e.to_string())
    }
}
