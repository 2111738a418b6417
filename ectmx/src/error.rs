//! Error types for the map exchange client

/// Result type alias for map exchange operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to the map exchange
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport failure, timeout or non-2xx status
    #[error("Map exchange unavailable: {0}")]
    RemoteUnavailable(String),

    /// Payload absent or malformed (e.g. missing `results` field)
    #[error("Invalid map exchange response: {0}")]
    InvalidResponse(String),

    /// Search filters that cannot produce a valid query
    #[error("Invalid search filter: {0}")]
    InvalidFilter(String),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Configuration error (from ecconfig/anyhow)
    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::RemoteUnavailable(format!("request timed out: {}", err))
        } else {
            Self::RemoteUnavailable(err.to_string())
        }
    }
}

impl Error {
    /// Create a remote-unavailable error
    pub fn remote_unavailable(msg: impl Into<String>) -> Self {
        Self::RemoteUnavailable(msg.into())
    }

    /// Create an invalid-response error
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Whether the failure comes from the transport layer (retrying later may help)
    pub fn is_remote_unavailable(&self) -> bool {
        matches!(self, Self::RemoteUnavailable(_))
    }
}
