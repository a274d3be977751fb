//! Error handling for the pool proxy
//!
//! One crate-wide error type covering template decoding, difficulty math,
//! upstream communication and storage. Share classification does not use this
//! type; see [`crate::share::ShareOutcome`].

use thiserror::Error;

/// Result type alias for pool proxy operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the pool proxy
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP transport errors talking to the upstream node
    #[error("HTTP request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML configuration parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Malformed hex input
    #[error("Invalid encoding: {message}")]
    InvalidEncoding { message: String },

    /// Difficulty outside the accepted range
    #[error("Invalid difficulty: {message}")]
    InvalidDifficulty { message: String },

    /// Target that cannot be used for comparison or division
    #[error("Invalid target: {message}")]
    InvalidTarget { message: String },

    /// Upstream template fields that fail to decode
    #[error("Malformed block template: {message}")]
    MalformedTemplate { message: String },

    /// JSON-RPC level errors reported by the upstream node
    #[error("RPC error from {upstream}: {message}")]
    Rpc { upstream: String, message: String },

    /// Non-success HTTP status without a JSON-RPC body
    #[error("HTTP {status} from {upstream}")]
    HttpStatus { upstream: String, status: u16 },

    /// Share storage errors
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// Timeout errors
    #[error("Operation timed out: {operation}")]
    Timeout { operation: String },

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid encoding error
    pub fn invalid_encoding(message: impl Into<String>) -> Self {
        Self::InvalidEncoding {
            message: message.into(),
        }
    }

    /// Create an invalid difficulty error
    pub fn invalid_difficulty(message: impl Into<String>) -> Self {
        Self::InvalidDifficulty {
            message: message.into(),
        }
    }

    /// Create an invalid target error
    pub fn invalid_target(message: impl Into<String>) -> Self {
        Self::InvalidTarget {
            message: message.into(),
        }
    }

    /// Create a malformed template error
    pub fn malformed_template(message: impl Into<String>) -> Self {
        Self::MalformedTemplate {
            message: message.into(),
        }
    }

    /// Create an RPC error
    pub fn rpc(upstream: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rpc {
            upstream: upstream.into(),
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    /// Create a generic error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Network(e) => {
                if let Some(status) = e.status() {
                    status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS
                } else {
                    e.is_timeout() || e.is_connect() || e.is_request()
                }
            }
            Error::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            Error::Timeout { .. } => true,
            Error::Io(_) => true,
            _ => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Error::Network(_) => "network",
            Error::Json(_) => "json",
            Error::Toml(_) => "toml",
            Error::Io(_) => "io",
            Error::Config { .. } => "config",
            Error::InvalidEncoding { .. } => "invalid_encoding",
            Error::InvalidDifficulty { .. } => "invalid_difficulty",
            Error::InvalidTarget { .. } => "invalid_target",
            Error::MalformedTemplate { .. } => "malformed_template",
            Error::Rpc { .. } => "rpc",
            Error::HttpStatus { .. } => "http_status",
            Error::Storage { .. } => "storage",
            Error::Timeout { .. } => "timeout",
            Error::Other(_) => "other",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("missing upstream");
        assert_eq!(err.to_string(), "Configuration error: missing upstream");

        let err = Error::rpc("main", "method not found");
        assert_eq!(err.to_string(), "RPC error from main: method not found");
    }

    #[test]
    fn test_error_conversions() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));

        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_retryable() {
        assert!(Error::timeout("getblocktemplate").is_retryable());
        assert!(!Error::malformed_template("bad bits").is_retryable());
        assert!(!Error::rpc("main", "rejected").is_retryable());
        assert!(Error::HttpStatus {
            upstream: "main".into(),
            status: 503
        }
        .is_retryable());
        assert!(!Error::HttpStatus {
            upstream: "main".into(),
            status: 401
        }
        .is_retryable());
    }

    #[test]
    fn test_category() {
        assert_eq!(Error::invalid_target("zero").category(), "invalid_target");
        assert_eq!(Error::storage("down").category(), "storage");
    }
}
