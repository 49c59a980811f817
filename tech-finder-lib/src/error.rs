//! Error handling for technology discovery runs.
//!
//! Two tiers of failure exist. Configuration and sink errors abort a run and
//! propagate to the caller. Everything that goes wrong while looking up a
//! single domain is converted into an error record by the processor and
//! never leaves the loop.

use std::fmt;
use std::time::Duration;

/// Main error type for tech-finder operations.
#[derive(Debug, Clone)]
pub enum TechFinderError {
    /// Missing or invalid run configuration
    ConfigError { message: String },

    /// Network-related errors (connection, DNS, TLS, etc.)
    NetworkError {
        message: String,
        source: Option<String>,
    },

    /// The lookup API answered with a non-success status
    ApiError {
        domain: String,
        message: String,
        status_code: Option<u16>,
    },

    /// JSON / TOML parsing errors
    ParseError {
        message: String,
        content: Option<String>,
    },

    /// File I/O errors when reading inputs or writing outputs
    FileError { path: String, message: String },

    /// The lookup did not complete in time
    Timeout {
        operation: String,
        duration: Duration,
    },

    /// The output sink refused a record
    SinkError { message: String },

    /// Generic internal errors that don't fit other categories
    Internal { message: String },
}

impl TechFinderError {
    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new network error.
    pub fn network<M: Into<String>>(message: M) -> Self {
        Self::NetworkError {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new network error with source information.
    pub fn network_with_source<M: Into<String>, S: Into<String>>(message: M, source: S) -> Self {
        Self::NetworkError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a new API error with HTTP status code.
    pub fn api_with_status<D: Into<String>, M: Into<String>>(
        domain: D,
        message: M,
        status_code: u16,
    ) -> Self {
        Self::ApiError {
            domain: domain.into(),
            message: message.into(),
            status_code: Some(status_code),
        }
    }

    /// Create a new parse error.
    pub fn parse<M: Into<String>>(message: M) -> Self {
        Self::ParseError {
            message: message.into(),
            content: None,
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout<O: Into<String>>(operation: O, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a new sink error.
    pub fn sink<M: Into<String>>(message: M) -> Self {
        Self::SinkError {
            message: message.into(),
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// The bare message, without the category prefix used by `Display`.
    ///
    /// This is what ends up in the `error` field of a result record.
    pub fn message(&self) -> String {
        match self {
            Self::ConfigError { message }
            | Self::NetworkError { message, .. }
            | Self::ApiError { message, .. }
            | Self::ParseError { message, .. }
            | Self::FileError { message, .. }
            | Self::SinkError { message }
            | Self::Internal { message } => message.clone(),
            Self::Timeout { operation, duration } => {
                format!("{} timed out after {:?}", operation, duration)
            }
        }
    }
}

impl fmt::Display for TechFinderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            Self::NetworkError { message, source } => {
                if let Some(source) = source {
                    write!(f, "Network error: {} (source: {})", message, source)
                } else {
                    write!(f, "Network error: {}", message)
                }
            }
            Self::ApiError {
                domain,
                message,
                status_code,
            } => {
                if let Some(code) = status_code {
                    write!(f, "API error for '{}' (HTTP {}): {}", domain, code, message)
                } else {
                    write!(f, "API error for '{}': {}", domain, message)
                }
            }
            Self::ParseError { message, content: _ } => {
                write!(f, "Parse error: {}", message)
            }
            Self::FileError { path, message } => {
                write!(f, "File error at '{}': {}", path, message)
            }
            Self::Timeout {
                operation,
                duration,
            } => {
                write!(f, "Timeout after {:?} during: {}", duration, operation)
            }
            Self::SinkError { message } => {
                write!(f, "Output error: {}", message)
            }
            Self::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for TechFinderError {}

impl From<reqwest::Error> for TechFinderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout("HTTP request", crate::protocols::tomba::DEFAULT_TIMEOUT)
        } else if err.is_connect() {
            Self::network_with_source("Connection failed", err.to_string())
        } else if err.is_decode() {
            Self::parse(format!("Failed to decode API response: {}", err))
        } else {
            Self::network_with_source("HTTP request failed", err.to_string())
        }
    }
}

impl From<serde_json::Error> for TechFinderError {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError {
            message: format!("JSON parsing failed: {}", err),
            content: None,
        }
    }
}

impl From<std::io::Error> for TechFinderError {
    fn from(err: std::io::Error) -> Self {
        Self::internal(format!("I/O error: {}", err))
    }
}
