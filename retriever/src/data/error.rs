//! Error type for the query backends
//!
//! Configuration and transport failures are fatal to a call and reach the
//! caller unchanged. Row-level problems never show up here; the parser and
//! assembler absorb them and log a warning instead.

use thiserror::Error;

/// Error returned by query backends and the retriever built on them
#[derive(Error, Debug)]
pub enum DataError {
    /// Missing or inconsistent configuration, detected before any query runs
    #[error("Configuration error: {0}")]
    Config(String),

    /// The backend answered, but not with usable data
    #[error("Query failed on {backend}: {message}")]
    Transport {
        backend: &'static str,
        message: String,
    },

    /// The backend did not answer in time
    #[error("Query timeout after {timeout_secs}s on {backend}")]
    Timeout {
        backend: &'static str,
        timeout_secs: u64,
    },

    /// HTTP client error (connect, TLS, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error (spawning or talking to a child process)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DataError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a transport error attributed to a backend
    pub fn transport(backend: &'static str, msg: impl Into<String>) -> Self {
        Self::Transport {
            backend,
            message: msg.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(backend: &'static str, timeout_secs: u64) -> Self {
        Self::Timeout {
            backend,
            timeout_secs,
        }
    }

    /// Whether the error is a setup problem (credentials, identifiers, tooling)
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Check if this is a connection-related error that might be transient.
    ///
    /// The retriever never retries on its own; this is for callers that do.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Get the backend name that generated this error
    pub fn backend(&self) -> &'static str {
        match self {
            Self::Transport { backend, .. } | Self::Timeout { backend, .. } => backend,
            Self::Http(_) => "api-key",
            Self::Config(_) | Self::Io(_) => "unknown",
        }
    }
}
