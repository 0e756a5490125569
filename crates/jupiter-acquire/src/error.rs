//! Error types for course acquisition

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while configuring, fetching, or extracting course pages.
#[derive(Debug, Error)]
pub enum Error {
    /// No course codes were configured
    #[error("no course codes to process: add codes on the command line or with --codes-file")]
    EmptyBatch,

    /// Endpoint template could not be parsed as a URL
    #[error("invalid endpoint URL '{endpoint}'")]
    InvalidEndpoint {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },

    /// Failed to build HTTP client
    #[error("failed to create HTTP client")]
    Client(#[source] reqwest::Error),

    /// Server answered with a non-success status
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// Request exceeded the per-request timeout
    #[error("request to {url} timed out")]
    Timeout { url: String },

    /// Could not connect (DNS, refused, TLS)
    #[error("failed to connect to {url}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Any other transport-level failure
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    /// Response body could not be treated as markup
    #[error("could not parse page for {code}: {reason}")]
    Parse { code: String, reason: String },
}

impl Error {
    /// Classify a reqwest error for the given request URL.
    pub fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout { url: url.to_string() }
        } else if err.is_connect() {
            Error::Connect {
                url: url.to_string(),
                source: err,
            }
        } else if let Some(status) = err.status() {
            Error::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else {
            Error::Request {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }

    /// Network, timeout, or status failure for a single code.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Status { .. } | Error::Timeout { .. } | Error::Connect { .. } | Error::Request { .. }
        )
    }

    /// Failures that only affect one code; the batch keeps going.
    pub fn is_recoverable(&self) -> bool {
        self.is_transport() || matches!(self, Error::Parse { .. })
    }
}

/// Failure of a single output writer.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to write {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize course records")]
    Serialize(#[from] serde_json::Error),
}

impl OutputError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        OutputError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
