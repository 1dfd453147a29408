//! Centralized error types for graphpull.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// All errors produced by the graphpull library.
#[derive(Error, Debug)]
pub enum GraphError {
    /// The API answered with a non-success, non-429 status.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// The API answered 429; the caller should wait and retry the same request.
    #[error("rate limited, retry after {}s", .retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    /// Connection, TLS, timeout, or body-read failure from the HTTP layer.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A request URL could not be built or parsed.
    #[error("invalid URL: {0}")]
    BadUrl(#[from] url::ParseError),

    /// The response body was not the JSON shape we expected.
    #[error("malformed API response: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error with the associated output path.
    #[error("I/O error writing '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A message lacked a field required to export it.
    #[error("message is missing required field '{0}'")]
    MissingField(&'static str),

    /// Attachment content was not valid base64.
    #[error("attachment content is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),

    /// The bearer token contains bytes that cannot go into an HTTP header.
    #[error("token is not a valid header value")]
    InvalidToken,
}

/// Convenience alias for `Result<T, GraphError>`.
pub type Result<T> = std::result::Result<T, GraphError>;

impl GraphError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Allow `?` on `std::io::Error` inside functions returning `GraphError`
/// when no path context is available (rare — prefer `GraphError::io`).
impl From<std::io::Error> for GraphError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}
