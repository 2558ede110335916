//! Error type shared by the token lifecycle, request executor and
//! thermostat operations.

use thiserror::Error;

/// Every failure a public operation can report.
///
/// Transport and HTTP faults are reclassified at the request executor;
/// composite operations pass them through unchanged.
#[derive(Debug, Error)]
pub enum Error {
    /// No access token has ever been acquired.
    #[error("No valid access token available -- complete the authorization flow first")]
    NoToken,

    /// Token expired and there is nothing to refresh it with.
    #[error("No refresh token available -- complete the authorization flow again")]
    RefreshUnavailable,

    /// Connection, DNS, TLS or timeout failure with no HTTP response.
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Token endpoint unreachable during a code exchange or refresh.
    #[error("Failed to {action}: {source}")]
    TokenTransport {
        action: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// Non-2xx response. `message` is the structured error body when the
    /// server sent JSON, otherwise `HTTP <status>: <body>`.
    #[error("{message}")]
    Http { status: u16, message: String },

    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    /// Rejected locally before any request was made, or a lookup that
    /// found nothing (unknown device, account without locations).
    #[error("{0}")]
    Validation(String),

    /// Successful response whose body does not have the expected shape.
    #[error("Unexpected response shape: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Reading or writing the persisted token record failed.
    #[error("Token store error: {0}")]
    TokenStore(String),
}

impl Error {
    /// HTTP status for `Http` errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
