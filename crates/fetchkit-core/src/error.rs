//! Error types for the fetchkit core library
//!
//! This module defines the error handling system for fetchkit, using
//! thiserror for ergonomic error definitions and anyhow for flexible error
//! sources. HTTP failures map to a fixed taxonomy: the six well-known
//! status codes get dedicated variants, everything else in 4xx/5xx falls
//! back to the generic [`Error::Http`] variant.

use thiserror::Error;

/// Main error type for fetchkit operations
#[derive(Error, Debug)]
pub enum Error {
    /// Transport could not reach the remote host
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// Connect or read deadline exceeded
    #[error("Timeout: {message}")]
    Timeout { message: String },

    /// Response body could not be decoded into the requested shape
    #[error("Parse error: {message}")]
    Parse {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// HTTP 400
    #[error("Bad request (HTTP 400): {message}")]
    BadRequest {
        message: String,
        body: Option<String>,
    },

    /// HTTP 401
    #[error("Unauthorized (HTTP 401): {message}")]
    Unauthorized {
        message: String,
        body: Option<String>,
    },

    /// HTTP 403
    #[error("Forbidden (HTTP 403): {message}")]
    Forbidden {
        message: String,
        body: Option<String>,
    },

    /// HTTP 404
    #[error("Not found (HTTP 404): {message}")]
    NotFound {
        message: String,
        body: Option<String>,
    },

    /// HTTP 500
    #[error("Internal server error (HTTP 500): {message}")]
    InternalServerError {
        message: String,
        body: Option<String>,
    },

    /// HTTP 503
    #[error("Service unavailable (HTTP 503): {message}")]
    ServiceUnavailable {
        message: String,
        body: Option<String>,
    },

    /// Any other 4xx/5xx status
    #[error("HTTP error {status}: {message}")]
    Http {
        status: u16,
        message: String,
        body: Option<String>,
    },

    /// Raised after a 401 whose token refresh attempt failed. Distinct from
    /// [`Error::Unauthorized`]: this variant means recovery was already
    /// attempted and did not succeed.
    #[error("Authentication required: {message}")]
    AuthenticationRequired { message: String },

    /// Cache store/remove I/O failures
    #[error("Cache storage error: {message}")]
    CacheStorage {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// Client or request configuration errors
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Map an unsuccessful HTTP status to its typed error.
    ///
    /// Exact matches for 400/401/403/404/500/503; every other status lands
    /// on the generic [`Error::Http`] variant carrying the numeric code.
    pub fn from_status(status: u16, body: Option<String>) -> Self {
        match status {
            400 => Error::BadRequest {
                message: "the server rejected the request".to_string(),
                body,
            },
            401 => Error::Unauthorized {
                message: "authentication credentials are missing or invalid".to_string(),
                body,
            },
            403 => Error::Forbidden {
                message: "the credential does not grant access to this resource".to_string(),
                body,
            },
            404 => Error::NotFound {
                message: "the requested resource does not exist".to_string(),
                body,
            },
            500 => Error::InternalServerError {
                message: "the server failed to process the request".to_string(),
                body,
            },
            503 => Error::ServiceUnavailable {
                message: "the server is temporarily unable to serve requests".to_string(),
                body,
            },
            other => Error::Http {
                status: other,
                message: format!("request failed with status {}", other),
                body,
            },
        }
    }

    /// HTTP status code carried by this error, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::BadRequest { .. } => Some(400),
            Error::Unauthorized { .. } => Some(401),
            Error::Forbidden { .. } => Some(403),
            Error::NotFound { .. } => Some(404),
            Error::InternalServerError { .. } => Some(500),
            Error::ServiceUnavailable { .. } => Some(503),
            Error::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Response body carried by this error, if the server sent one
    pub fn error_body(&self) -> Option<&str> {
        match self {
            Error::BadRequest { body, .. }
            | Error::Unauthorized { body, .. }
            | Error::Forbidden { body, .. }
            | Error::NotFound { body, .. }
            | Error::InternalServerError { body, .. }
            | Error::ServiceUnavailable { body, .. }
            | Error::Http { body, .. } => body.as_deref(),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Parse {
            message: err.to_string(),
            source: Some(anyhow::Error::new(err)),
        }
    }
}
