//! Error types module
//!
//! All failures of the API client are unified under [`ClientError`]. Transport
//! faults are retried inside the request executor and only surface here once
//! the retry budget is spent; the resolution layer turns most variants into
//! absence and only lets session errors through to the caller.

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like a server-declared "not found"
    Debug,
    /// Warning level - for recoverable issues like an incomplete entity
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Cause of a single failed request attempt.
///
/// Every variant is retryable under the executor's policy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestFailure {
    #[error("retryable status {0}")]
    Status(u16),

    #[error("failed to decode response body: {0}")]
    Processing(String),

    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("transport error: {0}")]
    Transport(String),
}

impl RequestFailure {
    /// HTTP status attached to the failure, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            RequestFailure::Status(code) => Some(*code),
            RequestFailure::Processing(_) => Some(200),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: code={code:?} url={url} message={message}")]
    Request {
        code: Option<u16>,
        message: String,
        url: String,
        #[source]
        cause: RequestFailure,
    },

    #[error("server rejected {url} with status {status}: {detail}")]
    Domain {
        status: u16,
        detail: String,
        url: String,
    },

    #[error("session error: {0}")]
    Session(String),

    #[error("malformed {kind} document: {source}")]
    Malformed {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl ClientError {
    /// Wraps the cause of the last failed attempt once the retry budget is spent.
    pub fn request(url: impl Into<String>, cause: RequestFailure) -> Self {
        ClientError::Request {
            code: cause.status(),
            message: cause.to_string(),
            url: url.into(),
            cause,
        }
    }

    pub fn malformed(kind: &'static str, source: serde_json::Error) -> Self {
        ClientError::Malformed { kind, source }
    }

    /// Machine-readable error code (e.g., "REQUEST_FAILED")
    pub fn error_code(&self) -> &'static str {
        match self {
            ClientError::Request { .. } => "REQUEST_FAILED",
            ClientError::Domain { .. } => "DOMAIN_ERROR",
            ClientError::Session(_) => "SESSION_ERROR",
            ClientError::Malformed { .. } => "MALFORMED_DOCUMENT",
            ClientError::Config(_) => "CONFIG_ERROR",
            ClientError::Io(_) => "IO_ERROR",
        }
    }

    /// Whether retrying the same call later could succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ClientError::Request { .. } | ClientError::Io(_))
    }

    /// Whether the resolution layer may swallow this error and report absence.
    ///
    /// Session and configuration errors are caller mistakes and always propagate.
    pub fn is_absence(&self) -> bool {
        !matches!(self, ClientError::Session(_) | ClientError::Config(_))
    }

    /// Log level for this error
    pub fn log_level(&self) -> LogLevel {
        match self {
            ClientError::Domain { status, .. } if *status == 404 => LogLevel::Debug,
            ClientError::Domain { .. } | ClientError::Malformed { .. } => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }
}

/// Result type for API client operations
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_error_keeps_status_and_cause() {
        let err = ClientError::request("http://x/api", RequestFailure::Status(503));
        match &err {
            ClientError::Request {
                code, url, cause, ..
            } => {
                assert_eq!(*code, Some(503));
                assert_eq!(url, "http://x/api");
                assert_eq!(*cause, RequestFailure::Status(503));
            }
            other => panic!("unexpected variant {other:?}"),
        }
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.is_recoverable());
        assert_eq!(err.error_code(), "REQUEST_FAILED");
    }

    #[test]
    fn timeout_has_no_status_code() {
        let err = ClientError::request("http://x", RequestFailure::Timeout);
        assert!(matches!(err, ClientError::Request { code: None, .. }));
    }

    #[test]
    fn session_errors_are_not_absence() {
        assert!(!ClientError::Session("closed".into()).is_absence());
        assert!(ClientError::Domain {
            status: 403,
            detail: "forbidden".into(),
            url: "u".into()
        }
        .is_absence());
    }

    #[test]
    fn not_found_logs_at_debug() {
        let err = ClientError::Domain {
            status: 404,
            detail: "missing".into(),
            url: "u".into(),
        };
        assert_eq!(err.log_level(), LogLevel::Debug);
        assert!(!err.is_recoverable());
    }
}
