//! Error types for tvdesk
//!
//! Errors are split by where they can occur in a run:
//! - [`NetworkError`] - transport or HTTP status failures (catalog or icon requests)
//! - [`ProtocolError`] - the catalog answered, but not with the expected shape
//! - [`MalformedRecordError`] - a single catalog record cannot be turned into a launcher
//! - [`Error::FileWrite`] - the local filesystem refused a launcher or icon write
//!
//! Catalog-level errors abort the run. Everything else is contained at the
//! channel boundary and reported through [`crate::types::RunReport`].

use crate::types::{Failure, FailureKind};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for tvdesk operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for tvdesk
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "assets.max_concurrent_downloads")
        key: Option<String>,
    },

    /// Transport-level failure talking to the catalog or the asset host
    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    /// Unexpected catalog response shape
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Catalog record missing a required field
    #[error("malformed record: {0}")]
    MalformedRecord(#[from] MalformedRecordError),

    /// Local disk failure writing a launcher, an icon, or the output directory
    #[error("failed to write {path}: {source}")]
    FileWrite {
        /// The path that could not be written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The run was cancelled before this operation finished
    #[error("operation cancelled")]
    Cancelled,
}

/// Network errors for catalog and icon requests
#[derive(Debug, Error)]
pub enum NetworkError {
    /// Connection refused, DNS failure, timeout, or a broken body stream
    #[error("request to {url} failed: {source}")]
    Transport {
        /// The requested URL
        url: String,
        /// Underlying client error
        #[source]
        source: reqwest::Error,
    },

    /// The remote host answered with a non-success status
    #[error("{url} returned HTTP {status}")]
    Status {
        /// The requested URL
        url: String,
        /// HTTP status code
        status: u16,
    },
}

/// Catalog response errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The body is not valid JSON, or not the expected JSON
    #[error("invalid catalog response: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// A field on the response path is missing or has the wrong type
    #[error("catalog response has no list at `{path}`")]
    MissingField {
        /// Dotted path of the expected field (e.g., "data.queryChannel")
        path: String,
    },

    /// The GraphQL server reported errors and returned no data
    #[error("catalog query failed: {}", messages.join("; "))]
    GraphQl {
        /// Error messages reported by the server
        messages: Vec<String>,
    },
}

/// Per-record validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedRecordError {
    /// A required field is absent or empty
    #[error("required field `{field}` is missing or empty")]
    MissingField {
        /// Name of the missing field, as the catalog spells it
        field: &'static str,
    },

    /// The descriptor cannot be used as a file name
    #[error("descriptor {descriptor:?} is not a valid file name: {reason}")]
    InvalidDescriptor {
        /// The offending descriptor
        descriptor: String,
        /// Why it was rejected
        reason: &'static str,
    },

    /// Another record in the same catalog already uses this descriptor
    #[error("descriptor {descriptor:?} appears more than once in the catalog")]
    DuplicateDescriptor {
        /// The repeated descriptor
        descriptor: String,
    },
}

impl Error {
    /// Wrap an I/O error with the path it happened on
    pub fn file_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::FileWrite {
            path: path.into(),
            source,
        }
    }

    /// Build a transport error for `url`
    pub fn transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        Error::Network(NetworkError::Transport {
            url: url.into(),
            source,
        })
    }

    /// An HTTP client for the `key` config section could not be built
    ///
    /// No request was made, so this is reported as a configuration problem.
    pub fn http_client(key: &str, source: reqwest::Error) -> Self {
        Error::Config {
            message: format!("cannot build HTTP client: {}", source),
            key: Some(key.to_string()),
        }
    }

    /// Classify this error for reporting
    pub fn kind(&self) -> FailureKind {
        match self {
            Error::Config { .. } => FailureKind::Config,
            Error::Network(_) => FailureKind::Network,
            Error::Protocol(_) => FailureKind::Protocol,
            Error::MalformedRecord(_) => FailureKind::MalformedRecord,
            Error::FileWrite { .. } => FailureKind::FileWrite,
            Error::Cancelled => FailureKind::Cancelled,
        }
    }

    /// Machine-readable error code, stable across releases
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Network(e) => match e {
                NetworkError::Transport { .. } => "network_transport",
                NetworkError::Status { .. } => "network_status",
            },
            Error::Protocol(e) => match e {
                ProtocolError::InvalidJson(_) => "protocol_invalid_json",
                ProtocolError::MissingField { .. } => "protocol_missing_field",
                ProtocolError::GraphQl { .. } => "protocol_graphql",
            },
            Error::MalformedRecord(e) => match e {
                MalformedRecordError::MissingField { .. } => "record_missing_field",
                MalformedRecordError::InvalidDescriptor { .. } => "record_invalid_descriptor",
                MalformedRecordError::DuplicateDescriptor { .. } => "record_duplicate_descriptor",
            },
            Error::FileWrite { .. } => "file_write",
            Error::Cancelled => "cancelled",
        }
    }
}

impl From<&Error> for Failure {
    fn from(error: &Error) -> Self {
        Failure {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_variant() {
        let err = Error::from(MalformedRecordError::MissingField {
            field: "descriptor",
        });
        assert_eq!(err.kind(), FailureKind::MalformedRecord);
        assert_eq!(err.error_code(), "record_missing_field");

        let err = Error::Network(NetworkError::Status {
            url: "https://example.com".to_string(),
            status: 500,
        });
        assert_eq!(err.kind(), FailureKind::Network);
        assert_eq!(err.error_code(), "network_status");

        assert_eq!(Error::Cancelled.kind(), FailureKind::Cancelled);
    }

    #[test]
    fn test_file_write_message_includes_path() {
        let err = Error::file_write(
            "/tmp/out/irinn.desktop",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("/tmp/out/irinn.desktop"));
        assert!(msg.contains("denied"));
        assert_eq!(err.kind(), FailureKind::FileWrite);
    }

    #[tokio::test]
    async fn test_http_client_failure_is_config_error() {
        // Any reqwest error will do; nothing listens on port 1
        let source = reqwest::Client::new()
            .get("http://127.0.0.1:1/")
            .send()
            .await
            .unwrap_err();

        let err = Error::http_client("assets", source);
        assert_eq!(err.kind(), FailureKind::Config);
        assert_eq!(err.error_code(), "config_error");
        match err {
            Error::Config { key, message } => {
                assert_eq!(key.as_deref(), Some("assets"));
                assert!(message.starts_with("cannot build HTTP client"));
            }
            other => panic!("Expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn test_graphql_messages_joined() {
        let err = Error::from(ProtocolError::GraphQl {
            messages: vec!["first".to_string(), "second".to_string()],
        });
        assert_eq!(
            err.to_string(),
            "protocol error: catalog query failed: first; second"
        );
    }

    #[test]
    fn test_failure_from_error() {
        let err = Error::from(MalformedRecordError::DuplicateDescriptor {
            descriptor: "irinn".to_string(),
        });
        let failure = Failure::from(&err);
        assert_eq!(failure.kind, FailureKind::MalformedRecord);
        assert!(failure.message.contains("irinn"));
    }
}
