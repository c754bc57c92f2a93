//! Error taxonomy for the knowledge graph subsystem.

use stackshift_core::GraphConfig;
use thiserror::Error;

/// Errors surfaced by the graph session and the operations built on it.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The store could not be reached at all (refused, timed out, DNS).
    #[error("graph store unreachable at {uri}: {detail}")]
    Unreachable { uri: String, detail: String },

    /// The store answered but rejected the credentials.
    #[error("authentication rejected for user '{username}': {detail}")]
    AuthRejected { username: String, detail: String },

    /// The store answered but the configured database does not exist.
    #[error("unknown database '{database}': {detail}")]
    UnknownDatabase { database: String, detail: String },

    /// The connection settings themselves were rejected by the driver.
    #[error("invalid connection configuration: {0}")]
    InvalidConfig(String),

    /// An operation was attempted without a live session.
    #[error("no active session to the graph store")]
    NotConnected,

    /// The store rejected a statement; `message` carries the store's raw
    /// error text for diagnosability.
    #[error("query failed: {message}")]
    Query { message: String },
}

impl GraphError {
    pub(crate) fn query(detail: impl std::fmt::Display) -> Self {
        GraphError::Query {
            message: detail.to_string(),
        }
    }
}

/// Classify a driver error raised while establishing or probing a session.
///
/// The driver does not expose stable variants separating auth failures from
/// routing failures, so classification keys off the error text.
pub(crate) fn classify_connect_error(
    err: impl std::fmt::Display,
    config: &GraphConfig,
) -> GraphError {
    let detail = err.to_string();
    let lowered = detail.to_lowercase();
    if lowered.contains("auth") || lowered.contains("unauthorized") || lowered.contains("credential")
    {
        GraphError::AuthRejected {
            username: config.username.clone(),
            detail,
        }
    } else if lowered.contains("database") {
        GraphError::UnknownDatabase {
            database: config.database.clone(),
            detail,
        }
    } else {
        GraphError::Unreachable {
            uri: config.uri.clone(),
            detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_auth_failure() {
        let config = GraphConfig::default();
        let err = classify_connect_error("Neo.ClientError.Security.Unauthorized", &config);
        assert!(matches!(err, GraphError::AuthRejected { .. }));
    }

    #[test]
    fn test_classify_unknown_database() {
        let config = GraphConfig {
            database: "missing".to_string(),
            ..Default::default()
        };
        let err = classify_connect_error("database does not exist", &config);
        match err {
            GraphError::UnknownDatabase { database, .. } => assert_eq!(database, "missing"),
            other => panic!("unexpected classification: {other}"),
        }
    }

    #[test]
    fn test_classify_unreachable_default() {
        let config = GraphConfig::default();
        let err = classify_connect_error("connection refused", &config);
        match err {
            GraphError::Unreachable { uri, .. } => assert_eq!(uri, "bolt://localhost:7687"),
            other => panic!("unexpected classification: {other}"),
        }
    }

    #[test]
    fn test_query_error_keeps_raw_text() {
        let err = GraphError::query("Neo.ClientError.Schema.ConstraintValidationFailed: boom");
        assert_eq!(
            err.to_string(),
            "query failed: Neo.ClientError.Schema.ConstraintValidationFailed: boom"
        );
    }
}
