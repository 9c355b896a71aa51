//! Error types for mysql-easier.
//!
//! Every operation either resolves with a typed result or fails with exactly
//! one `DbError` variant. Driver failures carry a suggestion so callers can
//! decide how to recover (the crate itself never retries).

use crate::db::ConnectionState;
use thiserror::Error;

/// SQLSTATE reported by MySQL for deadlocks and serialization failures.
const SQLSTATE_DEADLOCK: &str = "40001";

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Pool has ended. Connections are not available.")]
    PoolEnded,

    #[error("Pool not configured")]
    NotConfigured,

    #[error("Pool has already been configured. End it before configuring a new one.")]
    AlreadyConfigured,

    #[error("Connection not available: connection {connection_id} is {state}")]
    ConnectionUnavailable {
        connection_id: String,
        state: ConnectionState,
    },

    #[error("Database error: {message}")]
    Driver {
        message: String,
        /// e.g., "23000" for a duplicate key
        sql_state: Option<String>,
        suggestion: String,
        retryable: bool,
    },

    #[error("Empty field set: {operation} on '{table}' needs at least one column")]
    EmptyFieldSet {
        operation: &'static str,
        table: String,
    },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },
}

impl DbError {
    /// Create a driver error with optional SQL state.
    pub fn driver(
        message: impl Into<String>,
        sql_state: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        let retryable = sql_state.as_deref() == Some(SQLSTATE_DEADLOCK);
        Self::Driver {
            message: message.into(),
            sql_state,
            suggestion: suggestion.into(),
            retryable,
        }
    }

    /// Create a driver error for a transient condition (lost connection,
    /// pool timeout) that a caller may retry.
    pub fn transient(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
            sql_state: None,
            suggestion: suggestion.into(),
            retryable: true,
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an empty field set error.
    pub fn empty_field_set(operation: &'static str, table: impl Into<String>) -> Self {
        Self::EmptyFieldSet {
            operation,
            table: table.into(),
        }
    }

    /// Create a connection unavailable error.
    pub fn connection_unavailable(connection_id: impl Into<String>, state: ConnectionState) -> Self {
        Self::ConnectionUnavailable {
            connection_id: connection_id.into(),
            state,
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Driver { suggestion, .. } => Some(suggestion),
            Self::PoolEnded => Some("Create or configure a new pool"),
            Self::NotConfigured => Some("Call configure() before requesting connections"),
            Self::ConnectionUnavailable { .. } => Some("Lease a fresh connection from the pool"),
            _ => None,
        }
    }

    /// SQLSTATE reported by the server, if any.
    pub fn sql_state(&self) -> Option<&str> {
        match self {
            Self::Driver { sql_state, .. } => sql_state.as_deref(),
            _ => None,
        }
    }

    /// Check if this error is worth retrying on a fresh connection.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Driver { retryable: true, .. })
    }
}

/// Convert sqlx errors to DbError.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::driver(
                msg.to_string(),
                None,
                "Check host, port, user, password and database settings",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                let suggestion = match db_err.kind() {
                    sqlx::error::ErrorKind::UniqueViolation => {
                        "A row with the same unique key already exists; consider upsert"
                    }
                    sqlx::error::ErrorKind::ForeignKeyViolation => {
                        "Check that referenced rows exist"
                    }
                    sqlx::error::ErrorKind::NotNullViolation => {
                        "Supply a value for every NOT NULL column"
                    }
                    _ => "Check the SQL syntax and referenced objects",
                };
                DbError::driver(db_err.message(), code, suggestion)
            }
            sqlx::Error::RowNotFound => DbError::driver(
                "No rows returned",
                None,
                "Verify the query conditions match existing data",
            ),
            sqlx::Error::PoolTimedOut => DbError::transient(
                "Timed out acquiring a connection from the pool",
                "Increase acquireTimeout or connectionLimit, or release connections sooner",
            ),
            sqlx::Error::PoolClosed => DbError::PoolEnded,
            sqlx::Error::Io(io_err) => DbError::transient(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => DbError::driver(
                format!("TLS error: {}", tls_err),
                None,
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => DbError::transient(
                format!("Protocol error: {}", msg),
                "Destroy this connection and lease a fresh one",
            ),
            sqlx::Error::ColumnNotFound(col) => DbError::driver(
                format!("Column not found: {}", col),
                None,
                "Check the column names in the query",
            ),
            sqlx::Error::ColumnDecode { index, source } => DbError::driver(
                format!("Failed to decode column {}: {}", index, source),
                None,
                "Check the column type",
            ),
            sqlx::Error::WorkerCrashed => DbError::transient(
                "Database worker crashed",
                "Destroy this connection and lease a fresh one",
            ),
            other => DbError::driver(
                format!("Unknown database error: {}", other),
                None,
                "Check the database driver configuration",
            ),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_ended_display_matches_driver_wording() {
        assert_eq!(
            DbError::PoolEnded.to_string(),
            "Pool has ended. Connections are not available."
        );
    }

    #[test]
    fn test_driver_suggestion() {
        let err = DbError::driver("Syntax error", Some("42000".to_string()), "Check SQL syntax");
        assert_eq!(err.suggestion(), Some("Check SQL syntax"));
        assert_eq!(err.sql_state(), Some("42000"));
    }

    #[test]
    fn test_deadlock_is_retryable() {
        let err = DbError::driver("Deadlock found", Some("40001".to_string()), "Retry");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_retryable_classification() {
        assert!(DbError::transient("lost", "reconnect").is_retryable());
        assert!(!DbError::driver("dup", Some("23000".to_string()), "upsert").is_retryable());
        assert!(!DbError::PoolEnded.is_retryable());
        assert!(!DbError::empty_field_set("insert", "users").is_retryable());
    }

    #[test]
    fn test_pool_closed_maps_to_pool_ended() {
        let err: DbError = sqlx::Error::PoolClosed.into();
        assert!(matches!(err, DbError::PoolEnded));
    }

    #[test]
    fn test_pool_timeout_maps_to_retryable_driver_error() {
        let err: DbError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, DbError::Driver { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_io_error_maps_to_driver() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err: DbError = sqlx::Error::Io(io).into();
        assert!(err.to_string().contains("refused"));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_connection_unavailable_display() {
        let err = DbError::connection_unavailable("conn_1", ConnectionState::Released);
        let msg = err.to_string();
        assert!(msg.contains("conn_1"));
        assert!(msg.contains("released"));
    }

    #[test]
    fn test_empty_field_set_display() {
        let err = DbError::empty_field_set("update_by_id", "users");
        assert!(err.to_string().contains("update_by_id"));
        assert!(err.to_string().contains("users"));
    }
}
