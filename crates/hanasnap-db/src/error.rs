//! Error types for database command execution.

use std::time::Duration;

use thiserror::Error;

/// Result type for database operations.
pub type Result<T> = std::result::Result<T, DatabaseError>;

/// Errors that can occur while executing statements against the database.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// The connection could not be established.
    #[error("cannot connect to {endpoint}: {reason}")]
    Connection {
        /// `host:port` of the SQL endpoint.
        endpoint: String,
        /// The reason for the failure.
        reason: String,
    },

    /// The database rejected the statement.
    #[error("statement failed: {reason} (statement: {statement})")]
    Command {
        /// The statement text.
        statement: String,
        /// The database-side error.
        reason: String,
    },

    /// A row could not be decoded into the expected shape.
    #[error("cannot decode row: {0}")]
    Decode(String),

    /// The connection or statement did not complete before its deadline.
    #[error("statement timed out after {after:?} (statement: {statement})")]
    Timeout {
        /// The statement text.
        statement: String,
        /// The deadline that expired.
        after: Duration,
    },

    /// No database driver is compiled into this build.
    #[error("no database driver available: {0}")]
    DriverUnavailable(String),
}

impl DatabaseError {
    /// Creates a connection error.
    pub fn connection(endpoint: impl Into<String>, reason: impl ToString) -> Self {
        Self::Connection {
            endpoint: endpoint.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates a command error.
    pub fn command(statement: impl Into<String>, reason: impl ToString) -> Self {
        Self::Command {
            statement: statement.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates a decode error.
    pub fn decode(reason: impl ToString) -> Self {
        Self::Decode(reason.to_string())
    }

    /// Creates a timeout error.
    pub fn timeout(statement: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            statement: statement.into(),
            after,
        }
    }

    /// Returns the failure without the statement text.
    pub fn reason(&self) -> String {
        match self {
            Self::Command { reason, .. } => reason.clone(),
            Self::Timeout { after, .. } => format!("timed out after {:?}", after),
            other => other.to_string(),
        }
    }

    /// Returns true if the statement never reached the database.
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::DriverUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DatabaseError::connection("hana1:30015", "connection refused");
        assert_eq!(err.to_string(), "cannot connect to hana1:30015: connection refused");

        let err = DatabaseError::command("SELECT 1", "insufficient privilege");
        assert!(err.to_string().contains("insufficient privilege"));
        assert_eq!(err.reason(), "insufficient privilege");
    }

    #[test]
    fn test_connection_failure_classification() {
        assert!(DatabaseError::connection("h:1", "x").is_connection_failure());
        assert!(DatabaseError::DriverUnavailable("x".into()).is_connection_failure());
        assert!(!DatabaseError::command("s", "x").is_connection_failure());
    }
}
