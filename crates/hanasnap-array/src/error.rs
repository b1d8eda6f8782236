//! Error types for the storage array client.

use std::time::Duration;

use thiserror::Error;

/// Result type for array operations.
pub type Result<T> = std::result::Result<T, ArrayError>;

/// Errors that can occur while talking to the storage array.
#[derive(Debug, Error)]
pub enum ArrayError {
    /// The array rejected the credentials or the session could not be opened.
    #[error("authentication to {endpoint} failed: {reason}")]
    Authentication {
        /// Array management endpoint.
        endpoint: String,
        /// The reason for the failure.
        reason: String,
    },

    /// The request could not be sent or the response not received.
    #[error("{operation} request failed: {reason}")]
    Transport {
        /// The operation being performed.
        operation: String,
        /// The reason for the failure.
        reason: String,
    },

    /// No volume on the array has the requested serial number.
    #[error("no volume with serial {serial}")]
    VolumeNotFound {
        /// The device serial that was looked up.
        serial: String,
    },

    /// The array rejected the snapshot request.
    #[error("snapshot of volume {volume} failed: {reason}")]
    SnapshotCreation {
        /// Array volume name.
        volume: String,
        /// The reason for the failure.
        reason: String,
    },

    /// The response body did not have the expected shape.
    #[error("unexpected {operation} response: {reason}")]
    InvalidResponse {
        /// The operation being performed.
        operation: String,
        /// What was wrong with the response.
        reason: String,
    },

    /// The request did not complete before its deadline.
    #[error("{operation} request timed out after {after:?}")]
    Timeout {
        /// The operation being performed.
        operation: String,
        /// The deadline that expired.
        after: Duration,
    },
}

impl ArrayError {
    /// Creates an authentication error.
    pub fn authentication(endpoint: impl Into<String>, reason: impl ToString) -> Self {
        Self::Authentication {
            endpoint: endpoint.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates a transport error.
    pub fn transport(operation: impl Into<String>, reason: impl ToString) -> Self {
        Self::Transport {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates a volume-not-found error.
    pub fn volume_not_found(serial: impl Into<String>) -> Self {
        Self::VolumeNotFound {
            serial: serial.into(),
        }
    }

    /// Creates a snapshot creation error.
    pub fn snapshot_creation(volume: impl Into<String>, reason: impl ToString) -> Self {
        Self::SnapshotCreation {
            volume: volume.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates an invalid response error.
    pub fn invalid_response(operation: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidResponse {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates a timeout error.
    pub fn timeout(operation: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            after,
        }
    }

    /// Maps a reqwest error, keeping deadline expiry distinct.
    pub(crate) fn from_reqwest(operation: &str, after: Duration, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout(operation, after)
        } else {
            Self::transport(operation, err)
        }
    }

    /// Returns true if this is a timeout error.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
