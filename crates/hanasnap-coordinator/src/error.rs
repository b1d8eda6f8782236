//! Error types for the coordinator.
//!
//! Per-volume failures are not errors: they are recorded on the volume's
//! [`VolumeSnapshotRecord`](hanasnap_core::VolumeSnapshotRecord) and lead to
//! an abandoned marker. The variants here end a run early.

use hanasnap_core::AbandonCause;
use thiserror::Error;

use crate::exit::ExitStatus;

/// Result type for coordinator operations.
pub type Result<T> = std::result::Result<T, CoordinatorError>;

/// Errors that end a coordinator run.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// Topology discovery failed; no marker was opened.
    #[error("topology discovery failed: {0}")]
    Discovery(String),

    /// The prepare statement failed; no marker was opened.
    #[error("cannot open backup marker: {0}")]
    MarkerOpen(String),

    /// The prepare statement succeeded but the marker could not be found in
    /// the backup catalog. It stays open on the database.
    #[error(
        "backup marker with comment '{comment}' was prepared but not found in the backup \
         catalog: {reason}; look up the prepared data snapshot in M_BACKUP_CATALOG and close \
         it manually"
    )]
    MarkerLoss {
        /// Comment the marker was prepared with.
        comment: String,
        /// Why the lookup failed.
        reason: String,
    },

    /// At least one volume failed. Recovered by abandoning the marker.
    #[error("volume failures: {failed}")]
    VolumeFailures {
        /// Number of volumes without a snapshot.
        failed: usize,
    },

    /// The confirm statement failed. Recovered by abandoning the marker.
    #[error("confirm of backup {backup_id} failed: {reason}")]
    Confirm {
        /// Backup id of the open marker.
        backup_id: String,
        /// The database error.
        reason: String,
    },

    /// Neither confirm nor abandon could close the marker.
    #[error("cannot close backup marker {backup_id}: {reason}; close it manually with: {guidance}")]
    MarkerClose {
        /// Backup id of the open marker.
        backup_id: String,
        /// The last close failure.
        reason: String,
        /// Statement the operator should run.
        guidance: String,
    },

    /// The coordinator configuration is invalid.
    #[error("invalid coordinator configuration: {0}")]
    Configuration(String),
}

impl CoordinatorError {
    /// Creates a discovery error.
    pub fn discovery(reason: impl ToString) -> Self {
        Self::Discovery(reason.to_string())
    }

    /// Creates a marker-open error.
    pub fn marker_open(reason: impl ToString) -> Self {
        Self::MarkerOpen(reason.to_string())
    }

    /// Creates a marker-loss error.
    pub fn marker_loss(comment: impl Into<String>, reason: impl ToString) -> Self {
        Self::MarkerLoss {
            comment: comment.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates a confirm error.
    pub fn confirm(backup_id: impl Into<String>, reason: impl ToString) -> Self {
        Self::Confirm {
            backup_id: backup_id.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates a marker-close error.
    pub fn marker_close(
        backup_id: impl Into<String>,
        reason: impl ToString,
        guidance: impl Into<String>,
    ) -> Self {
        Self::MarkerClose {
            backup_id: backup_id.into(),
            reason: reason.to_string(),
            guidance: guidance.into(),
        }
    }

    /// Returns true if a marker may have been left open on the database.
    pub fn is_unrecoverable(&self) -> bool {
        matches!(self, Self::MarkerLoss { .. } | Self::MarkerClose { .. })
    }

    /// Describes this error as the cause of an abandoned marker.
    pub fn abandon_cause(&self) -> AbandonCause {
        match self {
            Self::VolumeFailures { failed } => AbandonCause::VolumeFailures { failed: *failed },
            Self::Confirm { reason, .. } => AbandonCause::ConfirmFailed {
                reason: reason.clone(),
            },
            other => AbandonCause::Aborted {
                reason: other.to_string(),
            },
        }
    }

    /// Returns the process exit status for this error.
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            Self::Discovery(_) => ExitStatus::DiscoveryFailed,
            Self::MarkerOpen(_) => ExitStatus::MarkerOpenFailed,
            Self::VolumeFailures { .. } => ExitStatus::VolumeFailures,
            Self::MarkerLoss { .. } | Self::MarkerClose { .. } | Self::Confirm { .. } => {
                ExitStatus::Unrecoverable
            }
            Self::Configuration(_) => ExitStatus::ConfigError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_status_mapping() {
        assert_eq!(
            CoordinatorError::discovery("no rows").exit_status(),
            ExitStatus::DiscoveryFailed
        );
        assert_eq!(
            CoordinatorError::marker_open("denied").exit_status(),
            ExitStatus::MarkerOpenFailed
        );
        assert_eq!(
            CoordinatorError::marker_loss("c", "no rows").exit_status(),
            ExitStatus::Unrecoverable
        );
        assert!(CoordinatorError::marker_close("7", "x", "y").is_unrecoverable());
        assert!(!CoordinatorError::discovery("x").is_unrecoverable());
        assert_eq!(
            CoordinatorError::VolumeFailures { failed: 2 }.to_string(),
            "volume failures: 2"
        );
    }

    #[test]
    fn test_abandon_cause() {
        assert_eq!(
            CoordinatorError::VolumeFailures { failed: 3 }.abandon_cause(),
            AbandonCause::VolumeFailures { failed: 3 }
        );
        assert_eq!(
            CoordinatorError::confirm("7", "catalog locked").abandon_cause(),
            AbandonCause::ConfirmFailed {
                reason: "catalog locked".to_string()
            }
        );
        assert!(matches!(
            CoordinatorError::discovery("x").abandon_cause(),
            AbandonCause::Aborted { .. }
        ));
    }

    #[test]
    fn test_marker_close_message_carries_guidance() {
        let err = CoordinatorError::marker_close(
            "1700",
            "connection refused",
            "BACKUP DATA FOR FULL SYSTEM CLOSE SNAPSHOT BACKUP_ID 1700 UNSUCCESSFUL 'x'",
        );
        let message = err.to_string();
        assert!(message.contains("1700"));
        assert!(message.contains("close it manually"));
        assert!(message.contains("UNSUCCESSFUL"));
    }
}
