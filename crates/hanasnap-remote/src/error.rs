//! Error types for remote command execution.

use std::time::Duration;

use thiserror::Error;

/// Result type for remote execution operations.
pub type Result<T> = std::result::Result<T, RemoteError>;

/// Errors that can occur while running commands on a data volume host.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The TCP connection or SSH handshake failed.
    #[error("failed to connect to {host}: {reason}")]
    Connect {
        /// Target host.
        host: String,
        /// The reason for the failure.
        reason: String,
    },

    /// The host rejected the configured credentials.
    #[error("authentication as {user} on {host} failed: {reason}")]
    Authentication {
        /// Target host.
        host: String,
        /// Login name.
        user: String,
        /// The reason for the failure.
        reason: String,
    },

    /// The command could not be started or its output could not be read.
    #[error("command `{command}` on {host} failed: {reason}")]
    Exec {
        /// Target host.
        host: String,
        /// The command line.
        command: String,
        /// The reason for the failure.
        reason: String,
    },

    /// The device serial number of a mount could not be determined.
    #[error("cannot resolve volume serial for {mount_path} on {host}: {reason}")]
    SerialResolution {
        /// Target host.
        host: String,
        /// Mount path being resolved.
        mount_path: String,
        /// The reason for the failure.
        reason: String,
    },

    /// Freezing the filesystem failed.
    #[error("freeze of {mount_path} on {host} failed: {reason}")]
    Freeze {
        /// Target host.
        host: String,
        /// Mount path.
        mount_path: String,
        /// The reason for the failure.
        reason: String,
    },

    /// Thawing the filesystem failed.
    #[error("unfreeze of {mount_path} on {host} failed: {reason}")]
    Unfreeze {
        /// Target host.
        host: String,
        /// Mount path.
        mount_path: String,
        /// The reason for the failure.
        reason: String,
    },

    /// The command did not complete before its deadline.
    #[error("command `{command}` on {host} timed out after {after:?}")]
    Timeout {
        /// Target host.
        host: String,
        /// The command line.
        command: String,
        /// The deadline that expired.
        after: Duration,
    },
}

impl RemoteError {
    /// Creates a connect error.
    pub fn connect(host: impl Into<String>, reason: impl ToString) -> Self {
        Self::Connect {
            host: host.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates an authentication error.
    pub fn authentication(
        host: impl Into<String>,
        user: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        Self::Authentication {
            host: host.into(),
            user: user.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates an exec error.
    pub fn exec(host: impl Into<String>, command: impl Into<String>, reason: impl ToString) -> Self {
        Self::Exec {
            host: host.into(),
            command: command.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates a serial resolution error.
    pub fn serial_resolution(
        host: impl Into<String>,
        mount_path: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::SerialResolution {
            host: host.into(),
            mount_path: mount_path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a freeze error.
    pub fn freeze(
        host: impl Into<String>,
        mount_path: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Freeze {
            host: host.into(),
            mount_path: mount_path.into(),
            reason: reason.into(),
        }
    }

    /// Creates an unfreeze error.
    pub fn unfreeze(
        host: impl Into<String>,
        mount_path: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Unfreeze {
            host: host.into(),
            mount_path: mount_path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a timeout error.
    pub fn timeout(host: impl Into<String>, command: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            host: host.into(),
            command: command.into(),
            after,
        }
    }

    /// Returns true if the deadline expired.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns true if the failure happened before the command ran, so the
    /// remote side is known to be untouched.
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, Self::Connect { .. } | Self::Authentication { .. })
    }
}
