//! SSH connection configuration.

use hanasnap_core::Credentials;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for SSH sessions to the data volume hosts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SshConfig {
    /// SSH port on every host.
    pub port: u16,

    /// Operating system user allowed to run `fsfreeze`.
    pub credentials: Credentials,

    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Deadline for a single remote command in seconds.
    pub command_timeout_secs: u64,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            port: 22,
            credentials: Credentials::new("root", ""),
            connect_timeout_secs: 10,
            command_timeout_secs: 60,
        }
    }
}

impl SshConfig {
    /// Returns the connect timeout as a Duration.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Returns the command deadline as a Duration.
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}
