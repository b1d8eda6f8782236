//! Database connection configuration.

use hanasnap_core::Credentials;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for SQL connections to the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HanaConfig {
    /// Host address of any worker in the cluster.
    pub host: String,

    /// Domain name appended to the short host names the database reports.
    pub domain_name: Option<String>,

    /// Two-digit instance number; the middle digits of every SQL port.
    pub instance_number: u8,

    /// Two-digit port selector of the tenant database (last digits of its
    /// SQL port, typically 15 or 41).
    pub tenant_port: u8,

    /// Database or tenant name.
    pub database_name: String,

    /// Database principal allowed to create storage snapshots.
    pub credentials: Credentials,

    /// Deadline for connecting and executing one statement, in seconds.
    pub statement_timeout_secs: u64,
}

impl Default for HanaConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            domain_name: None,
            instance_number: 0,
            tenant_port: 15,
            database_name: String::new(),
            credentials: Credentials::new("SYSTEM", ""),
            statement_timeout_secs: 120,
        }
    }
}

impl HanaConfig {
    /// Returns the statement deadline as a Duration.
    pub fn statement_timeout(&self) -> Duration {
        Duration::from_secs(self.statement_timeout_secs)
    }

    /// Qualifies a short host name with the configured domain.
    ///
    /// Names that already contain a dot, and all names when no domain is
    /// configured, are returned unchanged.
    pub fn qualify_host(&self, host: &str) -> String {
        match self.domain_name.as_deref().map(|d| d.trim_matches('.')) {
            Some(domain) if !domain.is_empty() && !host.contains('.') => {
                format!("{}.{}", host, domain)
            }
            _ => host.to_string(),
        }
    }
}
