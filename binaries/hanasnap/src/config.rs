//! Command configuration.
//!
//! One TOML file with a section per collaborator. Every section is optional
//! and falls back to its defaults; CLI flags override file values.

use hanasnap_array::FlashArrayConfig;
use hanasnap_coordinator::CoordinatorConfig;
use hanasnap_db::HanaConfig;
use hanasnap_remote::SshConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete configuration of one snapshot run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapConfig {
    /// SQL connection settings.
    pub database: HanaConfig,

    /// SSH settings for the data volume hosts.
    pub remote: SshConfig,

    /// FlashArray management settings.
    pub array: FlashArrayConfig,

    /// Protocol settings.
    pub coordinator: CoordinatorConfig,

    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,

    /// Log format (pretty, json, compact).
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl SnapConfig {
    /// Loads configuration from a file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Merges CLI arguments into the configuration.
    pub fn merge_cli_args(&mut self, args: &super::CliArgs) {
        let db = &mut self.database;
        if let Some(ref host) = args.host_address {
            db.host = host.clone();
        }
        if let Some(ref domain) = args.domain_name {
            db.domain_name = Some(domain.clone());
        }
        if let Some(instance) = args.instance_number {
            db.instance_number = instance;
        }
        if let Some(ref name) = args.database_name {
            db.database_name = name.clone();
        }
        if let Some(port) = args.port {
            db.tenant_port = port;
        }
        if let Some(ref user) = args.database_user {
            db.credentials.user = user.clone();
        }
        if let Some(ref password) = args.database_password {
            db.credentials.password = password.clone();
        }

        if let Some(ref user) = args.os_user {
            self.remote.credentials.user = user.clone();
        }
        if let Some(ref password) = args.os_password {
            self.remote.credentials.password = password.clone();
        }

        if let Some(ref endpoint) = args.flash_array {
            self.array.endpoint = endpoint.clone();
        }
        if let Some(ref user) = args.flash_array_user {
            self.array.credentials.user = user.clone();
        }
        if let Some(ref password) = args.flash_array_password {
            self.array.credentials.password = password.clone();
        }
        if args.no_verify_tls {
            self.array.verify_tls = false;
        }

        if let Some(hosts) = args.max_concurrent_hosts {
            self.coordinator.max_concurrent_hosts = hosts;
        }

        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Validates the configuration.
    ///
    /// A dry run never touches the hosts or the array, so their settings are
    /// only checked for real runs.
    pub fn validate(&self, dry_run: bool) -> anyhow::Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!("Invalid log level: {}", self.logging.level);
        }

        let valid_formats = ["pretty", "json", "compact"];
        if !valid_formats.contains(&self.logging.format.to_lowercase().as_str()) {
            anyhow::bail!("Invalid log format: {}", self.logging.format);
        }

        let db = &self.database;
        if db.host.trim().is_empty() {
            anyhow::bail!("Database host address is required");
        }
        if db.instance_number > 99 {
            anyhow::bail!("Instance number must have two digits: {}", db.instance_number);
        }
        if db.tenant_port > 99 {
            anyhow::bail!("Tenant port must have two digits: {}", db.tenant_port);
        }
        if db.credentials.is_empty() {
            anyhow::bail!("Database user is required");
        }
        if db.statement_timeout_secs == 0 {
            anyhow::bail!("database.statement_timeout_secs must be positive");
        }

        if dry_run {
            return Ok(());
        }

        if self.remote.credentials.is_empty() {
            anyhow::bail!("Operating system user is required");
        }
        if self.remote.command_timeout_secs == 0 || self.remote.connect_timeout_secs == 0 {
            anyhow::bail!("remote timeouts must be positive");
        }

        if self.array.endpoint.trim().is_empty() {
            anyhow::bail!("FlashArray address is required");
        }
        if self.array.credentials.is_empty() {
            anyhow::bail!("FlashArray user is required");
        }
        if self.array.request_timeout_secs == 0 {
            anyhow::bail!("array.request_timeout_secs must be positive");
        }

        if self.coordinator.max_concurrent_hosts == 0 {
            anyhow::bail!("coordinator.max_concurrent_hosts must be at least 1");
        }
        if self.coordinator.snapshot_timeout_secs == 0 {
            anyhow::bail!("coordinator.snapshot_timeout_secs must be positive");
        }

        Ok(())
    }
}
