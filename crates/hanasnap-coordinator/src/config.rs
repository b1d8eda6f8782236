//! Coordinator configuration.

use hanasnap_core::naming::DEFAULT_SUFFIX_PREFIX;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings for the snapshot protocol itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// First component of every snapshot suffix.
    pub suffix_prefix: String,

    /// Hosts processed at the same time. Volumes on one host are always
    /// processed one after another.
    pub max_concurrent_hosts: usize,

    /// Deadline for one array snapshot request, in seconds.
    pub snapshot_timeout_secs: u64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            suffix_prefix: DEFAULT_SUFFIX_PREFIX.to_string(),
            max_concurrent_hosts: 1,
            snapshot_timeout_secs: 120,
        }
    }
}

impl CoordinatorConfig {
    /// Returns the snapshot deadline as a Duration.
    pub fn snapshot_timeout(&self) -> Duration {
        Duration::from_secs(self.snapshot_timeout_secs)
    }
}
