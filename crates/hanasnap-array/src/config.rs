//! Storage array configuration.

use hanasnap_core::Credentials;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the FlashArray management endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlashArrayConfig {
    /// Management address (`host`, `host:port` or `https://host`).
    pub endpoint: String,

    /// Array user allowed to create snapshots.
    pub credentials: Credentials,

    /// REST API version.
    pub api_version: String,

    /// Verify the array's TLS certificate.
    pub verify_tls: bool,

    /// Deadline for each REST request, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for FlashArrayConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            credentials: Credentials::new("pureuser", ""),
            api_version: "1.17".to_string(),
            verify_tls: true,
            request_timeout_secs: 30,
        }
    }
}

impl FlashArrayConfig {
    /// Returns the request deadline as a Duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Returns the versioned API base URL, defaulting to HTTPS.
    pub fn base_url(&self) -> String {
        let endpoint = self.endpoint.trim_end_matches('/');
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            format!("{}/api/{}", endpoint, self.api_version)
        } else {
            format!("https://{}/api/{}", endpoint, self.api_version)
        }
    }
}
