//! FlashArray REST 1.x client.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::config::FlashArrayConfig;
use crate::error::{ArrayError, Result};
use crate::snapshotter::VolumeSnapshotter;
use crate::volume::{find_volume, Snapshot, SnapshotRequest, Volume};

/// Snapshot client for a Pure Storage FlashArray.
///
/// Every [`snapshot`](VolumeSnapshotter::snapshot) call opens its own
/// authenticated session; nothing is cached between calls.
#[derive(Debug, Clone)]
pub struct FlashArrayClient {
    config: FlashArrayConfig,
}

/// An authenticated REST session.
struct ArraySession {
    http: Client,
    base_url: String,
    config: FlashArrayConfig,
}

#[derive(Debug, Deserialize)]
struct ApiToken {
    api_token: String,
}

impl FlashArrayClient {
    /// Creates a client with the given configuration.
    pub fn new(config: FlashArrayConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &FlashArrayConfig {
        &self.config
    }

    /// Lists all volumes on the array.
    pub async fn list_volumes(&self) -> Result<Vec<Volume>> {
        self.open_session().await?.list_volumes().await
    }

    async fn open_session(&self) -> Result<ArraySession> {
        let endpoint = self.config.endpoint.as_str();
        let http = Client::builder()
            .cookie_store(true)
            .danger_accept_invalid_certs(!self.config.verify_tls)
            .timeout(self.config.request_timeout())
            .build()
            .map_err(|e| ArrayError::transport("client setup", e))?;

        let session = ArraySession {
            http,
            base_url: self.config.base_url(),
            config: self.config.clone(),
        };

        let credentials = &self.config.credentials;
        let response = session
            .post(
                "authenticate",
                "auth/apitoken",
                &json!({ "username": credentials.user, "password": credentials.password }),
            )
            .await?;
        if !response.status().is_success() {
            return Err(ArrayError::authentication(endpoint, failure_text(response).await));
        }
        let token: ApiToken = response
            .json()
            .await
            .map_err(|e| ArrayError::invalid_response("authenticate", e))?;

        let response = session
            .post("authenticate", "auth/session", &json!({ "api_token": token.api_token }))
            .await?;
        if !response.status().is_success() {
            return Err(ArrayError::authentication(endpoint, failure_text(response).await));
        }

        debug!(endpoint, user = %credentials.user, "Array session opened");
        Ok(session)
    }
}

impl ArraySession {
    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn post(&self, operation: &str, path: &str, body: &serde_json::Value) -> Result<Response> {
        self.http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| ArrayError::from_reqwest(operation, self.config.request_timeout(), e))
    }

    async fn decode<T: DeserializeOwned>(&self, operation: &str, response: Response) -> Result<T> {
        response
            .json()
            .await
            .map_err(|e| ArrayError::from_reqwest(operation, self.config.request_timeout(), e))
    }

    async fn list_volumes(&self) -> Result<Vec<Volume>> {
        let operation = "list volumes";
        let response = self
            .http
            .get(self.url("volume"))
            .send()
            .await
            .map_err(|e| ArrayError::from_reqwest(operation, self.config.request_timeout(), e))?;

        if !response.status().is_success() {
            return Err(ArrayError::invalid_response(operation, failure_text(response).await));
        }
        self.decode(operation, response).await
    }

    async fn create_snapshot(&self, volume: &str, suffix: &str) -> Result<Snapshot> {
        let operation = "create snapshot";
        let body = serde_json::to_value(SnapshotRequest::new(volume, suffix))
            .map_err(|e| ArrayError::snapshot_creation(volume, e))?;

        let response = self.post(operation, "volume", &body).await?;
        if !response.status().is_success() {
            return Err(ArrayError::snapshot_creation(volume, failure_text(response).await));
        }

        let created: Vec<Snapshot> = self.decode(operation, response).await?;
        created
            .into_iter()
            .next()
            .ok_or_else(|| ArrayError::snapshot_creation(volume, "array returned no snapshot"))
    }
}

#[async_trait]
impl VolumeSnapshotter for FlashArrayClient {
    async fn snapshot(&self, volume_serial: &str, suffix: &str) -> Result<String> {
        let session = self.open_session().await?;
        let volumes = session.list_volumes().await?;

        let volume = find_volume(&volumes, volume_serial)
            .ok_or_else(|| ArrayError::volume_not_found(volume_serial))?;
        debug!(serial = volume_serial, volume = %volume.name, "Matched array volume");

        let snapshot = session.create_snapshot(&volume.name, suffix).await?;
        info!(
            volume = %volume.name,
            snapshot = %snapshot.name,
            snapshot_id = %snapshot.serial,
            "Array snapshot created"
        );

        Ok(snapshot.serial)
    }

    fn name(&self) -> &str {
        "flasharray"
    }
}

async fn failure_text(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if body.is_empty() {
        format!("HTTP {}", status)
    } else {
        format!("HTTP {}: {}", status, body.trim())
    }
}
