//! Topology discovery.
//!
//! Finds the deployment mode, the endpoint administrative statements must go
//! to, and every data volume in the cluster.

use hanasnap_core::{ClusterTopology, DeploymentMode, VolumeLocation};
use hanasnap_db::statements::{
    AttachedStorageRow, ModeRow, NameServerRow, ATTACHED_DATA_VOLUMES, DEPLOYMENT_MODE,
    MASTER_NAMESERVER,
};
use hanasnap_db::{Database, Endpoint, HanaConfig, PortSelector};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{CoordinatorError, Result};

/// What discovery found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discovery {
    /// Single- or multi-tenant.
    pub mode: DeploymentMode,

    /// Data volumes in discovery order.
    pub topology: ClusterTopology,

    /// Where marker statements are sent.
    pub endpoint: Endpoint,
}

/// Runs the discovery queries against the configured tenant endpoint.
pub struct TopologyDiscoverer {
    tenant: Database,
    config: HanaConfig,
}

impl TopologyDiscoverer {
    /// Creates a discoverer. `tenant` must be bound to the configured host
    /// and tenant port.
    pub fn new(tenant: Database, config: HanaConfig) -> Self {
        Self { tenant, config }
    }

    /// Returns the endpoint of the configured host and tenant port.
    pub fn tenant_endpoint(config: &HanaConfig) -> Endpoint {
        Endpoint::new(config.host.clone(), PortSelector::Tenant(config.tenant_port))
    }

    /// Discovers mode, administrative endpoint and data volumes.
    pub async fn discover(&self) -> Result<Discovery> {
        let mode = self.deployment_mode().await?;
        let endpoint = self.admin_endpoint(mode).await?;
        info!(%mode, endpoint = %endpoint, "Deployment mode detected");

        let rows: Vec<AttachedStorageRow> = self
            .tenant
            .at(endpoint.clone())
            .query_as(ATTACHED_DATA_VOLUMES)
            .await
            .map_err(CoordinatorError::discovery)?;

        let topology: ClusterTopology = rows
            .into_iter()
            .filter(|row| {
                if row.is_placeholder() {
                    debug!(path = %row.path, "Skipping placeholder path");
                }
                !row.is_placeholder()
            })
            .map(|row| {
                VolumeLocation::new(
                    self.config.qualify_host(&row.host),
                    row.storage_id,
                    row.path,
                    row.value,
                )
            })
            .collect();

        info!(volumes = topology.len(), "Data volumes discovered");
        for volume in topology.iter() {
            debug!(
                host = %volume.host,
                mount = %volume.mount_path,
                wwid = %volume.wwid,
                storage_id = %volume.storage_id,
                "Data volume"
            );
        }

        Ok(Discovery {
            mode,
            topology,
            endpoint,
        })
    }

    async fn deployment_mode(&self) -> Result<DeploymentMode> {
        let rows: Vec<ModeRow> = self
            .tenant
            .query_as(DEPLOYMENT_MODE)
            .await
            .map_err(CoordinatorError::discovery)?;

        let row = rows.first().ok_or_else(|| {
            CoordinatorError::discovery("mode detection query returned no rows")
        })?;

        Ok(if row.is_multidb() {
            DeploymentMode::MultiTenant
        } else {
            DeploymentMode::SingleTenant
        })
    }

    async fn admin_endpoint(&self, mode: DeploymentMode) -> Result<Endpoint> {
        let selector = PortSelector::for_mode(mode, self.config.tenant_port);
        if !mode.is_multi_tenant() {
            return Ok(Endpoint::new(self.config.host.clone(), selector));
        }

        let rows: Vec<NameServerRow> = self
            .tenant
            .query_as(MASTER_NAMESERVER)
            .await
            .map_err(CoordinatorError::discovery)?;
        let nameserver = rows
            .first()
            .ok_or_else(|| CoordinatorError::discovery("no active master name server"))?;

        Ok(Endpoint::new(
            self.config.qualify_host(&nameserver.host),
            selector,
        ))
    }
}
