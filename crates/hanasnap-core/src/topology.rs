//! Cluster topology types.
//!
//! A topology is discovered once per run from the database and is immutable
//! afterwards: it lists, in discovery order, every data volume together with
//! the host that has it mounted.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Database deployment topology.
///
/// Determines which SQL port is used for administrative statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeploymentMode {
    /// A single database; statements go to the configured tenant port.
    SingleTenant,

    /// A system database coordinating tenants; statements go to the
    /// system database port.
    MultiTenant,
}

impl DeploymentMode {
    /// Returns true for multi-tenant deployments.
    pub fn is_multi_tenant(self) -> bool {
        matches!(self, Self::MultiTenant)
    }
}

impl fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SingleTenant => write!(f, "single-tenant"),
            Self::MultiTenant => write!(f, "multi-tenant"),
        }
    }
}

/// Location of a single data volume in the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VolumeLocation {
    /// Host that has the volume mounted (qualified with the domain name
    /// when one is configured).
    pub host: String,

    /// Database storage partition identifier.
    pub storage_id: String,

    /// Filesystem mount path of the volume on `host`.
    pub mount_path: String,

    /// World-wide identifier of the underlying LUN.
    pub wwid: String,
}

impl VolumeLocation {
    /// Creates a new volume location.
    pub fn new(
        host: impl Into<String>,
        storage_id: impl Into<String>,
        mount_path: impl Into<String>,
        wwid: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            storage_id: storage_id.into(),
            mount_path: mount_path.into(),
            wwid: wwid.into(),
        }
    }
}

impl fmt::Display for VolumeLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.mount_path)
    }
}

/// Ordered list of data volumes across the cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterTopology {
    volumes: Vec<VolumeLocation>,
}

/// The volumes of one host, each paired with its position in discovery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostGroup {
    /// Host name.
    pub host: String,

    /// `(discovery index, volume)` pairs in discovery order.
    pub volumes: Vec<(usize, VolumeLocation)>,
}

impl ClusterTopology {
    /// Creates a topology from volumes in discovery order.
    pub fn new(volumes: Vec<VolumeLocation>) -> Self {
        Self { volumes }
    }

    /// Returns the volumes in discovery order.
    pub fn volumes(&self) -> &[VolumeLocation] {
        &self.volumes
    }

    /// Returns the number of volumes.
    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    /// Returns true if no data volumes were discovered.
    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }

    /// Iterates over the volumes in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &VolumeLocation> {
        self.volumes.iter()
    }

    /// Groups volumes by host.
    ///
    /// Hosts appear in the order of their first volume; volumes keep their
    /// discovery order inside each group.
    pub fn by_host(&self) -> Vec<HostGroup> {
        let mut groups: Vec<HostGroup> = Vec::new();

        for (index, volume) in self.volumes.iter().enumerate() {
            match groups.iter_mut().find(|g| g.host == volume.host) {
                Some(group) => group.volumes.push((index, volume.clone())),
                None => groups.push(HostGroup {
                    host: volume.host.clone(),
                    volumes: vec![(index, volume.clone())],
                }),
            }
        }

        groups
    }
}

impl FromIterator<VolumeLocation> for ClusterTopology {
    fn from_iter<I: IntoIterator<Item = VolumeLocation>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
