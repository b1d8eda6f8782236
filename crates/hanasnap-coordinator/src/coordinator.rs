//! The snapshot coordination protocol.
//!
//! One run walks `discover -> open marker -> per-volume work -> confirm` and
//! abandons the marker whenever the run fails while it is open. Per-volume
//! work is resolve serial, freeze, snapshot and unfreeze; the unfreeze runs
//! whatever happened before it.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use hanasnap_array::VolumeSnapshotter;
use hanasnap_core::{
    BackupMarker, ClusterTopology, CoordinationResult, SuffixAllocator, VolumeFailure,
    VolumeLocation, VolumeSnapshotRecord, VolumeStage,
};
use hanasnap_db::{Database, HanaConfig, SqlExecutor};
use hanasnap_remote::{FilesystemOps, RemoteExecutor};
use serde::Serialize;
use tracing::{debug, error, info, info_span, warn, Instrument, Span};
use uuid::Uuid;

use crate::config::CoordinatorConfig;
use crate::discovery::{Discovery, TopologyDiscoverer};
use crate::error::{CoordinatorError, Result};
use crate::guard::FreezeGuard;
use crate::marker::{confirm_comment, prepare_comment, MarkerControl, MarkerTracker};

/// Marker id used in planned suffixes before a marker exists.
pub const PLANNED_MARKER_ID: &str = "BACKUPID";

/// One volume of a dry run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedVolume {
    /// The volume.
    pub volume: VolumeLocation,

    /// Suffix shape, with [`PLANNED_MARKER_ID`] in place of the backup id.
    pub suffix: String,
}

/// Result of a dry run.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotPlan {
    /// What discovery found.
    pub discovery: Discovery,

    /// Planned work in discovery order.
    pub volumes: Vec<PlannedVolume>,
}

/// Drives one marker lifecycle across all data volumes.
pub struct SnapshotCoordinator {
    tenant: Database,
    hana: HanaConfig,
    fs: FilesystemOps,
    snapshotter: Arc<dyn VolumeSnapshotter>,
    config: CoordinatorConfig,
}

impl SnapshotCoordinator {
    /// Creates a coordinator over the three adapters.
    pub fn new(
        sql: Arc<dyn SqlExecutor>,
        hana: HanaConfig,
        remote: Arc<dyn RemoteExecutor>,
        snapshotter: Arc<dyn VolumeSnapshotter>,
        config: CoordinatorConfig,
    ) -> Result<Self> {
        if config.max_concurrent_hosts == 0 {
            return Err(CoordinatorError::Configuration(
                "max_concurrent_hosts must be at least 1".to_string(),
            ));
        }

        let tenant = Database::new(sql, TopologyDiscoverer::tenant_endpoint(&hana));
        Ok(Self {
            tenant,
            hana,
            fs: FilesystemOps::new(remote),
            snapshotter,
            config,
        })
    }

    /// Discovers deployment mode, administrative endpoint and data volumes.
    pub async fn discover(&self) -> Result<Discovery> {
        TopologyDiscoverer::new(self.tenant.clone(), self.hana.clone())
            .discover()
            .await
    }

    /// Discovers the topology and lays out the work without side effects.
    pub async fn plan(&self) -> Result<SnapshotPlan> {
        let discovery = self.discover().await?;
        let suffixes = self.allocate_suffixes(&discovery.topology, PLANNED_MARKER_ID);

        let volumes: Vec<PlannedVolume> = discovery
            .topology
            .iter()
            .cloned()
            .zip(suffixes)
            .map(|(volume, suffix)| PlannedVolume { volume, suffix })
            .collect();

        for planned in &volumes {
            info!(
                host = %planned.volume.host,
                mount = %planned.volume.mount_path,
                wwid = %planned.volume.wwid,
                suffix = %planned.suffix,
                "Planned volume snapshot"
            );
        }

        Ok(SnapshotPlan { discovery, volumes })
    }

    /// Runs the full protocol once.
    pub async fn run(&self) -> Result<CoordinationResult> {
        let run_id = Uuid::new_v4();
        let span = info_span!("snapshot_run", run_id = %run_id);
        self.run_protocol(run_id).instrument(span).await
    }

    async fn run_protocol(&self, run_id: Uuid) -> Result<CoordinationResult> {
        let discovery = self.discover().await?;
        let markers = MarkerControl::new(self.tenant.at(discovery.endpoint.clone()));
        let comment = prepare_comment(Utc::now(), &run_id);

        let mut tracker = MarkerTracker::NotOpened;
        let mut records = Vec::new();

        match self
            .drive(&discovery, &markers, &comment, &mut tracker, &mut records)
            .await
        {
            Ok(marker) => {
                info!(backup_id = %marker.id, volumes = records.len(), "Snapshot run confirmed");
                Ok(CoordinationResult::new(marker, records))
            }
            Err(err) => {
                let MarkerTracker::Open(mut marker) = tracker else {
                    return Err(err);
                };

                let cause = err.abandon_cause();
                warn!(backup_id = %marker.id, %cause, "Abandoning backup marker");
                markers
                    .abandon_or_escalate(&mut marker, &err.to_string())
                    .await?;
                Ok(CoordinationResult::new(marker, records).with_cause(cause))
            }
        }
    }

    /// Opens the marker, processes every volume and confirms.
    ///
    /// Any error returned while `tracker` is `Open` leaves the abandon to the
    /// caller.
    async fn drive(
        &self,
        discovery: &Discovery,
        markers: &MarkerControl,
        comment: &str,
        tracker: &mut MarkerTracker,
        records: &mut Vec<VolumeSnapshotRecord>,
    ) -> Result<BackupMarker> {
        let mut marker = markers.open(comment).await?;
        *tracker = MarkerTracker::Open(marker.clone());

        if discovery.topology.is_empty() {
            info!(backup_id = %marker.id, "No data volumes discovered; confirming immediately");
        } else {
            *records = self.snapshot_volumes(&discovery.topology, &marker.id).await;
        }

        let failed = records.iter().filter(|r| !r.is_success()).count();
        if failed > 0 {
            return Err(CoordinatorError::VolumeFailures { failed });
        }

        markers
            .confirm(&mut marker, &confirm_comment(records.as_slice()))
            .await
            .map_err(|e| CoordinatorError::confirm(&marker.id, e.reason()))?;
        *tracker = MarkerTracker::Closed(marker.clone());

        Ok(marker)
    }

    fn allocate_suffixes(&self, topology: &ClusterTopology, marker_id: &str) -> Vec<String> {
        let mut allocator = SuffixAllocator::new(self.config.suffix_prefix.as_str(), marker_id);
        topology
            .iter()
            .map(|v| allocator.allocate(&v.host, &v.mount_path))
            .collect()
    }

    /// Processes all volumes and returns their records in discovery order.
    ///
    /// Hosts run concurrently up to `max_concurrent_hosts`; the volumes of a
    /// host run one after another. Records are only written here.
    async fn snapshot_volumes(
        &self,
        topology: &ClusterTopology,
        backup_id: &str,
    ) -> Vec<VolumeSnapshotRecord> {
        let suffixes = self.allocate_suffixes(topology, backup_id);

        let work: Vec<HostWork> = topology
            .by_host()
            .into_iter()
            .map(|group| HostWork {
                host: group.host,
                volumes: group
                    .volumes
                    .into_iter()
                    .map(|(index, volume)| (index, volume, suffixes[index].clone()))
                    .collect(),
            })
            .collect();

        info!(
            volumes = topology.len(),
            hosts = work.len(),
            max_concurrent_hosts = self.config.max_concurrent_hosts,
            "Processing data volumes"
        );

        let step = VolumeStep {
            fs: self.fs.clone(),
            snapshotter: self.snapshotter.clone(),
            snapshot_timeout: self.config.snapshot_timeout(),
        };

        let mut slots: Vec<Option<VolumeSnapshotRecord>> = vec![None; topology.len()];
        let mut finished = stream::iter(work)
            .map(|work| {
                let step = step.clone();
                let span = Span::current();
                async move {
                    let host = work.host.clone();
                    let fallback = work.aborted();
                    match tokio::spawn(step.run_host(work).instrument(span)).await {
                        Ok(records) => records,
                        Err(e) => {
                            error!(host = %host, error = %e, "Host task aborted");
                            fallback
                        }
                    }
                }
            })
            .buffer_unordered(self.config.max_concurrent_hosts);

        while let Some(host_records) = finished.next().await {
            for (index, record) in host_records {
                slots[index] = Some(record);
            }
        }

        slots.into_iter().flatten().collect()
    }
}

/// The volumes of one host with their discovery index and suffix.
#[derive(Debug, Clone)]
struct HostWork {
    host: String,
    volumes: Vec<(usize, VolumeLocation, String)>,
}

impl HostWork {
    /// Records for every volume of a host whose task died.
    fn aborted(&self) -> Vec<(usize, VolumeSnapshotRecord)> {
        self.volumes
            .iter()
            .map(|(index, volume, suffix)| {
                let mut record = VolumeSnapshotRecord::new(volume.clone(), suffix.clone());
                record.fail(VolumeFailure::new(VolumeStage::Snapshot, "host task aborted"));
                (*index, record)
            })
            .collect()
    }
}

/// The per-volume freeze/snapshot/thaw step.
#[derive(Clone)]
struct VolumeStep {
    fs: FilesystemOps,
    snapshotter: Arc<dyn VolumeSnapshotter>,
    snapshot_timeout: Duration,
}

impl VolumeStep {
    async fn run_host(self, work: HostWork) -> Vec<(usize, VolumeSnapshotRecord)> {
        let mut records = Vec::with_capacity(work.volumes.len());
        for (index, volume, suffix) in work.volumes {
            records.push((index, self.run_volume(volume, suffix).await));
        }
        records
    }

    async fn run_volume(&self, volume: VolumeLocation, suffix: String) -> VolumeSnapshotRecord {
        let (host, mount) = (volume.host.clone(), volume.mount_path.clone());
        let mut record = VolumeSnapshotRecord::new(volume, suffix);

        let serial = match self.fs.resolve_volume_serial(&host, &mount).await {
            Ok(serial) => serial,
            Err(e) => {
                error!(host = %host, mount = %mount, error = %e, "Serial resolution failed");
                record.fail(VolumeFailure::new(VolumeStage::SerialResolution, e.to_string()));
                return record;
            }
        };
        record.serial_number = Some(serial.clone());

        let mut guard = FreezeGuard::new(self.fs.clone(), host.as_str(), mount.as_str());
        if let Err(e) = guard.freeze().await {
            error!(host = %host, mount = %mount, error = %e, "Freeze failed");
            record.fail(VolumeFailure::new(VolumeStage::Freeze, e.to_string()));
            if let Err(e) = guard.release().await {
                warn!(host = %host, mount = %mount, error = %e, "Unfreeze after failed freeze failed");
            }
            return record;
        }

        info!(host = %host, mount = %mount, suffix = %record.snapshot_suffix, "Creating storage snapshot");
        match tokio::time::timeout(
            self.snapshot_timeout,
            self.snapshotter.snapshot(&serial, &record.snapshot_suffix),
        )
        .await
        {
            Ok(Ok(snapshot_id)) => {
                debug!(host = %host, mount = %mount, snapshot_id = %snapshot_id, "Snapshot created");
                record.snapshot_id = Some(snapshot_id);
            }
            Ok(Err(e)) => {
                error!(host = %host, mount = %mount, error = %e, "Snapshot failed");
                record.fail(VolumeFailure::new(VolumeStage::Snapshot, e.to_string()));
            }
            Err(_) => {
                error!(host = %host, mount = %mount, after = ?self.snapshot_timeout, "Snapshot timed out");
                record.fail(VolumeFailure::new(
                    VolumeStage::Snapshot,
                    format!("timed out after {:?}", self.snapshot_timeout),
                ));
            }
        }

        if let Err(e) = guard.release().await {
            error!(host = %host, mount = %mount, error = %e, "Unfreeze failed");
            record.fail(VolumeFailure::new(VolumeStage::Unfreeze, e.to_string()));
        }

        record
    }
}
