//! Per-volume snapshot records and the aggregated run result.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::marker::{BackupMarker, MarkerState};
use crate::topology::VolumeLocation;

/// Step of the per-volume protocol at which a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VolumeStage {
    /// Looking up the device serial number on the host.
    SerialResolution,

    /// Freezing the filesystem.
    Freeze,

    /// Requesting the array snapshot.
    Snapshot,

    /// Thawing the filesystem.
    Unfreeze,
}

impl fmt::Display for VolumeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SerialResolution => "serial-resolution",
            Self::Freeze => "freeze",
            Self::Snapshot => "snapshot",
            Self::Unfreeze => "unfreeze",
        };
        f.write_str(name)
    }
}

/// Why a volume did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeFailure {
    /// Where it failed.
    pub stage: VolumeStage,

    /// Error message from the adapter.
    pub message: String,
}

impl VolumeFailure {
    /// Creates a new failure.
    pub fn new(stage: VolumeStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

impl fmt::Display for VolumeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.stage, self.message)
    }
}

/// Outcome of the freeze/snapshot/thaw step for one volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeSnapshotRecord {
    /// The volume this record describes.
    pub volume: VolumeLocation,

    /// Device serial number, once resolved.
    pub serial_number: Option<String>,

    /// Suffix the snapshot was (or would have been) tagged with.
    pub snapshot_suffix: String,

    /// Array snapshot identifier; absent until the array accepted the request.
    pub snapshot_id: Option<String>,

    /// First failure encountered, if any.
    pub failure: Option<VolumeFailure>,
}

impl VolumeSnapshotRecord {
    /// Creates an empty record for a volume about to be processed.
    pub fn new(volume: VolumeLocation, snapshot_suffix: impl Into<String>) -> Self {
        Self {
            volume,
            serial_number: None,
            snapshot_suffix: snapshot_suffix.into(),
            snapshot_id: None,
            failure: None,
        }
    }

    /// Records a failure. Only the first failure is kept.
    pub fn fail(&mut self, failure: VolumeFailure) {
        if self.failure.is_none() {
            self.failure = Some(failure);
        }
    }

    /// Returns true if the snapshot exists and the filesystem was thawed.
    pub fn is_success(&self) -> bool {
        self.snapshot_id.is_some() && self.failure.is_none()
    }
}

/// Final disposition of a run's backup marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Disposition {
    /// Every volume was snapshotted; the marker was confirmed.
    Confirmed,

    /// At least one step failed; the marker was abandoned.
    Abandoned,
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Confirmed => write!(f, "confirmed"),
            Self::Abandoned => write!(f, "abandoned"),
        }
    }
}

/// Why a run abandoned its marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbandonCause {
    /// At least one volume has no snapshot or was not thawed.
    VolumeFailures {
        /// Number of failed volumes.
        failed: usize,
    },

    /// Every volume succeeded but the confirm statement failed.
    ConfirmFailed {
        /// The database error.
        reason: String,
    },

    /// The run failed for another reason while the marker was open.
    Aborted {
        /// The failure.
        reason: String,
    },
}

impl AbandonCause {
    /// Returns true if the abandon was caused by per-volume failures alone.
    pub fn is_volume_failure(&self) -> bool {
        matches!(self, Self::VolumeFailures { .. })
    }
}

impl fmt::Display for AbandonCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VolumeFailures { failed } => write!(f, "volume failures: {}", failed),
            Self::ConfirmFailed { reason } => write!(f, "confirm failed: {}", reason),
            Self::Aborted { reason } => write!(f, "aborted: {}", reason),
        }
    }
}

/// The marker and all volume records of one coordinator run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinationResult {
    /// The backup marker, in its terminal state.
    pub marker: BackupMarker,

    /// One record per volume, in discovery order.
    pub records: Vec<VolumeSnapshotRecord>,

    /// Set when the marker was abandoned.
    #[serde(default)]
    pub cause: Option<AbandonCause>,
}

impl CoordinationResult {
    /// Creates a result from a marker and its records.
    pub fn new(marker: BackupMarker, records: Vec<VolumeSnapshotRecord>) -> Self {
        Self {
            marker,
            records,
            cause: None,
        }
    }

    /// Records why the marker was abandoned.
    pub fn with_cause(mut self, cause: AbandonCause) -> Self {
        self.cause = Some(cause);
        self
    }

    /// Returns true if every record succeeded. Vacuously true with no volumes.
    pub fn all_succeeded(&self) -> bool {
        self.records.iter().all(VolumeSnapshotRecord::is_success)
    }

    /// Returns the records that did not succeed.
    pub fn failures(&self) -> impl Iterator<Item = &VolumeSnapshotRecord> {
        self.records.iter().filter(|r| !r.is_success())
    }

    /// Returns `(suffix, snapshot id)` for every snapshot the array created.
    pub fn snapshot_ids(&self) -> Vec<(&str, &str)> {
        self.records
            .iter()
            .filter_map(|r| {
                r.snapshot_id
                    .as_deref()
                    .map(|id| (r.snapshot_suffix.as_str(), id))
            })
            .collect()
    }

    /// Returns the disposition recorded on the marker.
    ///
    /// A marker that never left `Prepared` is reported as abandoned.
    pub fn disposition(&self) -> Disposition {
        match self.marker.state {
            MarkerState::Confirmed => Disposition::Confirmed,
            MarkerState::Prepared | MarkerState::Abandoned => Disposition::Abandoned,
        }
    }
}
