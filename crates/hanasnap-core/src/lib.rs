//! Hanasnap Core - shared types for coordinated storage snapshots.
//!
//! This crate provides the data model that flows between the adapters and
//! the snapshot coordinator:
//!
//! - [`topology`]: Deployment mode and the (host, mount) volume locations
//! - [`marker`]: The database-side backup marker and its lifecycle
//! - [`record`]: Per-volume snapshot records and the aggregated run result
//! - [`naming`]: Snapshot suffix generation
//! - [`credentials`]: Username/password pairs with redacted debug output
//! - [`error`]: Error types for the data model
//!
//! # Example
//!
//! ```
//! use hanasnap_core::marker::{BackupMarker, MarkerState};
//!
//! let mut marker = BackupMarker::prepared("1700000000001");
//! assert_eq!(marker.state, MarkerState::Prepared);
//!
//! marker.confirm().unwrap();
//! assert!(marker.state.is_terminal());
//! ```

pub mod credentials;
pub mod error;
pub mod marker;
pub mod naming;
pub mod record;
pub mod topology;

pub use credentials::Credentials;
pub use error::{CoreError, Result};
pub use marker::{BackupMarker, MarkerState};
pub use naming::SuffixAllocator;
pub use record::{
    AbandonCause, CoordinationResult, Disposition, VolumeFailure, VolumeSnapshotRecord,
    VolumeStage,
};
pub use topology::{ClusterTopology, DeploymentMode, HostGroup, VolumeLocation};
