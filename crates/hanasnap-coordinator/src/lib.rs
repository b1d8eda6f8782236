//! # Hanasnap Coordinator
//!
//! Topology discovery and the snapshot coordination protocol for SAP HANA
//! scale-out systems on FlashArray storage.
//!
//! A run:
//!
//! 1. discovers the deployment mode and every data volume
//! 2. prepares a backup marker and looks up its backup id
//! 3. per volume: resolves the device serial, freezes the filesystem,
//!    snapshots the array volume and thaws the filesystem
//! 4. confirms the marker with the snapshot ids, or abandons it
//!
//! The marker is abandoned whenever the run fails after it was opened. When
//! that is impossible the run ends with [`CoordinatorError::MarkerClose`],
//! which carries the statement an operator has to run by hand.
//!
//! ## Example
//!
//! ```ignore
//! let coordinator = SnapshotCoordinator::new(sql, hana, remote, array, config)?;
//! let outcome = coordinator.run().await;
//! std::process::exit(ExitStatus::of(&outcome).code());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod coordinator;
pub mod discovery;
pub mod error;
pub mod exit;
pub mod guard;
pub mod marker;

pub use config::CoordinatorConfig;
pub use coordinator::{PlannedVolume, SnapshotCoordinator, SnapshotPlan, PLANNED_MARKER_ID};
pub use discovery::{Discovery, TopologyDiscoverer};
pub use error::{CoordinatorError, Result};
pub use exit::ExitStatus;
pub use guard::FreezeGuard;
pub use marker::{MarkerControl, MarkerTracker};
