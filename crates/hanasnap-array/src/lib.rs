//! # Hanasnap Array - FlashArray volume snapshots
//!
//! Finds the array volume behind a host device serial and snapshots it.
//!
//! - [`VolumeSnapshotter`]: the seam the coordinator depends on
//! - [`FlashArrayClient`]: REST 1.x implementation over `reqwest`
//! - [`serial_matches`]: device serial to array serial comparison

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod error;
pub mod snapshotter;
pub mod volume;

pub use client::FlashArrayClient;
pub use config::FlashArrayConfig;
pub use error::{ArrayError, Result};
pub use snapshotter::VolumeSnapshotter;
pub use volume::{find_volume, serial_matches, Snapshot, Volume};
