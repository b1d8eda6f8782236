//! The volume snapshot seam.

use async_trait::async_trait;

use crate::error::Result;

/// Creates a named snapshot of the array volume behind a device serial.
#[async_trait]
pub trait VolumeSnapshotter: Send + Sync {
    /// Snapshots the volume whose serial matches `volume_serial`, tagging the
    /// snapshot with `suffix`, and returns the snapshot id.
    ///
    /// Fails with [`crate::ArrayError::VolumeNotFound`] if no volume matches.
    async fn snapshot(&self, volume_serial: &str, suffix: &str) -> Result<String>;

    /// Returns the name of this snapshotter.
    fn name(&self) -> &str;
}
