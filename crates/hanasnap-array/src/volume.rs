//! Array volume records and serial matching.

use serde::{Deserialize, Serialize};

/// NAA prefix the host sees in front of a FlashArray volume serial.
pub const PURE_NAA_PREFIX: &str = "3624a9370";

/// A volume as listed by the array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    /// Volume name.
    pub name: String,

    /// Array-side serial number.
    pub serial: String,
}

/// A created snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Snapshot {
    /// Snapshot name, `<volume>.<suffix>`.
    pub name: String,

    /// Snapshot serial; used as the snapshot id.
    pub serial: String,

    /// Name of the volume the snapshot was taken of.
    #[serde(default)]
    pub source: Option<String>,
}

/// Body of the snapshot creation request.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct SnapshotRequest<'a> {
    pub snap: bool,
    pub source: [&'a str; 1],
    pub suffix: &'a str,
}

impl<'a> SnapshotRequest<'a> {
    pub fn new(volume: &'a str, suffix: &'a str) -> Self {
        Self {
            snap: true,
            source: [volume],
            suffix,
        }
    }
}

/// Returns true if a host device serial refers to an array volume serial.
///
/// Comparison ignores case. The device serial may carry the NAA prefix.
pub fn serial_matches(device_serial: &str, volume_serial: &str) -> bool {
    let device = device_serial.trim().to_ascii_lowercase();
    let volume = volume_serial.trim().to_ascii_lowercase();
    !volume.is_empty() && (device == volume || device.ends_with(&volume))
}

/// Returns the first volume whose serial matches `device_serial`.
pub fn find_volume<'a>(volumes: &'a [Volume], device_serial: &str) -> Option<&'a Volume> {
    volumes
        .iter()
        .find(|v| serial_matches(device_serial, &v.serial))
}
