//! Shell command builders and output parsers.
//!
//! Commands are fixed invocations of `df`, `udevadm` and `fsfreeze`; the only
//! variable parts are mount paths and device names, which are single-quoted.

/// Location of the `fsfreeze` binary on the data volume hosts.
pub const FSFREEZE: &str = "/sbin/fsfreeze";

/// udev property that carries the device-mapper serial number.
pub const DM_SERIAL_KEY: &str = "DM_SERIAL";

/// Helper for generating the remote command lines.
pub(crate) struct FsCommand;

impl FsCommand {
    /// Mount table lookup filtered by the mount path.
    ///
    /// `-P` keeps every filesystem on a single line so the device is always
    /// the first field and the mount point the last.
    pub fn mount_lookup(mount_path: &str) -> String {
        format!("df -P | grep -F -- {}", shell_quote(mount_path))
    }

    /// udev property query for a device, filtered to the serial attribute.
    pub fn device_serial(device: &str) -> String {
        format!(
            "udevadm info --query=all --name={} | grep {}",
            shell_quote(device),
            DM_SERIAL_KEY
        )
    }

    /// Suspends writes to the filesystem at `mount_path`.
    pub fn freeze(mount_path: &str) -> String {
        format!("{} --freeze {}", FSFREEZE, shell_quote(mount_path))
    }

    /// Resumes writes to the filesystem at `mount_path`.
    pub fn unfreeze(mount_path: &str) -> String {
        format!("{} --unfreeze {}", FSFREEZE, shell_quote(mount_path))
    }
}

/// Wraps a value in single quotes for a POSIX shell.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Extracts the device path for `mount_path` from `df -P` output.
///
/// Only lines whose last field equals the mount path exactly are considered,
/// so `/hana/data/mnt1` does not match `/hana/data/mnt10`.
pub fn parse_device_path(df_output: &str, mount_path: &str) -> Option<String> {
    let wanted = mount_path.trim_end_matches('/');

    df_output.lines().find_map(|line| {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let (device, mount) = (fields.first()?, fields.last()?);
        if fields.len() < 2 || mount.trim_end_matches('/') != wanted {
            return None;
        }
        device.starts_with('/').then(|| device.to_string())
    })
}

/// Extracts the serial number from `KEY=VALUE` formatted udev output.
///
/// Lines look like `E: DM_SERIAL=3624a9370...`. Returns an error message if
/// no line carries the key or the value is empty.
pub fn parse_device_serial(udev_output: &str) -> std::result::Result<String, String> {
    let line = udev_output
        .lines()
        .find(|line| line.contains(DM_SERIAL_KEY))
        .ok_or_else(|| format!("no {} property in udev output", DM_SERIAL_KEY))?;

    let (key, value) = line
        .split_once('=')
        .ok_or_else(|| format!("malformed property line: {}", line.trim()))?;

    if !key.trim_end().ends_with(DM_SERIAL_KEY) {
        return Err(format!("malformed property line: {}", line.trim()));
    }

    let value = value.trim();
    if value.is_empty() {
        return Err(format!("empty {} value", DM_SERIAL_KEY));
    }

    Ok(value.to_string())
}
