//! Volume operations built on top of a [`RemoteExecutor`].

use std::sync::Arc;

use tracing::{debug, info};

use crate::commands::{parse_device_path, parse_device_serial, FsCommand};
use crate::error::{RemoteError, Result};
use crate::executor::RemoteExecutor;

/// Serial lookup and freeze/thaw of data volume filesystems.
///
/// # Example
///
/// ```ignore
/// use hanasnap_remote::{FilesystemOps, SshExecutor, SshConfig};
/// use std::sync::Arc;
///
/// let fs = FilesystemOps::new(Arc::new(SshExecutor::new(SshConfig::default())));
/// let serial = fs.resolve_volume_serial("node1", "/hana/data/mnt00001").await?;
/// fs.freeze("node1", "/hana/data/mnt00001").await?;
/// // ... snapshot ...
/// fs.unfreeze("node1", "/hana/data/mnt00001").await?;
/// ```
#[derive(Clone)]
pub struct FilesystemOps {
    executor: Arc<dyn RemoteExecutor>,
}

impl FilesystemOps {
    /// Creates filesystem operations over the given executor.
    pub fn new(executor: Arc<dyn RemoteExecutor>) -> Self {
        Self { executor }
    }

    /// Returns the underlying executor.
    pub fn executor(&self) -> &Arc<dyn RemoteExecutor> {
        &self.executor
    }

    /// Resolves the device-mapper serial number of the device mounted at
    /// `mount_path` on `host`.
    pub async fn resolve_volume_serial(&self, host: &str, mount_path: &str) -> Result<String> {
        let lookup = FsCommand::mount_lookup(mount_path);
        let output = self.executor.run_command(host, &lookup).await?;

        let device = parse_device_path(&output.stdout, mount_path).ok_or_else(|| {
            RemoteError::serial_resolution(host, mount_path, "no mount table entry for mount path")
        })?;
        debug!(host, mount_path, device = %device, "Resolved device for mount");

        let query = FsCommand::device_serial(&device);
        let output = self.executor.run_command(host, &query).await?;

        let serial = parse_device_serial(&output.stdout)
            .map_err(|reason| RemoteError::serial_resolution(host, mount_path, reason))?;
        debug!(host, mount_path, serial = %serial, "Resolved volume serial");

        Ok(serial)
    }

    /// Freezes the filesystem at `mount_path`.
    ///
    /// Fails with [`RemoteError::Freeze`] if `fsfreeze` exits non-zero.
    pub async fn freeze(&self, host: &str, mount_path: &str) -> Result<()> {
        let output = self
            .executor
            .run_command(host, &FsCommand::freeze(mount_path))
            .await?;

        if !output.success() {
            return Err(RemoteError::freeze(host, mount_path, output.failure_reason()));
        }

        info!(host, mount_path, "Filesystem frozen");
        Ok(())
    }

    /// Thaws the filesystem at `mount_path`.
    ///
    /// Fails with [`RemoteError::Unfreeze`] if `fsfreeze` exits non-zero.
    pub async fn unfreeze(&self, host: &str, mount_path: &str) -> Result<()> {
        let output = self
            .executor
            .run_command(host, &FsCommand::unfreeze(mount_path))
            .await?;

        if !output.success() {
            return Err(RemoteError::unfreeze(host, mount_path, output.failure_reason()));
        }

        info!(host, mount_path, "Filesystem thawed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::CommandOutput;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Answers commands by prefix and records everything it ran.
    struct ScriptedExecutor {
        responses: Vec<(&'static str, CommandOutput)>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedExecutor {
        fn new(responses: Vec<(&'static str, CommandOutput)>) -> Self {
            Self {
                responses,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl RemoteExecutor for ScriptedExecutor {
        async fn run_command(&self, host: &str, command: &str) -> Result<CommandOutput> {
            self.calls.lock().unwrap().push(format!("{}: {}", host, command));
            Ok(self
                .responses
                .iter()
                .find(|(prefix, _)| command.starts_with(prefix))
                .map(|(_, out)| out.clone())
                .unwrap_or_else(|| CommandOutput::new("", 1)))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn ops(responses: Vec<(&'static str, CommandOutput)>) -> (FilesystemOps, Arc<ScriptedExecutor>) {
        let exec = Arc::new(ScriptedExecutor::new(responses));
        (FilesystemOps::new(exec.clone()), exec)
    }

    #[tokio::test]
    async fn test_resolve_volume_serial() {
        let (fs, exec) = ops(vec![
            (
                "df -P",
                CommandOutput::new("/dev/mapper/3624a9370abc123 100 10 90 10% /hana/data/mnt1\n", 0),
            ),
            ("udevadm", CommandOutput::new("E: DM_SERIAL=3624a9370ABC123\n", 0)),
        ]);

        let serial = fs.resolve_volume_serial("node1", "/hana/data/mnt1").await.unwrap();
        assert_eq!(serial, "3624a9370ABC123");

        let calls = exec.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert!(calls[1].contains("--name='/dev/mapper/3624a9370abc123'"));
    }

    #[tokio::test]
    async fn test_resolve_without_mount_entry() {
        let (fs, _) = ops(vec![("df -P", CommandOutput::new("", 1))]);

        let err = fs.resolve_volume_serial("node1", "/hana/data/mnt1").await.unwrap_err();
        assert!(matches!(err, RemoteError::SerialResolution { .. }));
    }

    #[tokio::test]
    async fn test_resolve_with_malformed_udev_output() {
        let (fs, _) = ops(vec![
            (
                "df -P",
                CommandOutput::new("/dev/sdb 100 10 90 10% /hana/data/mnt1\n", 0),
            ),
            ("udevadm", CommandOutput::new("E: DM_SERIAL\n", 0)),
        ]);

        let err = fs.resolve_volume_serial("node1", "/hana/data/mnt1").await.unwrap_err();
        assert!(matches!(err, RemoteError::SerialResolution { .. }));
    }

    #[tokio::test]
    async fn test_freeze_propagates_exit_status() {
        let (fs, _) = ops(vec![(
            "/sbin/fsfreeze --freeze",
            CommandOutput::new("", 1).with_stderr("fsfreeze: cannot open"),
        )]);

        let err = fs.freeze("node1", "/hana/data/mnt1").await.unwrap_err();
        assert!(matches!(err, RemoteError::Freeze { .. }));
        assert!(err.to_string().contains("cannot open"));
    }

    #[tokio::test]
    async fn test_freeze_and_unfreeze_succeed() {
        let (fs, exec) = ops(vec![
            ("/sbin/fsfreeze --freeze", CommandOutput::new("", 0)),
            ("/sbin/fsfreeze --unfreeze", CommandOutput::new("", 0)),
        ]);

        fs.freeze("node1", "/hana/data/mnt1").await.unwrap();
        fs.unfreeze("node1", "/hana/data/mnt1").await.unwrap();

        assert_eq!(exec.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unfreeze_failure() {
        let (fs, _) = ops(vec![]);

        let err = fs.unfreeze("node1", "/hana/data/mnt1").await.unwrap_err();
        assert!(matches!(err, RemoteError::Unfreeze { .. }));
    }
}
