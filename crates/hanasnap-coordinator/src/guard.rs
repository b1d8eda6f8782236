//! Freeze/thaw pairing.

use hanasnap_remote::{FilesystemOps, Result};
use tracing::warn;

/// A filesystem that may be frozen and must be thawed.
///
/// The guard is armed as soon as a freeze is attempted, because a failed or
/// timed-out freeze leaves the filesystem state unknown. Callers release it
/// with [`release`](Self::release). A guard dropped while armed spawns a
/// best-effort unfreeze on the current runtime.
pub struct FreezeGuard {
    fs: FilesystemOps,
    host: String,
    mount_path: String,
    armed: bool,
}

impl FreezeGuard {
    /// Creates a disarmed guard for `mount_path` on `host`.
    pub fn new(fs: FilesystemOps, host: impl Into<String>, mount_path: impl Into<String>) -> Self {
        Self {
            fs,
            host: host.into(),
            mount_path: mount_path.into(),
            armed: false,
        }
    }

    /// Freezes the filesystem. The guard stays armed even if this fails.
    pub async fn freeze(&mut self) -> Result<()> {
        self.armed = true;
        self.fs.freeze(&self.host, &self.mount_path).await
    }

    /// Returns true while an unfreeze is owed.
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Thaws the filesystem and disarms the guard.
    ///
    /// Does nothing if no freeze was attempted.
    pub async fn release(mut self) -> Result<()> {
        if !self.armed {
            return Ok(());
        }
        self.armed = false;
        self.fs.unfreeze(&self.host, &self.mount_path).await
    }
}

impl Drop for FreezeGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        warn!(
            host = %self.host,
            mount = %self.mount_path,
            "Freeze guard dropped while armed; scheduling unfreeze"
        );

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(host = %self.host, mount = %self.mount_path, "No runtime for unfreeze");
            return;
        };

        let (fs, host, mount_path) = (self.fs.clone(), self.host.clone(), self.mount_path.clone());
        runtime.spawn(async move {
            if let Err(e) = fs.unfreeze(&host, &mount_path).await {
                warn!(host = %host, mount = %mount_path, error = %e, "Background unfreeze failed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use hanasnap_remote::{CommandOutput, RemoteExecutor};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct CountingExecutor {
        commands: Mutex<Vec<String>>,
        freeze_exit: i32,
    }

    #[async_trait]
    impl RemoteExecutor for CountingExecutor {
        async fn run_command(&self, _host: &str, command: &str) -> Result<CommandOutput> {
            self.commands.lock().unwrap().push(command.to_string());
            let status = if command.contains("--freeze") {
                self.freeze_exit
            } else {
                0
            };
            Ok(CommandOutput::new("", status))
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    fn count(exec: &CountingExecutor, flag: &str) -> usize {
        exec.commands
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.contains(flag))
            .count()
    }

    #[tokio::test]
    async fn test_release_unfreezes_once() {
        let exec = Arc::new(CountingExecutor::default());
        let mut guard = FreezeGuard::new(FilesystemOps::new(exec.clone()), "node1", "/hana/data/mnt1");

        guard.freeze().await.unwrap();
        assert!(guard.is_armed());
        guard.release().await.unwrap();

        assert_eq!(count(&exec, "--freeze"), 1);
        assert_eq!(count(&exec, "--unfreeze"), 1);
    }

    #[tokio::test]
    async fn test_failed_freeze_still_owes_unfreeze() {
        let exec = Arc::new(CountingExecutor {
            freeze_exit: 1,
            ..Default::default()
        });
        let mut guard = FreezeGuard::new(FilesystemOps::new(exec.clone()), "node1", "/hana/data/mnt1");

        assert!(guard.freeze().await.is_err());
        assert!(guard.is_armed());
        guard.release().await.unwrap();
        assert_eq!(count(&exec, "--unfreeze"), 1);
    }

    #[tokio::test]
    async fn test_unused_guard_does_nothing() {
        let exec = Arc::new(CountingExecutor::default());
        let guard = FreezeGuard::new(FilesystemOps::new(exec.clone()), "node1", "/hana/data/mnt1");

        guard.release().await.unwrap();
        assert!(exec.commands.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_drop_while_armed_spawns_unfreeze() {
        let exec = Arc::new(CountingExecutor::default());
        {
            let mut guard =
                FreezeGuard::new(FilesystemOps::new(exec.clone()), "node1", "/hana/data/mnt1");
            guard.freeze().await.unwrap();
        }

        for _ in 0..100 {
            if count(&exec, "--unfreeze") == 1 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(count(&exec, "--unfreeze"), 1);
    }
}
