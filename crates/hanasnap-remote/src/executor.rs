//! The remote execution seam.

use async_trait::async_trait;

use crate::error::Result;

/// Captured result of a remote command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Standard output.
    pub stdout: String,

    /// Standard error.
    pub stderr: String,

    /// Exit status reported by the remote shell.
    pub exit_status: i32,
}

impl CommandOutput {
    /// Creates an output with the given stdout and exit status.
    pub fn new(stdout: impl Into<String>, exit_status: i32) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_status,
        }
    }

    /// Sets standard error.
    pub fn with_stderr(mut self, stderr: impl Into<String>) -> Self {
        self.stderr = stderr.into();
        self
    }

    /// Returns true if the command exited with status 0.
    pub fn success(&self) -> bool {
        self.exit_status == 0
    }

    /// Returns the standard output lines.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.stdout.lines()
    }

    /// Describes a failed command for error messages.
    pub fn failure_reason(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            format!("exit status {}", self.exit_status)
        } else {
            format!("exit status {}: {}", self.exit_status, stderr)
        }
    }
}

/// Runs shell commands on a host.
///
/// Each call opens its own authenticated session, runs one command, captures
/// its output and closes the session. A non-zero exit status is *not* an
/// error at this level; callers decide what a failure means.
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Runs `command` on `host`.
    async fn run_command(&self, host: &str, command: &str) -> Result<CommandOutput>;

    /// Returns the name of this executor, for logging.
    fn name(&self) -> &str;
}
