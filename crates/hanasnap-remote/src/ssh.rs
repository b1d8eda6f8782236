//! SSH implementation of [`RemoteExecutor`].
//!
//! Uses libssh2 through the `ssh2` crate. Sessions are blocking, so every
//! command runs on the blocking thread pool under an async deadline.
//!
//! Each libssh2 call is capped at the time left before the deadline, and a
//! command whose deadline has passed is never handed to the remote shell.
//! A command that was handed over is always waited for, so a later command
//! on the same host cannot overtake it.

use std::io::Read;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ssh2::{HashType, Session};
use tracing::{debug, warn};

use crate::config::SshConfig;
use crate::deadline::{libssh2_millis, CommandDeadline};
use crate::error::{RemoteError, Result};
use crate::executor::{CommandOutput, RemoteExecutor};

/// Runs commands over a fresh password-authenticated SSH session per call.
///
/// Host keys are trusted on first use and never pinned: the key fingerprint
/// is logged at debug level and the connection proceeds.
#[derive(Debug, Clone)]
pub struct SshExecutor {
    config: SshConfig,
}

impl SshExecutor {
    /// Creates an executor with the given configuration.
    pub fn new(config: SshConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SshConfig {
        &self.config
    }
}

#[async_trait]
impl RemoteExecutor for SshExecutor {
    async fn run_command(&self, host: &str, command: &str) -> Result<CommandOutput> {
        let config = self.config.clone();
        let (task_host, task_command) = (host.to_string(), command.to_string());

        debug!(host, command, "Running remote command");

        run_bounded(host, command, self.config.command_timeout(), move |deadline| {
            run_blocking(&config, &task_host, &task_command, deadline)
        })
        .await
    }

    fn name(&self) -> &str {
        "ssh"
    }
}

/// Runs blocking work under `budget`.
///
/// On expiry the deadline is abandoned and the work is awaited before the
/// timeout is reported; `work` must bound its own calls by the deadline.
async fn run_bounded<T, F>(host: &str, command: &str, budget: Duration, work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&CommandDeadline) -> Result<T> + Send + 'static,
{
    let deadline = Arc::new(CommandDeadline::new(budget));
    let shared = deadline.clone();
    let mut task = tokio::task::spawn_blocking(move || work(&shared));

    match tokio::time::timeout(budget, &mut task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(RemoteError::exec(host, command, join_err)),
        Err(_) => {
            deadline.abandon();
            let settled = task.await;
            if deadline.was_executed() {
                warn!(
                    host,
                    command,
                    ?budget,
                    completed = matches!(settled, Ok(Ok(_))),
                    "Remote command finished after its deadline"
                );
            } else {
                warn!(host, command, ?budget, "Remote command deadline expired before execution");
            }
            Err(RemoteError::timeout(host, command, budget))
        }
    }
}

fn run_blocking(
    config: &SshConfig,
    host: &str,
    command: &str,
    deadline: &CommandDeadline,
) -> Result<CommandOutput> {
    let expired = || RemoteError::timeout(host, command, config.command_timeout());
    let time_left = || deadline.remaining().ok_or_else(expired);

    let addr = (host, config.port)
        .to_socket_addrs()
        .map_err(|e| RemoteError::connect(host, e))?
        .next()
        .ok_or_else(|| RemoteError::connect(host, "host name resolved to no address"))?;

    let connect_budget = config.connect_timeout().min(time_left()?);
    let tcp = TcpStream::connect_timeout(&addr, connect_budget)
        .map_err(|e| RemoteError::connect(host, e))?;

    let mut session = Session::new().map_err(|e| RemoteError::connect(host, e))?;
    session.set_tcp_stream(tcp);
    session.set_timeout(libssh2_millis(time_left()?));
    session.handshake().map_err(|e| RemoteError::connect(host, e))?;

    if let Some(hash) = session.host_key_hash(HashType::Sha256) {
        let fingerprint: String = hash.iter().map(|b| format!("{:02x}", b)).collect();
        debug!(host, fingerprint = %fingerprint, "Accepting host key");
    }

    let user = &config.credentials.user;
    session.set_timeout(libssh2_millis(time_left()?));
    session
        .userauth_password(user, &config.credentials.password)
        .map_err(|e| RemoteError::authentication(host, user, e))?;

    session.set_timeout(libssh2_millis(time_left()?));
    let mut channel = session
        .channel_session()
        .map_err(|e| RemoteError::exec(host, command, e))?;

    if !deadline.admit_exec() {
        return Err(expired());
    }
    channel
        .exec(command)
        .map_err(|e| RemoteError::exec(host, command, e))?;

    // The command is running remotely; wait for it to finish even if the
    // caller has stopped waiting.
    session.set_timeout(libssh2_millis(config.command_timeout()));

    let mut stdout = String::new();
    channel
        .read_to_string(&mut stdout)
        .map_err(|e| RemoteError::exec(host, command, e))?;
    let mut stderr = String::new();
    channel
        .stderr()
        .read_to_string(&mut stderr)
        .map_err(|e| RemoteError::exec(host, command, e))?;

    channel
        .wait_close()
        .map_err(|e| RemoteError::exec(host, command, e))?;
    let exit_status = channel
        .exit_status()
        .map_err(|e| RemoteError::exec(host, command, e))?;

    if let Err(e) = session.disconnect(None, "done", None) {
        debug!(host, error = %e, "SSH disconnect failed");
    }

    debug!(host, command, exit_status, "Remote command finished");

    Ok(CommandOutput {
        stdout,
        stderr,
        exit_status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_unresolvable_host_is_connect_error() {
        let executor = SshExecutor::new(SshConfig {
            connect_timeout_secs: 1,
            command_timeout_secs: 5,
            ..SshConfig::default()
        });

        let err = executor
            .run_command("host.invalid", "true")
            .await
            .unwrap_err();
        assert!(err.is_connection_failure() || err.is_timeout());
    }

    #[test]
    fn test_executor_name() {
        assert_eq!(SshExecutor::new(SshConfig::default()).name(), "ssh");
    }

    #[tokio::test]
    async fn test_late_session_never_runs_the_command() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let work_log = log.clone();

        let err = run_bounded(
            "node1",
            "/sbin/fsfreeze --freeze '/hana/data/mnt1'",
            Duration::from_millis(50),
            move |deadline| {
                // Slow connect and login.
                std::thread::sleep(Duration::from_millis(200));
                let entry = if deadline.admit_exec() { "freeze" } else { "refused" };
                work_log.lock().unwrap().push(entry);
                Ok(())
            },
        )
        .await
        .unwrap_err();

        assert!(err.is_timeout());
        // Settled before the timeout was reported: a following unfreeze
        // cannot be overtaken by a late freeze.
        assert_eq!(*log.lock().unwrap(), vec!["refused"]);
    }

    #[tokio::test]
    async fn test_admitted_command_is_waited_for() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let work_log = log.clone();

        let err = run_bounded(
            "node1",
            "/sbin/fsfreeze --freeze '/hana/data/mnt1'",
            Duration::from_millis(50),
            move |deadline| {
                assert!(deadline.admit_exec());
                work_log.lock().unwrap().push("freeze started");
                std::thread::sleep(Duration::from_millis(200));
                work_log.lock().unwrap().push("freeze finished");
                Ok(())
            },
        )
        .await
        .unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(
            *log.lock().unwrap(),
            vec!["freeze started", "freeze finished"]
        );
    }

    #[tokio::test]
    async fn test_work_within_budget_returns_its_result() {
        let output = run_bounded("node1", "true", Duration::from_secs(5), |deadline| {
            assert!(deadline.admit_exec());
            Ok(CommandOutput::new("ok", 0))
        })
        .await
        .unwrap();

        assert!(output.success());
        assert_eq!(output.stdout, "ok");
    }
}
