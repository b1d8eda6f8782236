//! # Hanasnap Remote - command execution on data volume hosts
//!
//! Opens an authenticated SSH session per command and runs the fixed set of
//! shell invocations the snapshot protocol needs:
//!
//! - `df -P` to find the device behind a mount path
//! - `udevadm info` to read the device-mapper serial number
//! - `fsfreeze --freeze` / `--unfreeze` to suspend and resume writes
//!
//! ## Overview
//!
//! - [`RemoteExecutor`]: the seam; runs one command on one host
//! - [`SshExecutor`]: the libssh2-backed implementation
//! - [`FilesystemOps`]: serial resolution and freeze/thaw built on any executor
//!
//! Unlike a plain command runner, freeze and unfreeze check the remote exit
//! status and fail with [`RemoteError::Freeze`] / [`RemoteError::Unfreeze`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod commands;
pub mod config;
mod deadline;
pub mod error;
pub mod executor;
pub mod filesystem;
pub mod ssh;

pub use config::SshConfig;
pub use error::{RemoteError, Result};
pub use executor::{CommandOutput, RemoteExecutor};
pub use filesystem::FilesystemOps;
pub use ssh::SshExecutor;
