//! Process exit statuses.

use hanasnap_core::{CoordinationResult, Disposition};

use crate::error::CoordinatorError;

/// How a run ended, as seen by the calling shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// The marker was confirmed, or a dry run completed.
    Success,

    /// The configuration was invalid or startup failed.
    ConfigError,

    /// Topology discovery failed; no marker was opened.
    DiscoveryFailed,

    /// The marker could not be opened.
    MarkerOpenFailed,

    /// At least one volume failed; the marker was abandoned.
    VolumeFailures,

    /// The marker could not be confirmed, or may still be open; needs
    /// manual attention.
    Unrecoverable,
}

impl ExitStatus {
    /// Returns the numeric exit code.
    pub fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::ConfigError => 1,
            Self::DiscoveryFailed => 2,
            Self::MarkerOpenFailed => 3,
            Self::VolumeFailures => 4,
            Self::Unrecoverable => 5,
        }
    }

    /// Maps the outcome of a run to an exit status.
    ///
    /// An abandoned marker is a volume failure only when volume failures
    /// caused it; a failed confirm is unrecoverable even if the abandon that
    /// followed succeeded.
    pub fn of(outcome: &Result<CoordinationResult, CoordinatorError>) -> Self {
        match outcome {
            Ok(result) => match (result.disposition(), &result.cause) {
                (Disposition::Confirmed, _) => Self::Success,
                (Disposition::Abandoned, Some(cause)) if !cause.is_volume_failure() => {
                    Self::Unrecoverable
                }
                (Disposition::Abandoned, _) => Self::VolumeFailures,
            },
            Err(err) => err.exit_status(),
        }
    }
}
