//! The database-side backup marker.
//!
//! A marker is opened by the prepare statement and identified by the backup
//! id the database assigns to it. Every later confirm or abandon statement
//! refers to that id. A marker must leave the `Prepared` state exactly once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, Result};

/// Lifecycle state of a backup marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkerState {
    /// The snapshot has been prepared and is waiting for a decision.
    Prepared,

    /// The snapshot was closed as successful.
    Confirmed,

    /// The snapshot was closed as unsuccessful.
    Abandoned,
}

impl MarkerState {
    /// Returns true once a disposition has been issued.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Confirmed | Self::Abandoned)
    }

    fn name(self) -> &'static str {
        match self {
            Self::Prepared => "prepared",
            Self::Confirmed => "confirmed",
            Self::Abandoned => "abandoned",
        }
    }
}

impl fmt::Display for MarkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A backup marker correlating the database with the storage snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupMarker {
    /// Backup id from the backup catalog.
    pub id: String,

    /// When the prepare statement succeeded.
    pub opened_at: DateTime<Utc>,

    /// Current state.
    pub state: MarkerState,
}

impl BackupMarker {
    /// Creates a marker in the `Prepared` state, opened now.
    pub fn prepared(id: impl Into<String>) -> Self {
        Self::prepared_at(id, Utc::now())
    }

    /// Creates a marker in the `Prepared` state with an explicit open time.
    pub fn prepared_at(id: impl Into<String>, opened_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            opened_at,
            state: MarkerState::Prepared,
        }
    }

    /// Returns true while no disposition has been issued.
    pub fn is_open(&self) -> bool {
        self.state == MarkerState::Prepared
    }

    /// Marks the marker as confirmed.
    pub fn confirm(&mut self) -> Result<()> {
        self.transition(MarkerState::Confirmed)
    }

    /// Marks the marker as abandoned.
    pub fn abandon(&mut self) -> Result<()> {
        self.transition(MarkerState::Abandoned)
    }

    fn transition(&mut self, to: MarkerState) -> Result<()> {
        if self.state != MarkerState::Prepared {
            return Err(CoreError::invalid_marker_transition(
                &self.id,
                self.state.name(),
                to.name(),
            ));
        }
        self.state = to;
        Ok(())
    }
}
