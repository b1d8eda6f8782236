//! Opening and closing the backup marker.

use chrono::{DateTime, Utc};
use hanasnap_core::{BackupMarker, VolumeSnapshotRecord};
use hanasnap_db::statements::{self, CatalogRow};
use hanasnap_db::Database;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::{CoordinatorError, Result};

/// Prefix of the confirmation comment; followed by the snapshot ids.
pub const CONFIRM_COMMENT_PREFIX: &str = "FlashArray Snapshot ID : ";

/// Builds the comment a marker is prepared with.
pub fn prepare_comment(now: DateTime<Utc>, run_id: &Uuid) -> String {
    let run = run_id.simple().to_string();
    format!("SNAPSHOT-{}-{}", now.format("%Y-%m-%dT%H:%M:%S"), &run[..8])
}

/// Builds the confirmation comment listing `<suffix>:<snapshot id>` pairs.
pub fn confirm_comment(records: &[VolumeSnapshotRecord]) -> String {
    let ids: Vec<String> = records
        .iter()
        .filter_map(|r| {
            r.snapshot_id
                .as_ref()
                .map(|id| format!("{}:{}", r.snapshot_suffix, id))
        })
        .collect();

    if ids.is_empty() {
        format!("{}none", CONFIRM_COMMENT_PREFIX)
    } else {
        format!("{}{}", CONFIRM_COMMENT_PREFIX, ids.join(","))
    }
}

/// Where the run stands with respect to its marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerTracker {
    /// No prepare statement has succeeded.
    NotOpened,

    /// A marker is open and must be closed before the run ends.
    Open(BackupMarker),

    /// The marker received its disposition.
    Closed(BackupMarker),
}

impl MarkerTracker {
    /// Returns the open marker, if any.
    pub fn open_marker(&self) -> Option<&BackupMarker> {
        match self {
            Self::Open(marker) => Some(marker),
            _ => None,
        }
    }
}

/// Issues marker statements at the administrative endpoint.
pub struct MarkerControl {
    db: Database,
}

impl MarkerControl {
    /// Creates marker control over an administrative database binding.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Prepares a snapshot tagged with `comment` and looks up its backup id.
    ///
    /// A rejected prepare is [`CoordinatorError::MarkerOpen`]. Any failure
    /// after the prepare succeeded is [`CoordinatorError::MarkerLoss`].
    pub async fn open(&self, comment: &str) -> Result<BackupMarker> {
        self.db
            .execute(&statements::prepare_snapshot(comment))
            .await
            .map_err(CoordinatorError::marker_open)?;

        let rows: Vec<CatalogRow> = self
            .db
            .query_as(&statements::prepared_snapshot_lookup(comment))
            .await
            .map_err(|e| CoordinatorError::marker_loss(comment, e))?;

        let row = rows.into_iter().next().ok_or_else(|| {
            CoordinatorError::marker_loss(comment, "catalog lookup returned no rows")
        })?;

        let marker = BackupMarker::prepared(row.backup_id);
        info!(backup_id = %marker.id, comment, "Backup marker opened");
        Ok(marker)
    }

    /// Closes the marker as successful.
    pub async fn confirm(&self, marker: &mut BackupMarker, comment: &str) -> hanasnap_db::Result<()> {
        self.db
            .execute(&statements::close_successful(&marker.id, comment))
            .await?;
        mark(marker, BackupMarker::confirm);
        info!(backup_id = %marker.id, "Backup marker confirmed");
        Ok(())
    }

    /// Closes the marker as unsuccessful.
    pub async fn abandon(&self, marker: &mut BackupMarker, reason: &str) -> hanasnap_db::Result<()> {
        self.db
            .execute(&statements::close_unsuccessful(&marker.id, reason))
            .await?;
        mark(marker, BackupMarker::abandon);
        warn!(backup_id = %marker.id, reason, "Backup marker abandoned");
        Ok(())
    }

    /// Abandons the marker or reports that it must be closed by hand.
    pub async fn abandon_or_escalate(&self, marker: &mut BackupMarker, reason: &str) -> Result<()> {
        match self.abandon(marker, reason).await {
            Ok(()) => Ok(()),
            Err(e) => {
                let guidance = statements::close_unsuccessful(&marker.id, reason);
                error!(
                    backup_id = %marker.id,
                    error = %e,
                    guidance = %guidance,
                    "Backup marker could not be closed; manual intervention required"
                );
                Err(CoordinatorError::marker_close(&marker.id, e, guidance))
            }
        }
    }
}

fn mark(marker: &mut BackupMarker, transition: fn(&mut BackupMarker) -> hanasnap_core::Result<()>) {
    if let Err(e) = transition(marker) {
        warn!(backup_id = %marker.id, error = %e, "Marker state already terminal");
    }
}
