//! The fixed set of statements the snapshot protocol issues, and the typed
//! rows they return.
//!
//! Only backup ids and comments are spliced into statements. Comments are
//! produced by the coordinator and quoted with [`sql_literal`].

use serde::Deserialize;

/// Reads the `[multidb] mode` entry of `global.ini`.
pub const DEPLOYMENT_MODE: &str = "SELECT VALUE FROM M_INIFILE_CONTENTS \
     WHERE FILE_NAME = 'global.ini' AND SECTION = 'multidb' AND KEY = 'mode'";

/// Finds the host running the active master name server.
pub const MASTER_NAMESERVER: &str = "SELECT HOST FROM SYS.M_SERVICES \
     WHERE DETAIL = 'master' AND SERVICE_NAME = 'nameserver'";

/// Lists attached data volumes by WWID under the configured data volume base
/// path. Placeholder base paths (starting with `$`) are excluded.
pub const ATTACHED_DATA_VOLUMES: &str = "SELECT HOST, STORAGE_ID, PATH, KEY, VALUE \
     FROM SYS.M_ATTACHED_STORAGES WHERE KEY = 'WWID' AND PATH LIKE \
     (SELECT CONCAT(VALUE, '%') FROM M_INIFILE_CONTENTS \
     WHERE FILE_NAME = 'global.ini' AND SECTION = 'persistence' \
     AND KEY = 'basepath_datavolumes' AND VALUE NOT LIKE '$%')";

/// Value of the `[multidb] mode` entry on multi-tenant systems.
pub const MULTIDB_MODE: &str = "multidb";

/// Marker that starts unexpanded substitution placeholders in paths.
pub const PLACEHOLDER_PREFIX: char = '$';

/// Quotes a value as a SQL string literal.
pub fn sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Opens a backup marker tagged with `comment`.
pub fn prepare_snapshot(comment: &str) -> String {
    format!(
        "BACKUP DATA FOR FULL SYSTEM CREATE SNAPSHOT COMMENT {}",
        sql_literal(comment)
    )
}

/// Looks up the prepared snapshot entry created with `comment`.
pub fn prepared_snapshot_lookup(comment: &str) -> String {
    format!(
        "SELECT BACKUP_ID, COMMENT FROM M_BACKUP_CATALOG \
         WHERE ENTRY_TYPE_NAME = 'data snapshot' AND STATE_NAME = 'prepared' \
         AND COMMENT = {}",
        sql_literal(comment)
    )
}

/// Closes the marker as successful.
pub fn close_successful(backup_id: &str, comment: &str) -> String {
    close_snapshot(backup_id, "SUCCESSFUL", comment)
}

/// Closes the marker as unsuccessful.
pub fn close_unsuccessful(backup_id: &str, comment: &str) -> String {
    close_snapshot(backup_id, "UNSUCCESSFUL", comment)
}

fn close_snapshot(backup_id: &str, outcome: &str, comment: &str) -> String {
    format!(
        "BACKUP DATA FOR FULL SYSTEM CLOSE SNAPSHOT BACKUP_ID {} {} {}",
        backup_id,
        outcome,
        sql_literal(comment)
    )
}

/// Row of [`DEPLOYMENT_MODE`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModeRow {
    /// The configured mode.
    #[serde(rename = "VALUE")]
    pub value: String,
}

impl ModeRow {
    /// Returns true if the mode denotes a multi-tenant system.
    pub fn is_multidb(&self) -> bool {
        self.value.trim().eq_ignore_ascii_case(MULTIDB_MODE)
    }
}

/// Row of [`MASTER_NAMESERVER`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NameServerRow {
    /// Short host name.
    #[serde(rename = "HOST")]
    pub host: String,
}

/// Row of [`ATTACHED_DATA_VOLUMES`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AttachedStorageRow {
    /// Short name of the host the volume is attached to.
    #[serde(rename = "HOST")]
    pub host: String,

    /// Storage partition id.
    #[serde(rename = "STORAGE_ID")]
    pub storage_id: String,

    /// Mount path of the data volume.
    #[serde(rename = "PATH")]
    pub path: String,

    /// Attribute name; always `WWID` for this query.
    #[serde(rename = "KEY")]
    pub key: String,

    /// The world-wide identifier.
    #[serde(rename = "VALUE")]
    pub value: String,
}

impl AttachedStorageRow {
    /// Returns true if the path is an unexpanded placeholder.
    pub fn is_placeholder(&self) -> bool {
        self.path.starts_with(PLACEHOLDER_PREFIX)
    }
}

/// Row of [`prepared_snapshot_lookup`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CatalogRow {
    /// Backup id assigned by the database.
    #[serde(rename = "BACKUP_ID")]
    pub backup_id: String,

    /// The comment the snapshot was prepared with.
    #[serde(rename = "COMMENT", default)]
    pub comment: Option<String>,
}
