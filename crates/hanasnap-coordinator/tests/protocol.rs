//! Protocol scenarios against in-memory adapters.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use hanasnap_array::{ArrayError, VolumeSnapshotter};
use hanasnap_core::{AbandonCause, Disposition, VolumeStage};
use hanasnap_coordinator::{
    CoordinatorConfig, CoordinatorError, ExitStatus, SnapshotCoordinator, PLANNED_MARKER_ID,
};
use hanasnap_db::statements::{
    self, ATTACHED_DATA_VOLUMES, DEPLOYMENT_MODE, MASTER_NAMESERVER,
};
use hanasnap_db::{DatabaseError, Endpoint, HanaConfig, PortSelector, SqlExecutor, SqlRow};
use hanasnap_remote::{CommandOutput, RemoteError, RemoteExecutor};

const BACKUP_ID: &str = "1700000000001";

type Events = Arc<Mutex<Vec<String>>>;

// ---------------------------------------------------------------------------
// Database
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakeDatabase {
    multidb: bool,
    no_mode_rows: bool,
    nameserver: String,
    volumes: Vec<(&'static str, &'static str, &'static str)>,
    omit_path_column: bool,
    catalog_empty: bool,
    fail_prepare: bool,
    fail_confirm: bool,
    fail_abandon: bool,
    prepared_comment: Mutex<Option<String>>,
    calls: Mutex<Vec<(Endpoint, String)>>,
}

/// Returns `SUCCESSFUL` or `UNSUCCESSFUL` for close statements.
fn close_outcome(statement: &str) -> Option<&str> {
    statement
        .strip_prefix("BACKUP DATA FOR FULL SYSTEM CLOSE SNAPSHOT BACKUP_ID ")?
        .split_whitespace()
        .nth(1)
}

impl FakeDatabase {
    fn closes(&self, outcome: &str) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, s)| close_outcome(s) == Some(outcome))
            .map(|(_, s)| s.clone())
            .collect()
    }

    fn statements_matching(&self, needle: &str) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, s)| s.contains(needle))
            .map(|(_, s)| s.clone())
            .collect()
    }

    fn prepares(&self) -> Vec<String> {
        self.statements_matching("CREATE SNAPSHOT")
    }

    fn confirms(&self) -> Vec<String> {
        self.closes("SUCCESSFUL")
    }

    fn abandons(&self) -> Vec<String> {
        self.closes("UNSUCCESSFUL")
    }
}

fn row(columns: &[(&str, &str)]) -> SqlRow {
    columns
        .iter()
        .fold(SqlRow::new(), |row, (column, value)| row.with(*column, Some(*value)))
}

#[async_trait]
impl SqlExecutor for FakeDatabase {
    async fn execute(
        &self,
        endpoint: &Endpoint,
        statement: &str,
    ) -> hanasnap_db::Result<Option<Vec<SqlRow>>> {
        self.calls
            .lock()
            .unwrap()
            .push((endpoint.clone(), statement.to_string()));

        if statement == DEPLOYMENT_MODE {
            if self.no_mode_rows {
                return Ok(Some(vec![]));
            }
            let mode = if self.multidb { "multidb" } else { "singledb" };
            return Ok(Some(vec![row(&[("VALUE", mode)])]));
        }

        if statement == MASTER_NAMESERVER {
            return Ok(Some(vec![row(&[("HOST", self.nameserver.as_str())])]));
        }

        if statement == ATTACHED_DATA_VOLUMES {
            let rows = self
                .volumes
                .iter()
                .enumerate()
                .map(|(i, (host, path, wwid))| {
                    let storage_id = (i + 1).to_string();
                    let mut columns = vec![
                        ("HOST", *host),
                        ("STORAGE_ID", storage_id.as_str()),
                        ("KEY", "WWID"),
                        ("VALUE", *wwid),
                    ];
                    if !self.omit_path_column {
                        columns.push(("PATH", *path));
                    }
                    row(&columns)
                })
                .collect();
            return Ok(Some(rows));
        }

        if statement.starts_with("BACKUP DATA FOR FULL SYSTEM CREATE SNAPSHOT") {
            if self.fail_prepare {
                return Err(DatabaseError::command(statement, "insufficient privilege"));
            }
            let comment = statement
                .split('\'')
                .nth(1)
                .unwrap_or_default()
                .to_string();
            *self.prepared_comment.lock().unwrap() = Some(comment);
            return Ok(None);
        }

        if statement.starts_with("SELECT BACKUP_ID") {
            let prepared = self.prepared_comment.lock().unwrap().clone();
            let matches = prepared
                .map(|c| statement == statements::prepared_snapshot_lookup(&c))
                .unwrap_or(false);
            if self.catalog_empty || !matches {
                return Ok(Some(vec![]));
            }
            return Ok(Some(vec![row(&[("BACKUP_ID", BACKUP_ID), ("COMMENT", "x")])]));
        }

        if close_outcome(statement) == Some("UNSUCCESSFUL") {
            if self.fail_abandon {
                return Err(DatabaseError::connection("shn1:30015", "connection reset"));
            }
            return Ok(None);
        }

        if close_outcome(statement) == Some("SUCCESSFUL") {
            if self.fail_confirm {
                return Err(DatabaseError::command(statement, "backup catalog locked"));
            }
            return Ok(None);
        }

        Err(DatabaseError::command(statement, "unexpected statement"))
    }

    fn name(&self) -> &str {
        "fake-db"
    }
}

// ---------------------------------------------------------------------------
// Hosts
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakeHosts {
    serials: HashMap<(String, String), String>,
    fail_freeze: HashSet<String>,
    expire_freeze: HashSet<String>,
    fail_unfreeze: HashSet<String>,
    frozen: Mutex<HashSet<(String, String)>>,
    overlap: AtomicBool,
    events: Events,
}

impl FakeHosts {
    fn count(&self, what: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.starts_with(what))
            .count()
    }

    fn is_frozen(&self, host: &str, mount: &str) -> bool {
        self.frozen
            .lock()
            .unwrap()
            .contains(&(host.to_string(), mount.to_string()))
    }
}

#[async_trait]
impl RemoteExecutor for FakeHosts {
    async fn run_command(&self, host: &str, command: &str) -> hanasnap_remote::Result<CommandOutput> {
        let arg = command.split('\'').nth(1).unwrap_or_default().to_string();

        if command.starts_with("df -P") {
            self.events.lock().unwrap().push(format!("df {} {}", host, arg));
            return Ok(match self.serials.get(&(host.to_string(), arg.clone())) {
                Some(serial) => CommandOutput::new(
                    format!("/dev/mapper/{} 536608768 8402244 528206524 2% {}\n", serial, arg),
                    0,
                ),
                None => CommandOutput::new("", 1),
            });
        }

        if command.starts_with("udevadm") {
            let serial = arg.trim_start_matches("/dev/mapper/");
            return Ok(CommandOutput::new(format!("E: DM_SERIAL={}\n", serial), 0));
        }

        let key = (host.to_string(), arg.clone());
        if command.contains("--unfreeze") {
            self.events.lock().unwrap().push(format!("unfreeze {} {}", host, arg));
            self.frozen.lock().unwrap().remove(&key);
            if self.fail_unfreeze.contains(&arg) {
                return Ok(CommandOutput::new("", 1).with_stderr("unfreeze failed"));
            }
            return Ok(CommandOutput::new("", 0));
        }

        if command.contains("--freeze") {
            self.events.lock().unwrap().push(format!("freeze {} {}", host, arg));
            if self.fail_freeze.contains(&arg) {
                return Ok(CommandOutput::new("", 1).with_stderr("Device or resource busy"));
            }
            // A session that missed its deadline never runs the command.
            if self.expire_freeze.contains(&arg) {
                return Err(RemoteError::timeout(host, command, Duration::from_secs(60)));
            }
            let mut frozen = self.frozen.lock().unwrap();
            if frozen.iter().any(|(h, _)| h == host) {
                self.overlap.store(true, Ordering::SeqCst);
            }
            frozen.insert(key);
            return Ok(CommandOutput::new("", 0));
        }

        Err(RemoteError::exec(host, command, "unexpected command"))
    }

    fn name(&self) -> &str {
        "fake-hosts"
    }
}

// ---------------------------------------------------------------------------
// Array
// ---------------------------------------------------------------------------

#[derive(Clone)]
enum Outcome {
    Created(&'static str),
    Rejected,
    Hang,
}

#[derive(Default)]
struct FakeArray {
    outcomes: HashMap<String, Outcome>,
    delay: Duration,
    calls: Mutex<Vec<(String, String)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    events: Events,
}

impl FakeArray {
    fn suffixes(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(_, s)| s.clone()).collect()
    }
}

#[async_trait]
impl VolumeSnapshotter for FakeArray {
    async fn snapshot(&self, volume_serial: &str, suffix: &str) -> hanasnap_array::Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((volume_serial.to_string(), suffix.to_string()));
        self.events
            .lock()
            .unwrap()
            .push(format!("snapshot {}", volume_serial));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let outcome = self.outcomes.get(volume_serial).cloned();
        if let Some(Outcome::Hang) = outcome {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match outcome {
            Some(Outcome::Created(id)) => Ok(id.to_string()),
            Some(Outcome::Rejected) => Err(ArrayError::snapshot_creation("vol", "HTTP 400")),
            _ => Err(ArrayError::volume_not_found(volume_serial)),
        }
    }

    fn name(&self) -> &str {
        "fake-array"
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

struct Harness {
    db: Arc<FakeDatabase>,
    hosts: Arc<FakeHosts>,
    array: Arc<FakeArray>,
    hana: HanaConfig,
    config: CoordinatorConfig,
    events: Events,
}

impl Harness {
    /// Volumes as `(host, mount, serial)`; serials are registered on the
    /// hosts and snapshots succeed with id `SNAP-<n>`.
    fn new(volumes: &[(&'static str, &'static str, &'static str)]) -> Self {
        let events: Events = Arc::new(Mutex::new(Vec::new()));
        let ids = ["SNAP-1", "SNAP-2", "SNAP-3", "SNAP-4", "SNAP-5", "SNAP-6"];

        let db = FakeDatabase {
            nameserver: "shn1".to_string(),
            volumes: volumes
                .iter()
                .map(|(host, mount, _)| (*host, *mount, "wwid"))
                .collect(),
            ..Default::default()
        };
        let hosts = FakeHosts {
            serials: volumes
                .iter()
                .map(|(host, mount, serial)| ((host.to_string(), mount.to_string()), serial.to_string()))
                .collect(),
            events: events.clone(),
            ..Default::default()
        };
        let array = FakeArray {
            outcomes: volumes
                .iter()
                .zip(ids)
                .map(|((_, _, serial), id)| (serial.to_string(), Outcome::Created(id)))
                .collect(),
            events: events.clone(),
            ..Default::default()
        };

        Self {
            db: Arc::new(db),
            hosts: Arc::new(hosts),
            array: Arc::new(array),
            hana: HanaConfig {
                host: "shn1".to_string(),
                ..Default::default()
            },
            config: CoordinatorConfig::default(),
            events,
        }
    }

    fn db(mut self, f: impl FnOnce(&mut FakeDatabase)) -> Self {
        f(Arc::get_mut(&mut self.db).unwrap());
        self
    }

    fn hosts(mut self, f: impl FnOnce(&mut FakeHosts)) -> Self {
        f(Arc::get_mut(&mut self.hosts).unwrap());
        self
    }

    fn array(mut self, f: impl FnOnce(&mut FakeArray)) -> Self {
        f(Arc::get_mut(&mut self.array).unwrap());
        self
    }

    fn coordinator(&self) -> SnapshotCoordinator {
        SnapshotCoordinator::new(
            self.db.clone(),
            self.hana.clone(),
            self.hosts.clone(),
            self.array.clone(),
            self.config.clone(),
        )
        .unwrap()
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_single_volume_is_confirmed_with_snapshot_id() {
    let h = Harness::new(&[("node1", "/hana/data/mnt1", "ABC123")]);

    let outcome = h.coordinator().run().await;
    let result = outcome.as_ref().unwrap();

    assert_eq!(result.disposition(), Disposition::Confirmed);
    assert_eq!(result.marker.id, BACKUP_ID);
    assert_eq!(ExitStatus::of(&outcome), ExitStatus::Success);

    assert_eq!(h.db.prepares().len(), 1);
    assert_eq!(
        h.events(),
        vec![
            "df node1 /hana/data/mnt1",
            "freeze node1 /hana/data/mnt1",
            "snapshot ABC123",
            "unfreeze node1 /hana/data/mnt1",
        ]
    );

    let calls = h.array.calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "ABC123");
    assert!(calls[0].1.contains("node1"));
    assert!(calls[0].1.contains(BACKUP_ID));

    let confirms = h.db.confirms();
    assert_eq!(confirms.len(), 1);
    assert!(confirms[0].contains(&format!("BACKUP_ID {}", BACKUP_ID)));
    assert!(confirms[0].contains("SNAP-1"));
    assert!(h.db.abandons().is_empty());

    let record = &result.records[0];
    assert_eq!(record.serial_number.as_deref(), Some("ABC123"));
    assert_eq!(record.snapshot_id.as_deref(), Some("SNAP-1"));
}

#[tokio::test]
async fn test_volume_not_found_still_unfreezes_and_abandons() {
    let h = Harness::new(&[("node1", "/hana/data/mnt1", "ABC123")])
        .array(|a| a.outcomes.clear());

    let outcome = h.coordinator().run().await;
    let result = outcome.as_ref().unwrap();

    assert_eq!(result.disposition(), Disposition::Abandoned);
    assert_eq!(ExitStatus::of(&outcome), ExitStatus::VolumeFailures);
    assert_eq!(h.hosts.count("freeze"), 1);
    assert_eq!(h.hosts.count("unfreeze"), 1);

    let failure = result.records[0].failure.as_ref().unwrap();
    assert_eq!(failure.stage, VolumeStage::Snapshot);
    assert!(failure.message.contains("ABC123"));

    assert_eq!(result.cause, Some(AbandonCause::VolumeFailures { failed: 1 }));

    assert!(h.db.confirms().is_empty());
    let abandons = h.db.abandons();
    assert_eq!(abandons.len(), 1);
    assert!(abandons[0].contains("volume failures: 1"));
}

#[tokio::test]
async fn test_zero_volumes_confirm_immediately() {
    let h = Harness::new(&[]);

    let result = h.coordinator().run().await.unwrap();

    assert_eq!(result.disposition(), Disposition::Confirmed);
    assert!(result.records.is_empty());
    assert!(h.events().is_empty());
    assert_eq!(h.db.prepares().len(), 1);

    let confirms = h.db.confirms();
    assert_eq!(confirms.len(), 1);
    assert!(confirms[0].contains("FlashArray Snapshot ID : none"));
}

#[tokio::test]
async fn test_one_failed_snapshot_abandons_and_thaws_every_volume() {
    let h = Harness::new(&[
        ("node1", "/hana/data/mnt00001", "S1"),
        ("node2", "/hana/data/mnt00002", "S2"),
        ("node3", "/hana/data/mnt00003", "S3"),
    ])
    .array(|a| {
        a.outcomes.insert("S2".to_string(), Outcome::Rejected);
    });

    let result = h.coordinator().run().await.unwrap();

    assert_eq!(result.disposition(), Disposition::Abandoned);
    assert_eq!(h.hosts.count("freeze"), 3);
    assert_eq!(h.hosts.count("unfreeze"), 3);
    assert_eq!(h.array.calls.lock().unwrap().len(), 3);

    assert!(result.records[0].is_success());
    assert!(!result.records[1].is_success());
    assert!(result.records[2].is_success());
    assert_eq!(result.failures().count(), 1);
    assert_eq!(h.db.abandons().len(), 1);
    assert!(h.db.confirms().is_empty());
}

#[tokio::test]
async fn test_failed_freeze_skips_snapshot_but_attempts_unfreeze() {
    let h = Harness::new(&[("node1", "/hana/data/mnt1", "ABC123")])
        .hosts(|hosts| {
            hosts.fail_freeze.insert("/hana/data/mnt1".to_string());
        });

    let result = h.coordinator().run().await.unwrap();

    assert_eq!(result.disposition(), Disposition::Abandoned);
    assert!(h.array.calls.lock().unwrap().is_empty());
    assert_eq!(h.hosts.count("unfreeze"), 1);
    assert_eq!(
        result.records[0].failure.as_ref().unwrap().stage,
        VolumeStage::Freeze
    );
}

#[tokio::test]
async fn test_expired_freeze_leaves_volume_thawed() {
    let h = Harness::new(&[
        ("node1", "/hana/data/mnt00001", "S1"),
        ("node1", "/hana/data/mnt00002", "S2"),
    ])
    .hosts(|hosts| {
        hosts.expire_freeze.insert("/hana/data/mnt00001".to_string());
    });

    let outcome = h.coordinator().run().await;
    let result = outcome.as_ref().unwrap();

    assert_eq!(result.disposition(), Disposition::Abandoned);
    assert_eq!(ExitStatus::of(&outcome), ExitStatus::VolumeFailures);

    let failure = result.records[0].failure.as_ref().unwrap();
    assert_eq!(failure.stage, VolumeStage::Freeze);
    assert!(failure.message.contains("timed out"));
    assert!(result.records[1].is_success());

    assert_eq!(h.hosts.count("unfreeze"), 2);
    assert!(!h.hosts.is_frozen("node1", "/hana/data/mnt00001"));
    assert!(!h.hosts.is_frozen("node1", "/hana/data/mnt00002"));
    assert_eq!(h.array.suffixes().len(), 1);
}

#[tokio::test]
async fn test_unresolvable_serial_never_freezes() {
    let h = Harness::new(&[("node1", "/hana/data/mnt1", "ABC123")])
        .hosts(|hosts| hosts.serials.clear());

    let result = h.coordinator().run().await.unwrap();

    assert_eq!(result.disposition(), Disposition::Abandoned);
    assert_eq!(h.hosts.count("freeze"), 0);
    assert_eq!(h.hosts.count("unfreeze"), 0);
    assert_eq!(
        result.records[0].failure.as_ref().unwrap().stage,
        VolumeStage::SerialResolution
    );
}

#[tokio::test]
async fn test_failed_unfreeze_abandons_marker() {
    let h = Harness::new(&[("node1", "/hana/data/mnt1", "ABC123")])
        .hosts(|hosts| {
            hosts.fail_unfreeze.insert("/hana/data/mnt1".to_string());
        });

    let result = h.coordinator().run().await.unwrap();

    assert_eq!(result.disposition(), Disposition::Abandoned);
    let record = &result.records[0];
    assert_eq!(record.snapshot_id.as_deref(), Some("SNAP-1"));
    assert_eq!(record.failure.as_ref().unwrap().stage, VolumeStage::Unfreeze);
}

#[tokio::test]
async fn test_multi_tenant_uses_system_database_port() {
    let mut h = Harness::new(&[("shn2", "/hana/data/SH1/mnt00001", "S1")])
        .db(|db| {
            db.multidb = true;
            db.nameserver = "shn1".to_string();
        })
        .hosts(|hosts| {
            hosts.serials = HashMap::from([(
                ("shn2.example.local".to_string(), "/hana/data/SH1/mnt00001".to_string()),
                "S1".to_string(),
            )]);
        });
    h.hana.domain_name = Some("example.local".to_string());

    let result = h.coordinator().run().await.unwrap();
    assert_eq!(result.disposition(), Disposition::Confirmed);
    assert_eq!(result.records[0].volume.host, "shn2.example.local");

    let calls = h.db.calls.lock().unwrap().clone();
    assert_eq!(calls[0].1, DEPLOYMENT_MODE);
    assert_eq!(calls[0].0.selector, PortSelector::Tenant(15));

    let after_mode: Vec<&(Endpoint, String)> = calls
        .iter()
        .filter(|(_, s)| s != DEPLOYMENT_MODE && s != MASTER_NAMESERVER)
        .collect();
    assert!(!after_mode.is_empty());
    for (endpoint, statement) in after_mode {
        assert_eq!(endpoint.selector, PortSelector::SystemDatabase, "{}", statement);
        assert_eq!(endpoint.host, "shn1.example.local");
    }
}

#[tokio::test]
async fn test_single_tenant_uses_tenant_port() {
    let h = Harness::new(&[("node1", "/hana/data/mnt1", "ABC123")]);

    h.coordinator().run().await.unwrap();

    let calls = h.db.calls.lock().unwrap().clone();
    assert!(calls
        .iter()
        .all(|(endpoint, _)| endpoint.selector == PortSelector::Tenant(15)));
    assert!(h.db.statements_matching(MASTER_NAMESERVER).is_empty());
}

#[tokio::test]
async fn test_discovery_without_mode_rows_opens_no_marker() {
    let h = Harness::new(&[("node1", "/hana/data/mnt1", "ABC123")])
        .db(|db| db.no_mode_rows = true);

    let outcome = h.coordinator().run().await;

    assert!(matches!(outcome, Err(CoordinatorError::Discovery(_))));
    assert_eq!(ExitStatus::of(&outcome), ExitStatus::DiscoveryFailed);
    assert!(h.db.prepares().is_empty());
    assert!(h.events().is_empty());
}

#[tokio::test]
async fn test_missing_storage_column_is_discovery_error() {
    let h = Harness::new(&[("node1", "/hana/data/mnt1", "ABC123")])
        .db(|db| db.omit_path_column = true);

    let outcome = h.coordinator().run().await;

    match &outcome {
        Err(CoordinatorError::Discovery(reason)) => assert!(reason.contains("PATH")),
        other => panic!("expected Discovery, got {:?}", other),
    }
    assert_eq!(ExitStatus::of(&outcome), ExitStatus::DiscoveryFailed);
    assert_eq!(ExitStatus::of(&outcome).code(), 2);
    assert!(h.db.prepares().is_empty());
    assert!(h.events().is_empty());
}

#[tokio::test]
async fn test_rejected_prepare_touches_no_volume() {
    let h = Harness::new(&[("node1", "/hana/data/mnt1", "ABC123")])
        .db(|db| db.fail_prepare = true);

    let outcome = h.coordinator().run().await;

    assert!(matches!(outcome, Err(CoordinatorError::MarkerOpen(_))));
    assert_eq!(ExitStatus::of(&outcome), ExitStatus::MarkerOpenFailed);
    assert!(h.events().is_empty());
    assert!(h.db.abandons().is_empty());
}

#[tokio::test]
async fn test_missing_catalog_entry_is_marker_loss() {
    let h = Harness::new(&[("node1", "/hana/data/mnt1", "ABC123")])
        .db(|db| db.catalog_empty = true);

    let outcome = h.coordinator().run().await;

    assert!(matches!(outcome, Err(CoordinatorError::MarkerLoss { .. })));
    assert_eq!(ExitStatus::of(&outcome), ExitStatus::Unrecoverable);
    assert!(h.events().is_empty());
    assert!(h.db.confirms().is_empty());
    assert!(h.db.abandons().is_empty());
}

#[tokio::test]
async fn test_failed_confirm_falls_back_to_abandon() {
    let h = Harness::new(&[("node1", "/hana/data/mnt1", "ABC123")])
        .db(|db| db.fail_confirm = true);

    let outcome = h.coordinator().run().await;
    let result = outcome.as_ref().unwrap();

    assert_eq!(result.disposition(), Disposition::Abandoned);
    assert_eq!(result.failures().count(), 0);
    assert_eq!(
        result.cause,
        Some(AbandonCause::ConfirmFailed {
            reason: "backup catalog locked".to_string()
        })
    );
    assert_eq!(ExitStatus::of(&outcome), ExitStatus::Unrecoverable);
    assert_eq!(h.db.confirms().len(), 1);

    let abandons = h.db.abandons();
    assert_eq!(abandons.len(), 1);
    assert!(abandons[0].contains("backup catalog locked"));
}

#[tokio::test]
async fn test_unclosable_marker_requires_manual_intervention() {
    let h = Harness::new(&[("node1", "/hana/data/mnt1", "ABC123")]).db(|db| {
        db.fail_confirm = true;
        db.fail_abandon = true;
    });

    let outcome = h.coordinator().run().await;

    match &outcome {
        Err(CoordinatorError::MarkerClose {
            backup_id,
            guidance,
            ..
        }) => {
            assert_eq!(backup_id, BACKUP_ID);
            assert!(guidance.starts_with(&format!(
                "BACKUP DATA FOR FULL SYSTEM CLOSE SNAPSHOT BACKUP_ID {} UNSUCCESSFUL",
                BACKUP_ID
            )));
        }
        other => panic!("expected MarkerClose, got {:?}", other),
    }
    assert_eq!(ExitStatus::of(&outcome), ExitStatus::Unrecoverable);
    assert_eq!(h.hosts.count("unfreeze"), 1);
}

#[tokio::test]
async fn test_snapshot_timeout_still_unfreezes() {
    let mut h = Harness::new(&[("node1", "/hana/data/mnt1", "ABC123")]).array(|a| {
        a.outcomes.insert("ABC123".to_string(), Outcome::Hang);
    });
    h.config.snapshot_timeout_secs = 1;

    let result = h.coordinator().run().await.unwrap();

    assert_eq!(result.disposition(), Disposition::Abandoned);
    assert_eq!(h.hosts.count("unfreeze"), 1);
    let failure = result.records[0].failure.as_ref().unwrap();
    assert_eq!(failure.stage, VolumeStage::Snapshot);
    assert!(failure.message.contains("timed out"));
}

#[tokio::test]
async fn test_suffixes_are_unique_when_mounts_sanitize_alike() {
    let h = Harness::new(&[
        ("node1", "/hana/data/mnt_1", "S1"),
        ("node1", "/hana/data/mnt-1", "S2"),
        ("node2", "/hana/data/mnt_1", "S3"),
    ]);

    let result = h.coordinator().run().await.unwrap();
    assert_eq!(result.disposition(), Disposition::Confirmed);

    let suffixes = h.array.suffixes();
    let unique: HashSet<&String> = suffixes.iter().collect();
    assert_eq!(suffixes.len(), 3);
    assert_eq!(unique.len(), 3);
    assert!(suffixes.iter().all(|s| s.contains(BACKUP_ID)));
}

#[tokio::test]
async fn test_hosts_run_concurrently_but_volumes_on_a_host_do_not() {
    let mut h = Harness::new(&[
        ("node1", "/hana/data/mnt00001", "S1"),
        ("node2", "/hana/data/mnt00002", "S2"),
        ("node1", "/hana/data/mnt00003", "S3"),
        ("node2", "/hana/data/mnt00004", "S4"),
    ])
    .array(|a| a.delay = Duration::from_millis(50));
    h.config.max_concurrent_hosts = 2;

    let result = h.coordinator().run().await.unwrap();

    assert_eq!(result.disposition(), Disposition::Confirmed);
    assert!(!h.hosts.overlap.load(Ordering::SeqCst));
    assert_eq!(h.array.max_in_flight.load(Ordering::SeqCst), 2);

    let mounts: Vec<&str> = result
        .records
        .iter()
        .map(|r| r.volume.mount_path.as_str())
        .collect();
    assert_eq!(
        mounts,
        vec![
            "/hana/data/mnt00001",
            "/hana/data/mnt00002",
            "/hana/data/mnt00003",
            "/hana/data/mnt00004",
        ]
    );
}

#[tokio::test]
async fn test_sequential_by_default() {
    let h = Harness::new(&[
        ("node1", "/hana/data/mnt00001", "S1"),
        ("node2", "/hana/data/mnt00002", "S2"),
    ])
    .array(|a| a.delay = Duration::from_millis(10));

    h.coordinator().run().await.unwrap();

    assert_eq!(h.array.max_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(
        h.events(),
        vec![
            "df node1 /hana/data/mnt00001",
            "freeze node1 /hana/data/mnt00001",
            "snapshot S1",
            "unfreeze node1 /hana/data/mnt00001",
            "df node2 /hana/data/mnt00002",
            "freeze node2 /hana/data/mnt00002",
            "snapshot S2",
            "unfreeze node2 /hana/data/mnt00002",
        ]
    );
}

#[tokio::test]
async fn test_placeholder_paths_are_skipped() {
    let h = Harness::new(&[
        ("node1", "/hana/data/mnt00001", "S1"),
        ("node1", "$(DIR_INSTANCE)/../data/mnt00002", "S2"),
    ]);

    let discovery = h.coordinator().discover().await.unwrap();

    assert_eq!(discovery.topology.len(), 1);
    assert_eq!(discovery.topology.volumes()[0].mount_path, "/hana/data/mnt00001");
}

#[tokio::test]
async fn test_plan_has_no_side_effects() {
    let h = Harness::new(&[("node1", "/hana/data/mnt1", "ABC123")]);

    let plan = h.coordinator().plan().await.unwrap();

    assert_eq!(plan.volumes.len(), 1);
    assert!(plan.volumes[0].suffix.contains(PLANNED_MARKER_ID));
    assert!(h.db.prepares().is_empty());
    assert!(h.events().is_empty());
}

#[test]
fn test_zero_concurrency_is_rejected() {
    let mut h = Harness::new(&[]);
    h.config.max_concurrent_hosts = 0;

    let result = SnapshotCoordinator::new(
        h.db.clone(),
        h.hana.clone(),
        h.hosts.clone(),
        h.array.clone(),
        h.config.clone(),
    );
    assert!(matches!(result, Err(CoordinatorError::Configuration(_))));
}
