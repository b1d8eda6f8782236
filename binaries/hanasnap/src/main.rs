//! Hanasnap - application-consistent storage snapshots of SAP HANA.
//!
//! Discovers the data volumes of a scale-out system, opens a snapshot backup
//! marker, freezes and snapshots every data volume on the FlashArray, and
//! confirms or abandons the marker. The process exit code tells the calling
//! scheduler how the run ended.

use anyhow::{Context, Result};
use clap::Parser;
use hanasnap_array::FlashArrayClient;
use hanasnap_coordinator::{ExitStatus, SnapshotCoordinator, SnapshotPlan};
use hanasnap_core::{CoordinationResult, Disposition};
use hanasnap_db::SqlExecutor;
use hanasnap_remote::SshExecutor;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;

use config::{LoggingConfig, SnapConfig};

/// Hanasnap - coordinated SAP HANA data volume snapshots
#[derive(Parser, Debug)]
#[command(name = "hanasnap")]
#[command(about = "Create an application-consistent SAP HANA storage snapshot on a FlashArray")]
#[command(version)]
pub struct CliArgs {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Address of any worker host in the cluster
    #[arg(long, value_name = "HOST")]
    pub host_address: Option<String>,

    /// Domain appended to the host names the database reports
    #[arg(long, value_name = "DOMAIN")]
    pub domain_name: Option<String>,

    /// Two-digit instance number
    #[arg(long, value_name = "NN")]
    pub instance_number: Option<u8>,

    /// Database or tenant name
    #[arg(long, value_name = "NAME")]
    pub database_name: Option<String>,

    /// Two-digit port selector of the tenant database
    #[arg(long, value_name = "NN")]
    pub port: Option<u8>,

    /// Database user allowed to create storage snapshots
    #[arg(long, value_name = "USER")]
    pub database_user: Option<String>,

    /// Database password
    #[arg(long, env = "HANASNAP_DATABASE_PASSWORD", hide_env_values = true)]
    pub database_password: Option<String>,

    /// Operating system user on the worker hosts
    #[arg(long, value_name = "USER")]
    pub os_user: Option<String>,

    /// Operating system password
    #[arg(long, env = "HANASNAP_OS_PASSWORD", hide_env_values = true)]
    pub os_password: Option<String>,

    /// FlashArray management address
    #[arg(long, value_name = "ADDRESS")]
    pub flash_array: Option<String>,

    /// FlashArray user
    #[arg(long, value_name = "USER")]
    pub flash_array_user: Option<String>,

    /// FlashArray password
    #[arg(long, env = "HANASNAP_FLASH_ARRAY_PASSWORD", hide_env_values = true)]
    pub flash_array_password: Option<String>,

    /// Hosts processed concurrently (volumes on one host stay serial)
    #[arg(long, value_name = "N")]
    pub max_concurrent_hosts: Option<usize>,

    /// Accept any FlashArray certificate
    #[arg(long)]
    pub no_verify_tls: bool,

    /// Discover and print the planned snapshots without touching anything
    #[arg(long)]
    pub dry_run: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Enable JSON log output
    #[arg(long)]
    pub json_logs: bool,

    /// Print default configuration and exit
    #[arg(long)]
    pub print_config: bool,
}

/// Initialize tracing/logging
fn init_tracing(config: &LoggingConfig, json_logs: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json_logs || config.format == "json" {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
            .context("Failed to initialize JSON tracing subscriber")?;
    } else if config.format == "compact" {
        subscriber
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .try_init()
            .context("Failed to initialize compact tracing subscriber")?;
    } else {
        subscriber
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .try_init()
            .context("Failed to initialize pretty tracing subscriber")?;
    }

    Ok(())
}

#[cfg(feature = "hana")]
fn sql_executor(config: &SnapConfig) -> hanasnap_db::Result<Arc<dyn SqlExecutor>> {
    Ok(Arc::new(hanasnap_db::HanaExecutor::new(config.database.clone())))
}

#[cfg(not(feature = "hana"))]
fn sql_executor(_config: &SnapConfig) -> hanasnap_db::Result<Arc<dyn SqlExecutor>> {
    Err(hanasnap_db::DatabaseError::DriverUnavailable(
        "rebuild with `--features hana`".to_string(),
    ))
}

fn load_config(args: &CliArgs) -> Result<SnapConfig> {
    let mut config = if let Some(ref path) = args.config {
        SnapConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?
    } else {
        SnapConfig::default()
    };

    config.merge_cli_args(args);
    config
        .validate(args.dry_run)
        .context("Invalid configuration")?;

    Ok(config)
}

fn build_coordinator(config: &SnapConfig) -> Result<SnapshotCoordinator> {
    let sql = sql_executor(config).context("Database access unavailable")?;
    let remote = Arc::new(SshExecutor::new(config.remote.clone()));
    let array = Arc::new(FlashArrayClient::new(config.array.clone()));

    let coordinator = SnapshotCoordinator::new(
        sql,
        config.database.clone(),
        remote,
        array,
        config.coordinator.clone(),
    )?;
    Ok(coordinator)
}

fn report_plan(plan: &SnapshotPlan) {
    info!(
        mode = %plan.discovery.mode,
        endpoint = %plan.discovery.endpoint,
        volumes = plan.volumes.len(),
        "Dry run complete"
    );
    for planned in &plan.volumes {
        println!(
            "{}\t{}\t{}\t{}",
            planned.volume.host, planned.volume.mount_path, planned.volume.wwid, planned.suffix
        );
    }
}

fn report_result(result: &CoordinationResult) {
    for record in &result.records {
        match (&record.snapshot_id, &record.failure) {
            (Some(id), None) => println!(
                "{}\t{}\t{}\t{}",
                record.volume.host, record.volume.mount_path, record.snapshot_suffix, id
            ),
            (_, Some(failure)) => warn!(
                host = %record.volume.host,
                mount = %record.volume.mount_path,
                snapshot_id = record.snapshot_id.as_deref().unwrap_or("-"),
                "Volume {}",
                failure
            ),
            (None, None) => warn!(
                host = %record.volume.host,
                mount = %record.volume.mount_path,
                "Volume produced no snapshot"
            ),
        }
    }

    match result.disposition() {
        Disposition::Confirmed => info!(
            backup_id = %result.marker.id,
            snapshots = result.snapshot_ids().len(),
            "Backup marker confirmed"
        ),
        Disposition::Abandoned => {
            let cause = result
                .cause
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "unknown".to_string());
            error!(
                backup_id = %result.marker.id,
                failed = result.failures().count(),
                cause = %cause,
                "Backup marker abandoned"
            );
        }
    }
}

async fn execute(args: &CliArgs, config: &SnapConfig) -> Result<ExitStatus> {
    let coordinator = build_coordinator(config)?;

    if args.dry_run {
        return Ok(match coordinator.plan().await {
            Ok(plan) => {
                report_plan(&plan);
                ExitStatus::Success
            }
            Err(e) => {
                error!(error = %e, "Dry run failed");
                e.exit_status()
            }
        });
    }

    let outcome = coordinator.run().await;
    match &outcome {
        Ok(result) => report_result(result),
        Err(e) if e.is_unrecoverable() => error!(error = %e, "Manual intervention required"),
        Err(e) => error!(error = %e, "Snapshot run failed"),
    }

    Ok(ExitStatus::of(&outcome))
}

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    if args.print_config {
        match toml::to_string_pretty(&SnapConfig::default()) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: {:#}", e);
                std::process::exit(ExitStatus::ConfigError.code());
            }
        }
        return;
    }

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(ExitStatus::ConfigError.code());
        }
    };

    if let Err(e) = init_tracing(&config.logging, args.json_logs) {
        eprintln!("Error: {:#}", e);
        std::process::exit(ExitStatus::ConfigError.code());
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.database.host,
        dry_run = args.dry_run,
        "Starting hanasnap"
    );

    let status = match execute(&args, &config).await {
        Ok(status) => status,
        Err(e) => {
            error!(error = %format!("{:#}", e), "Startup failed");
            ExitStatus::ConfigError
        }
    };

    std::process::exit(status.code());
}
