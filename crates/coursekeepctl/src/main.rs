//! coursekeepctl - operator CLI for course access
//!
//! Wires together:
//! - Configuration loading
//! - Store initialization
//! - The access ledger (enforcement point)
//!
//! `evaluate` works on a JSON file alone and never touches the store.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use coursekeep_api::{Enrollment, ExtendAccessRequest, ExtendAccessResponse, RevocationReason};
use coursekeep_config::{Config, StoreConfig, load_config_or_default};
use coursekeep_core::{AccessEvaluator, AccessLedger, ExtensionClient, ReconcileOutcome};
use coursekeep_store::{SqliteStore, Store};
use coursekeep_util::{EnrollmentId, default_config_path, format_datetime_full, parse_timestamp};
use serde::Deserialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// coursekeepctl - inspect and manage course access entitlements
#[derive(Parser, Debug)]
#[command(name = "coursekeepctl")]
#[command(about = "Inspect and manage course access entitlements", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/coursekeep/config.toml)
    #[arg(short, long, global = true, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Data directory override (or set COURSEKEEP_DATA_DIR env var)
    #[arg(short, long, global = true, env = "COURSEKEEP_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, global = true, default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify an enrollment JSON file without touching the store
    Evaluate {
        file: PathBuf,
        /// Evaluate at this instant instead of now
        #[arg(long)]
        at: Option<String>,
    },

    #[command(flatten)]
    Ledger(LedgerCommand),
}

/// Subcommands that work on the store
#[derive(Subcommand, Debug)]
enum LedgerCommand {
    /// Import one enrollment or an array of enrollments from a JSON file
    Import { file: PathBuf },

    /// List stored enrollments with their status
    List,

    /// Show the access status of a stored enrollment
    Status {
        id: String,
        #[arg(long)]
        at: Option<String>,
    },

    /// Show the extension lengths available to an enrollment
    Options { id: String },

    /// Grant an extension of the given number of days
    Extend { id: String, days: u32 },

    /// Revoke access permanently
    Revoke {
        id: String,
        #[arg(long)]
        note: Option<String>,
    },

    /// Revoke enrollments whose budget is spent and whose access has expired
    Reconcile {
        /// Only this enrollment (default: all)
        id: Option<String>,
    },

    /// Show recent audit events
    Audit {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

/// One enrollment or many
#[derive(Deserialize)]
#[serde(untagged)]
enum EnrollmentFile {
    Many(Vec<Enrollment>),
    One(Enrollment),
}

fn read_enrollments(path: &Path) -> Result<Vec<Enrollment>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {:?}", path))?;
    let parsed: EnrollmentFile = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse enrollment JSON in {:?}", path))?;

    Ok(match parsed {
        EnrollmentFile::Many(list) => list,
        EnrollmentFile::One(one) => vec![one],
    })
}

fn resolve_time(at: Option<&str>) -> Result<DateTime<Utc>> {
    match at {
        Some(text) => match parse_timestamp(text) {
            Some(dt) => Ok(dt),
            None => bail!("Invalid --at timestamp: {}", text),
        },
        None => Ok(coursekeep_util::now()),
    }
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn evaluation_json(
    evaluator: &AccessEvaluator,
    enrollment: &Enrollment,
    now: DateTime<Utc>,
) -> serde_json::Value {
    json!({
        "enrollmentId": enrollment.id,
        "evaluatedAt": format_datetime_full(&now),
        "report": evaluator.access_status(enrollment, now),
        "remainingAccessDays": evaluator.remaining_access_days(enrollment),
        "hasHitAccessLimit": evaluator.has_hit_access_limit(enrollment),
        "limitMessage": evaluator.limit_message(enrollment),
        "banner": evaluator.banner(enrollment, now),
        "options": evaluator.extension_options(enrollment),
    })
}

fn open_ledger(config: &Config, data_dir: Option<&Path>) -> Result<AccessLedger> {
    let store_config = match data_dir {
        Some(dir) => StoreConfig {
            data_dir: dir.to_path_buf(),
        },
        None => config.store.clone(),
    };

    std::fs::create_dir_all(&store_config.data_dir).with_context(|| {
        format!("Failed to create data directory {:?}", store_config.data_dir)
    })?;

    let db_path = store_config.database_path();
    let store: Arc<dyn Store> = Arc::new(
        SqliteStore::open(&db_path)
            .with_context(|| format!("Failed to open database {:?}", db_path))?,
    );
    if !store.is_healthy() {
        bail!("Store at {:?} is not healthy", db_path);
    }
    debug!(db_path = %db_path.display(), "Store opened");

    Ok(AccessLedger::new(config.access.clone(), store))
}

fn evaluate(evaluator: &AccessEvaluator, file: &Path, at: Option<&str>) -> Result<()> {
    let now = resolve_time(at)?;
    let results: Vec<serde_json::Value> = read_enrollments(file)?
        .iter()
        .map(|e| evaluation_json(evaluator, e, now))
        .collect();

    match results.as_slice() {
        [single] => print_json(single),
        _ => print_json(&results),
    }
}

async fn run(args: Args) -> Result<()> {
    let config = load_config_or_default(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    match args.command {
        Command::Evaluate { file, at } => {
            let evaluator = AccessEvaluator::new(config.access);
            evaluate(&evaluator, &file, at.as_deref())
        }
        Command::Ledger(command) => {
            let ledger = open_ledger(&config, args.data_dir.as_deref())?;
            run_with_ledger(&ledger, command).await
        }
    }
}

async fn run_with_ledger(ledger: &AccessLedger, command: LedgerCommand) -> Result<()> {
    let now = coursekeep_util::now();

    match command {
        LedgerCommand::Import { file } => {
            let enrollments = read_enrollments(&file)?;
            let count = enrollments.len();
            for enrollment in enrollments {
                ledger.import(enrollment, now)?;
            }
            info!(count, "Enrollments imported");
            println!("Imported {} enrollment(s)", count);
        }
        LedgerCommand::List => {
            let rows: Vec<serde_json::Value> = ledger
                .list()?
                .iter()
                .map(|e| {
                    let report = ledger.evaluator().access_status(e, now);
                    json!({
                        "enrollmentId": e.id,
                        "status": report.status,
                        "daysRemaining": report.days_remaining,
                        "totalAccessDays": e.total_access_days,
                    })
                })
                .collect();
            print_json(&rows)?;
        }
        LedgerCommand::Status { id, at } => {
            let now = resolve_time(at.as_deref())?;
            let enrollment = ledger.get(&EnrollmentId::new(id))?;
            print_json(&evaluation_json(ledger.evaluator(), &enrollment, now))?;
        }
        LedgerCommand::Options { id } => {
            let id = EnrollmentId::new(id);
            let enrollment = ledger.get(&id)?;
            let evaluator = ledger.evaluator();
            print_json(&json!({
                "enrollmentId": id,
                "remainingAccessDays": evaluator.remaining_access_days(&enrollment),
                "options": evaluator.extension_options(&enrollment),
                "limitMessage": evaluator.limit_message(&enrollment),
            }))?;
        }
        LedgerCommand::Extend { id, days } => {
            let request = ExtendAccessRequest::new(EnrollmentId::new(id), days);
            let request_id = request.request_id;
            let response = match ledger.extend_access(request).await {
                Ok(enrollment) => ExtendAccessResponse::success(request_id, enrollment),
                Err(e) => ExtendAccessResponse::error(request_id, e.to_error_info()),
            };
            print_json(&response)?;
            if !response.is_success() {
                bail!("Extension was not granted");
            }
        }
        LedgerCommand::Revoke { id, note } => {
            let enrollment = ledger.revoke(
                &EnrollmentId::new(id),
                RevocationReason::Administrative { note },
                now,
            )?;
            print_json(&enrollment)?;
        }
        LedgerCommand::Reconcile { id } => {
            let ids = match id {
                Some(id) => vec![EnrollmentId::new(id)],
                None => ledger.list()?.into_iter().map(|e| e.id).collect(),
            };
            let mut revoked = Vec::new();
            for id in ids {
                if ledger.reconcile(&id, now)? == ReconcileOutcome::Revoked {
                    revoked.push(id);
                }
            }
            info!(revoked = revoked.len(), "Reconcile finished");
            print_json(&json!({ "revoked": revoked }))?;
        }
        LedgerCommand::Audit { limit } => {
            let events: Vec<serde_json::Value> = ledger
                .recent_audits(limit)?
                .into_iter()
                .map(|a| {
                    json!({
                        "id": a.id,
                        "timestamp": a.timestamp,
                        "event": a.event,
                    })
                })
                .collect();
            print_json(&events)?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    if args.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }

    debug!(version = env!("CARGO_PKG_VERSION"), "coursekeepctl starting");
    if coursekeep_util::is_mock_time_active() {
        warn!(
            now = %format_datetime_full(&coursekeep_util::now()),
            "Mock time is active"
        );
    }

    run(args).await
}
