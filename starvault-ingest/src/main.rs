//! starvault-ingest - exposure repository ingest CLI
//!
//! Registers raw exposure files, clusters them into sessions and links
//! calibration sessions to light sessions. Each subcommand runs one batch
//! pass (or, for `run`, all of them in order) against the configured store.
//!
//! Ctrl-C cancels cooperatively: the current file or record finishes and
//! everything already committed stays.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sqlx::SqlitePool;
use starvault_common::config::{CliOverrides, RepositoryConfig, TomlConfig};
use starvault_ingest::db::files::files_in_session;
use starvault_ingest::db::sessions::list_sessions;
use starvault_ingest::{BatchSummary, Registration, RunContext};
use std::path::{Path, PathBuf};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// `--version` output: crate version plus the build stamp
const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("STARVAULT_GIT_HASH"),
    " ",
    env!("STARVAULT_BUILD_PROFILE"),
    ", built ",
    env!("STARVAULT_BUILD_TIMESTAMP"),
    ")"
);

/// Command-line arguments for starvault-ingest
#[derive(Parser, Debug)]
#[command(name = "starvault-ingest")]
#[command(about = "Ingest astronomical exposures into a canonical repository")]
#[command(version, long_version = LONG_VERSION)]
struct Args {
    /// TOML configuration file (default: platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory scanned for new exposures
    #[arg(long, global = true)]
    scan_root: Option<PathBuf>,

    /// Repository root canonical paths are relative to
    #[arg(long, global = true)]
    repo_root: Option<PathBuf>,

    /// Metadata store file
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Move registered files into the canonical layout
    #[arg(long = "move", global = true)]
    move_files: bool,

    /// Print batch summaries as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a single file
    Register {
        /// Exposure file to register
        file: PathBuf,
    },
    /// Register every candidate file under the scan root
    Scan,
    /// Build light sessions, then calibration sessions
    Sessions,
    /// Link calibration sessions to light sessions
    Link,
    /// Scan, build sessions and link, in that order
    Run,
    /// List stored sessions with their file counts
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // The TOML file may set the log level, so it is read before tracing is up
    let toml = TomlConfig::load(args.config.as_deref());
    let default_level = toml
        .as_ref()
        .ok()
        .and_then(|t| t.logging.level.clone())
        .unwrap_or_else(|| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&default_level)),
        )
        .init();

    info!(
        "Starting starvault-ingest v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("STARVAULT_GIT_HASH"),
        env!("STARVAULT_BUILD_TIMESTAMP"),
        env!("STARVAULT_BUILD_PROFILE")
    );

    let toml = toml.context("Failed to load configuration")?;

    // A lone file needs no scan root; its folder stands in for one
    let scan_root = match &args.command {
        Command::Register { file } => args
            .scan_root
            .clone()
            .or_else(|| Some(parent_dir(file))),
        _ => args.scan_root.clone(),
    };
    let overrides = CliOverrides {
        scan_root,
        repo_root: args.repo_root.clone(),
        database: args.database.clone(),
        move_files: args.move_files,
    };

    let config = RepositoryConfig::resolve(&overrides, &toml)?;
    config.validate().context("Setup check failed")?;
    info!(
        scan_root = %config.scan_root.display(),
        repo_root = %config.repo_root.display(),
        database = %config.database_path.display(),
        move_files = config.move_files,
        "Configuration resolved"
    );

    let db = starvault_ingest::db::init_database_pool(&config.database_path)
        .await
        .context("Failed to open metadata store")?;

    let token = CancellationToken::new();
    let signal_token = token.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current unit");
            signal_token.cancel();
        }
    });

    let mut ctx = RunContext::new(token).with_progress(|current, total, label| {
        debug!(current, total, label, "Progress");
        true
    });

    match &args.command {
        Command::Register { file } => {
            let name = file.file_name().map(PathBuf::from).unwrap_or_default();
            let root = parent_dir(file);
            let outcome = starvault_ingest::register_file(&db, &config, &root, &name).await?;
            print_registration(&outcome, args.json)?;
        }
        Command::Scan => {
            let summary =
                starvault_ingest::register_tree(&db, &config, &config.scan_root, &mut ctx).await?;
            print_summaries(&[summary], args.json)?;
        }
        Command::Sessions => {
            let summaries = build_sessions(&db, &mut ctx).await?;
            print_summaries(&summaries, args.json)?;
        }
        Command::Link => {
            let summary = starvault_ingest::link_sessions(&db, &mut ctx).await?;
            print_summaries(&[summary], args.json)?;
        }
        Command::Run => {
            let mut summaries = Vec::new();
            let scan =
                starvault_ingest::register_tree(&db, &config, &config.scan_root, &mut ctx).await?;
            summaries.push(scan);
            if !ctx.is_cancelled() {
                summaries.extend(build_sessions(&db, &mut ctx).await?);
            }
            if !ctx.is_cancelled() {
                summaries.push(starvault_ingest::link_sessions(&db, &mut ctx).await?);
            }
            print_summaries(&summaries, args.json)?;
        }
        Command::List => {
            list(&db, args.json).await?;
        }
    }

    db.close().await;
    Ok(())
}

/// Folder holding `file`; `.` for a bare filename
fn parent_dir(file: &Path) -> PathBuf {
    file.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Light sessions first, then calibration, stopping early on cancellation
async fn build_sessions(db: &SqlitePool, ctx: &mut RunContext<'_>) -> Result<Vec<BatchSummary>> {
    let mut summaries = vec![starvault_ingest::build_light_sessions(db, ctx).await?];
    if !ctx.is_cancelled() {
        summaries.push(starvault_ingest::build_calibration_sessions(db, ctx).await?);
    }
    Ok(summaries)
}

fn print_registration(outcome: &Registration, json: bool) -> Result<()> {
    let (status, detail) = match outcome {
        Registration::Registered(id) => ("registered", id.to_string()),
        Registration::Skipped(reason) => ("skipped", format!("{:?}", reason)),
    };
    if json {
        let value = serde_json::json!({ "status": status, "detail": detail });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{}: {}", status, detail);
    }
    Ok(())
}

fn print_summaries(summaries: &[BatchSummary], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summaries)?);
        return Ok(());
    }

    for s in summaries {
        println!(
            "{:<22} processed {:>6}  succeeded {:>6}  skipped {:>6}  failed {:>6}{}",
            s.operation,
            s.processed,
            s.succeeded,
            s.skipped,
            s.failed,
            if s.cancelled { "  (cancelled)" } else { "" }
        );
    }
    Ok(())
}

async fn list(db: &SqlitePool, json: bool) -> Result<()> {
    let sessions = list_sessions(db).await?;
    let mut rows = Vec::with_capacity(sessions.len());
    for session in sessions {
        let files = files_in_session(db, session.guid).await?.len();
        rows.push((session, files));
    }

    if json {
        let value: Vec<_> = rows
            .iter()
            .map(|(session, files)| serde_json::json!({ "session": session, "files": files }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    for (session, files) in &rows {
        println!(
            "{} {:<5} {:<30} {} {}/{} files={} bias={} dark={} flat={}",
            session.guid,
            session.frame_type,
            session.group_key,
            session.session_date,
            session.telescope,
            session.imager,
            files,
            linked(session.bias_session_id),
            linked(session.dark_session_id),
            linked(session.flat_session_id),
        );
    }
    Ok(())
}

fn linked(id: Option<uuid::Uuid>) -> &'static str {
    if id.is_some() {
        "yes"
    } else {
        "-"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_version_carries_build_stamp() {
        assert!(LONG_VERSION.starts_with(env!("CARGO_PKG_VERSION")));
        assert!(LONG_VERSION.contains(env!("STARVAULT_GIT_HASH")));
        assert!(LONG_VERSION.contains(", built "));
        assert!(env!("STARVAULT_BUILD_TIMESTAMP").ends_with('Z'));
    }

    #[test]
    fn test_version_flag_uses_long_version() {
        let err = Args::try_parse_from(["starvault-ingest", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
        assert!(err.to_string().contains(env!("STARVAULT_BUILD_PROFILE")));
    }
}
