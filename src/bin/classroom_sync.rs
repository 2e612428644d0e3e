use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use classroom_zip::classroom::ClassroomClient;
use classroom_zip::config;
use classroom_zip::db;
use classroom_zip::drive::DriveClient;
use classroom_zip::sync::{sync_courses, SyncOptions};
use tracing::info;

/// Mirror every course's Drive attachments into a local directory tree.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Directory that receives one folder per course
    #[arg(long, default_value = "downloads")]
    base_dir: PathBuf,

    /// Only sync courses whose name contains this text (case-insensitive)
    #[arg(long)]
    course_name_contains: Option<String>,

    /// List what would be downloaded without fetching or recording anything
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    let pool = db::init_pool(&cfg.database_url()).await?;
    db::run_migrations(&pool).await?;

    let classroom = ClassroomClient::from_config(&cfg)?;
    let drive = DriveClient::from_config(&cfg)?;
    let opts = SyncOptions {
        base_dir: args.base_dir,
        course_name_contains: args.course_name_contains,
        dry_run: args.dry_run,
    };

    let summary = sync_courses(&classroom, &drive, &pool, &opts).await?;
    if opts.dry_run {
        info!(planned = summary.planned, "dry run complete, nothing written");
    } else {
        info!(
            written = summary.written,
            already_present = summary.already_present,
            skipped = summary.skipped,
            failed_writes = summary.failed_writes,
            unrecorded = summary.unrecorded,
            failed_courses = summary.failed_courses,
            "all new files downloaded"
        );
    }
    Ok(())
}
