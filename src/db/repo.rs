use super::model::DownloadedFile;
use crate::model::SeenSnapshot;
use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::instrument;

pub type Pool = SqlitePool;

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let pool = SqlitePool::connect(&normalized)
        .await
        .with_context(|| format!("failed to open index database {}", normalized))?;
    sqlx::query("PRAGMA journal_mode=WAL;")
        .execute(&pool)
        .await?;
    Ok(pool)
}

/// Expand a leading `~/` in a file-backed sqlite URL and create its parent
/// directory. Other URLs, including in-memory ones, pass through unchanged.
fn prepare_sqlite_url(url: &str) -> String {
    let Some(rest) = url.strip_prefix("sqlite:") else {
        return url.to_string();
    };
    if rest.starts_with(":memory") {
        return url.to_string();
    }
    let rest = rest.strip_prefix("//").unwrap_or(rest);
    let (path, query) = match rest.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (rest, None),
    };
    if path.is_empty() {
        return url.to_string();
    }

    let path = match (path.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(tail), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), tail),
        _ => path.to_string(),
    };
    if let Some(parent) = std::path::Path::new(&path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    let mut rebuilt = format!("sqlite://{}", path);
    match query {
        Some(q) => {
            rebuilt.push('?');
            rebuilt.push_str(q);
        }
        // sqlx refuses to create a missing database file without mode=rwc.
        None => rebuilt.push_str("?mode=rwc"),
    }
    rebuilt
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Snapshot every recorded file id. The version is the highest row id, or 0
/// for an empty index.
#[instrument(skip_all)]
pub async fn load_seen_snapshot(pool: &Pool) -> Result<SeenSnapshot> {
    let version: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(id), 0) FROM downloaded_files")
        .fetch_one(pool)
        .await?;
    let ids: Vec<String> = sqlx::query_scalar("SELECT file_id FROM downloaded_files")
        .fetch_all(pool)
        .await?;
    Ok(SeenSnapshot::new(version, ids))
}

/// Record a mirrored file. Returns false when the id was already recorded.
#[instrument(skip_all, fields(file_id = %file_id))]
pub async fn record_download(
    pool: &Pool,
    file_id: &str,
    course_id: Option<&str>,
    name: &str,
    size: u64,
) -> Result<bool> {
    let size = i64::try_from(size).context("file size out of range")?;
    let res = sqlx::query(
        "INSERT INTO downloaded_files (file_id, course_id, name, size) VALUES (?, ?, ?, ?) \
         ON CONFLICT(file_id) DO NOTHING",
    )
    .bind(file_id)
    .bind(course_id)
    .bind(name)
    .bind(size)
    .execute(pool)
    .await?;
    Ok(res.rows_affected() > 0)
}

#[instrument(skip_all)]
pub async fn find_download(pool: &Pool, file_id: &str) -> Result<Option<DownloadedFile>> {
    let row = sqlx::query_as::<_, DownloadedFile>(
        "SELECT id, file_id, course_id, name, size, downloaded_at \
         FROM downloaded_files WHERE file_id = ?",
    )
    .bind(file_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn count_downloads(pool: &Pool) -> Result<i64> {
    let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM downloaded_files")
        .fetch_one(pool)
        .await?;
    Ok(n)
}

/// Forget every recorded download. Returns the number of rows removed.
#[instrument(skip_all)]
pub async fn clear_index(pool: &Pool) -> Result<u64> {
    let res = sqlx::query("DELETE FROM downloaded_files")
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}
