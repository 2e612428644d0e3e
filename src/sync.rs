//! Mirror course attachments into a local directory tree.
//!
//! Courses are processed independently: a listing failure is logged and the
//! run moves on to the next course. Fetch, write and index failures are
//! logged per file and never stop a course.
use anyhow::{Context, Result};
use futures::TryStreamExt;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, info_span, warn, Instrument};

use crate::classroom::ClassroomService;
use crate::db::{self, Pool};
use crate::drive::DriveService;
use crate::extract;
use crate::fetch::{fetch_file, FetchOutcome};
use crate::model::{Course, SeenSnapshot};
use crate::names::sanitize_name;

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub base_dir: PathBuf,
    /// Case-insensitive substring the course name must contain.
    pub course_name_contains: Option<String>,
    /// Log what would be written; no fetches, no index writes.
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub courses: usize,
    pub failed_courses: usize,
    pub written: usize,
    pub already_present: usize,
    pub skipped: usize,
    pub planned: usize,
    /// Fetched files that could not be written locally.
    pub failed_writes: usize,
    /// Files written but not recorded in the index.
    pub unrecorded: usize,
}

pub fn matches_filter(course: &Course, filter: Option<&str>) -> bool {
    match filter.map(str::trim).filter(|f| !f.is_empty()) {
        Some(f) => course.name.to_lowercase().contains(&f.to_lowercase()),
        None => true,
    }
}

/// Folder name for a course: its sanitized name, or `course_<id>` when it
/// has none.
pub fn course_dir_name(course: &Course) -> String {
    if course.name.trim().is_empty() {
        format!("course_{}", sanitize_name(&course.id))
    } else {
        sanitize_name(&course.name)
    }
}

struct Run<'a> {
    classroom: &'a dyn ClassroomService,
    drive: &'a dyn DriveService,
    pool: &'a Pool,
    opts: &'a SyncOptions,
    seen: SeenSnapshot,
    handled: HashSet<String>,
    summary: SyncSummary,
}

pub async fn sync_courses(
    classroom: &dyn ClassroomService,
    drive: &dyn DriveService,
    pool: &Pool,
    opts: &SyncOptions,
) -> Result<SyncSummary> {
    let seen = db::load_seen_snapshot(pool).await?;
    info!(seen = seen.len(), version = seen.version, "loaded download index");

    let courses: Vec<Course> = extract::list_courses(classroom)
        .await?
        .into_iter()
        .filter(|c| matches_filter(c, opts.course_name_contains.as_deref()))
        .collect();
    if courses.is_empty() {
        info!("no courses match the filter");
        return Ok(SyncSummary::default());
    }
    info!(courses = courses.len(), dry_run = opts.dry_run, "syncing courses");

    let mut run = Run {
        classroom,
        drive,
        pool,
        opts,
        seen,
        handled: HashSet::new(),
        summary: SyncSummary::default(),
    };
    for course in &courses {
        run.summary.courses += 1;
        let span = info_span!("course", course_id = %course.id, name = %course.name);
        if let Err(err) = run.sync_course(course).instrument(span).await {
            error!(course_id = %course.id, ?err, "course sync failed, continuing");
            run.summary.failed_courses += 1;
        }
    }
    info!(summary = ?run.summary, "sync finished");
    Ok(run.summary)
}

impl Run<'_> {
    async fn sync_course(&mut self, course: &Course) -> Result<()> {
        let dir = self.opts.base_dir.join(course_dir_name(course));
        let attachments = extract::course_attachments(self.classroom, &course.id);
        futures::pin_mut!(attachments);

        while let Some(attachment) = attachments.try_next().await? {
            let file_id = attachment.file_id;
            if self.seen.contains(&file_id) || self.handled.contains(&file_id) {
                continue;
            }
            if self.opts.dry_run {
                info!(%file_id, title = %attachment.title, dir = %dir.display(), "would download");
                self.summary.planned += 1;
                self.handled.insert(file_id);
                continue;
            }

            let file = match fetch_file(self.drive, &file_id, Some(&attachment.title)).await {
                FetchOutcome::Fetched(file) => file,
                FetchOutcome::Skipped { file_id, reason } => {
                    warn!(%file_id, %reason, "skipping file");
                    self.summary.skipped += 1;
                    continue;
                }
            };

            let dest = dir.join(&file.name);
            if fs::try_exists(&dest).await.unwrap_or(false) {
                info!(path = %dest.display(), "already present locally");
                self.summary.already_present += 1;
            } else if let Err(err) = write_file(&dir, &dest, &file.bytes).await {
                error!(%file_id, path = %dest.display(), ?err, "write failed, continuing");
                self.summary.failed_writes += 1;
                continue;
            } else {
                info!(path = %dest.display(), size = file.bytes.len(), "downloaded");
                self.summary.written += 1;
            }
            if let Err(err) = db::record_download(
                self.pool,
                &file_id,
                Some(&course.id),
                &file.name,
                file.bytes.len() as u64,
            )
            .await
            {
                error!(%file_id, ?err, "failed to record download");
                self.summary.unrecorded += 1;
            }
            self.handled.insert(file_id);
        }
        Ok(())
    }
}

async fn write_file(dir: &Path, dest: &Path, bytes: &[u8]) -> Result<()> {
    fs::create_dir_all(dir)
        .await
        .with_context(|| format!("failed to create {}", dir.display()))?;
    fs::write(dest, bytes)
        .await
        .with_context(|| format!("failed to write {}", dest.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(id: &str, name: &str) -> Course {
        Course {
            id: id.into(),
            name: name.into(),
            section: None,
            state: None,
        }
    }

    #[test]
    fn filter_is_case_insensitive() {
        let c = course("1", "Advanced Physics");
        assert!(matches_filter(&c, Some("physics")));
        assert!(matches_filter(&c, None));
        assert!(matches_filter(&c, Some("  ")));
        assert!(!matches_filter(&c, Some("chem")));
    }

    #[test]
    fn course_dir_falls_back_to_id() {
        assert_eq!(course_dir_name(&course("42", "Bio: Lab/2")), "Bio_ Lab_2");
        assert_eq!(course_dir_name(&course("42", " ")), "course_42");
    }
}
