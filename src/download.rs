//! One download invocation: selection, planning, fetching and assembly.
use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use std::io;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::archive::{assemble, ArchiveEntry};
use crate::classroom::ClassroomService;
use crate::drive::DriveService;
use crate::extract;
use crate::fetch::{fetch_file, FetchOutcome};
use crate::model::SeenSnapshot;

/// Path prefix for members selected by file id.
pub const DIRECT_FILES_PREFIX: &str = "files";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    pub fetch_concurrency: usize,
    pub channel_capacity: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            fetch_concurrency: 1,
            channel_capacity: 8,
        }
    }
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("selection is empty: provide course ids or file ids")]
    EmptySelection,
    #[error("listing course {course_id} failed: {cause:#}")]
    Listing {
        course_id: String,
        cause: anyhow::Error,
    },
}

/// What the caller asked for. File ids and course ids are exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Courses(Vec<String>),
    Files(Vec<String>),
}

impl Selection {
    /// Build a selection from optional request parts; explicit file ids win.
    pub fn from_parts(
        course_ids: Option<Vec<String>>,
        file_ids: Option<Vec<String>>,
    ) -> Result<Self, DownloadError> {
        let keep = |ids: Option<Vec<String>>| -> Vec<String> {
            ids.unwrap_or_default()
                .into_iter()
                .filter(|id| !id.trim().is_empty())
                .collect()
        };
        let file_ids = keep(file_ids);
        if !file_ids.is_empty() {
            return Ok(Selection::Files(file_ids));
        }
        let course_ids = keep(course_ids);
        if !course_ids.is_empty() {
            return Ok(Selection::Courses(course_ids));
        }
        Err(DownloadError::EmptySelection)
    }
}

/// A file scheduled for fetching, with the archive folder it lands in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedItem {
    pub path_prefix: String,
    pub file_id: String,
    pub title: Option<String>,
}

/// Enumerate everything the selection covers.
///
/// Course selections list every course before returning, so a listing
/// failure ends the invocation before any archive byte exists. The cost is
/// time to first byte: nothing is fetched until the last page of the last
/// course has been read. Only attachment references are held here, never
/// file contents; pages themselves are still pulled one at a time.
/// `seen` only filters course-derived items.
pub async fn plan(
    classroom: &dyn ClassroomService,
    selection: &Selection,
    seen: Option<&SeenSnapshot>,
) -> Result<Vec<PlannedItem>, DownloadError> {
    let course_ids = match selection {
        Selection::Files(file_ids) => {
            return Ok(file_ids
                .iter()
                .map(|file_id| PlannedItem {
                    path_prefix: DIRECT_FILES_PREFIX.to_string(),
                    file_id: file_id.clone(),
                    title: None,
                })
                .collect());
        }
        Selection::Courses(course_ids) => course_ids,
    };

    let mut items = Vec::new();
    for course_id in course_ids {
        let attachments = extract::list_attachments(classroom, course_id)
            .await
            .map_err(|cause| DownloadError::Listing {
                course_id: course_id.clone(),
                cause,
            })?;
        debug!(%course_id, count = attachments.len(), "enumerated attachments");
        for attachment in attachments {
            if seen.is_some_and(|s| s.contains(&attachment.file_id)) {
                debug!(%course_id, file_id = %attachment.file_id, "already downloaded");
                continue;
            }
            items.push(PlannedItem {
                path_prefix: course_id.clone(),
                file_id: attachment.file_id,
                title: Some(attachment.title),
            });
        }
    }
    Ok(items)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedRecord {
    pub file_id: String,
    pub path: String,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub file_id: String,
    pub reason: String,
}

/// Per-file status of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadReport {
    pub run_id: Uuid,
    pub fetched: Vec<FetchedRecord>,
    pub skipped: Vec<SkippedFile>,
    pub cancelled: bool,
}

impl DownloadReport {
    fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            fetched: Vec::new(),
            skipped: Vec::new(),
            cancelled: false,
        }
    }
}

/// Start fetching `items` in the background and return the archive chunks.
///
/// Members keep plan order. Dropping the returned stream stops the producer:
/// no further fetches are issued and in-flight ones are dropped.
pub fn start(
    drive: Arc<dyn DriveService>,
    items: Vec<PlannedItem>,
    options: PipelineOptions,
) -> (
    impl Stream<Item = io::Result<Bytes>> + Send + 'static,
    JoinHandle<DownloadReport>,
) {
    let run_id = Uuid::new_v4();
    let (tx, rx) = mpsc::channel(options.channel_capacity.max(1));
    let span = info_span!("download", %run_id);
    let producer = tokio::spawn(
        produce(drive, items, options.fetch_concurrency.max(1), tx, run_id).instrument(span),
    );
    (assemble(ReceiverStream::new(rx)), producer)
}

async fn produce(
    drive: Arc<dyn DriveService>,
    items: Vec<PlannedItem>,
    concurrency: usize,
    tx: mpsc::Sender<ArchiveEntry>,
    run_id: Uuid,
) -> DownloadReport {
    info!(items = items.len(), concurrency, "download started");
    let mut report = DownloadReport::new(run_id);
    let fetches = stream::iter(items)
        .map(|item| {
            let drive = drive.clone();
            async move {
                let outcome =
                    fetch_file(drive.as_ref(), &item.file_id, item.title.as_deref()).await;
                (item, outcome)
            }
        })
        .buffered(concurrency);
    futures::pin_mut!(fetches);

    loop {
        let next = tokio::select! {
            _ = tx.closed() => None,
            next = fetches.next() => Some(next),
        };
        let Some(next) = next else {
            report.cancelled = true;
            break;
        };
        let Some((item, outcome)) = next else {
            break;
        };

        let (entry, fetched) = match outcome {
            FetchOutcome::Fetched(file) => {
                let path = format!("{}/{}", item.path_prefix, file.name);
                let record = FetchedRecord {
                    file_id: file.file_id,
                    path: path.clone(),
                    size: file.bytes.len(),
                };
                (ArchiveEntry::file(path, file.bytes), Some(record))
            }
            FetchOutcome::Skipped { file_id, reason } => {
                warn!(%file_id, %reason, "skipping file");
                report.skipped.push(SkippedFile {
                    file_id,
                    reason: reason.to_string(),
                });
                (ArchiveEntry::skipped(), None)
            }
        };
        if tx.send(entry).await.is_err() {
            report.cancelled = true;
            break;
        }
        report.fetched.extend(fetched);
    }

    info!(
        fetched = report.fetched.len(),
        skipped = report.skipped.len(),
        cancelled = report.cancelled,
        "download finished"
    );
    report
}

/// Plan `selection` and start streaming it.
pub async fn download(
    classroom: &dyn ClassroomService,
    drive: Arc<dyn DriveService>,
    selection: &Selection,
    seen: Option<&SeenSnapshot>,
    options: PipelineOptions,
) -> Result<
    (
        impl Stream<Item = io::Result<Bytes>> + Send + 'static,
        JoinHandle<DownloadReport>,
    ),
    DownloadError,
> {
    let items = plan(classroom, selection, seen).await?;
    Ok(start(drive, items, options))
}
