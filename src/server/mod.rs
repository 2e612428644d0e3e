//! HTTP surface: course listing and streamed archive downloads.
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use futures::Stream;
use serde::Deserialize;
use std::io;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::classroom::ClassroomService;
use crate::download::{self, PipelineOptions, Selection};
use crate::drive::DriveService;
use crate::extract;
use crate::model::{Attachment, Course};

mod error;

pub use error::AppError;

pub const ARCHIVE_FILENAME: &str = "classroom_download.zip";

#[derive(Clone)]
pub struct AppState {
    pub classroom: Arc<dyn ClassroomService>,
    pub drive: Arc<dyn DriveService>,
    pub options: PipelineOptions,
}

impl AppState {
    pub fn new(
        classroom: Arc<dyn ClassroomService>,
        drive: Arc<dyn DriveService>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            classroom,
            drive,
            options,
        }
    }
}

/// Request body of `POST /download`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DownloadRequest {
    pub course_ids: Option<Vec<String>>,
    pub file_ids: Option<Vec<String>>,
}

/// Routes:
/// - `GET /health`
/// - `GET /courses`
/// - `GET /courses/:course_id/attachments`
/// - `POST /download`
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/courses", get(list_courses))
        .route("/courses/:course_id/attachments", get(list_attachments))
        .route("/download", post(download_archive))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str {
    "ok"
}

async fn list_courses(State(state): State<AppState>) -> Result<Json<Vec<Course>>, AppError> {
    let courses = extract::list_courses(state.classroom.as_ref())
        .await
        .map_err(AppError::Upstream)?;
    Ok(Json(courses))
}

async fn list_attachments(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> Result<Json<Vec<Attachment>>, AppError> {
    let attachments = extract::list_attachments(state.classroom.as_ref(), &course_id)
        .await
        .map_err(AppError::Upstream)?;
    Ok(Json(attachments))
}

async fn download_archive(
    State(state): State<AppState>,
    Json(req): Json<DownloadRequest>,
) -> Result<Response, AppError> {
    let selection = Selection::from_parts(req.course_ids, req.file_ids)?;
    let (chunks, report) = download::download(
        state.classroom.as_ref(),
        state.drive.clone(),
        &selection,
        None,
        state.options,
    )
    .await?;

    tokio::spawn(async move {
        match report.await {
            Ok(report) => info!(
                run_id = %report.run_id,
                fetched = report.fetched.len(),
                skipped = report.skipped.len(),
                cancelled = report.cancelled,
                "archive delivered"
            ),
            Err(err) => error!(?err, "download producer panicked"),
        }
    });

    archive_response(chunks)
}

/// Wrap archive chunks in a non-cacheable attachment response; every chunk
/// is sent as it arrives.
pub fn archive_response<S>(chunks: S) -> Result<Response, AppError>
where
    S: Stream<Item = io::Result<Bytes>> + Send + 'static,
{
    Response::builder()
        .header(header::CONTENT_TYPE, "application/zip")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename={}", ARCHIVE_FILENAME),
        )
        .header(header::CACHE_CONTROL, "no-store, no-cache, must-revalidate")
        .header(header::PRAGMA, "no-cache")
        .header("X-Accel-Buffering", "no")
        .body(Body::from_stream(chunks))
        .map_err(|err| AppError::Internal(err.into()))
}
