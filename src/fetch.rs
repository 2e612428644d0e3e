//! Per-file fetch with fault isolation: any failure becomes `Skipped`.
use bytes::Bytes;
use futures::TryStreamExt;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::drive::{ByteStream, DriveService};
use crate::names::{has_extension, sanitize_name};
use crate::transform::{self, Transform};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("metadata lookup failed: {0:#}")]
    Metadata(anyhow::Error),
    #[error("download failed: {0:#}")]
    Download(anyhow::Error),
    #[error("export as {mime} failed: {cause:#}")]
    Export {
        mime: &'static str,
        cause: anyhow::Error,
    },
    #[error("byte stream failed after {received} bytes: {cause:#}")]
    Stream {
        received: usize,
        cause: anyhow::Error,
    },
}

/// A file ready for the archive: sanitized name plus its full payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedFile {
    pub file_id: String,
    pub name: String,
    pub bytes: Bytes,
}

#[derive(Debug)]
pub enum FetchOutcome {
    Fetched(FetchedFile),
    Skipped { file_id: String, reason: FetchError },
}

impl FetchOutcome {
    pub fn file_id(&self) -> &str {
        match self {
            FetchOutcome::Fetched(file) => &file.file_id,
            FetchOutcome::Skipped { file_id, .. } => file_id,
        }
    }

    pub fn is_fetched(&self) -> bool {
        matches!(self, FetchOutcome::Fetched(_))
    }
}

/// Fetch one remote file. Never fails: every error is reported as
/// [`FetchOutcome::Skipped`] so sibling fetches carry on.
#[instrument(skip(drive, name_hint))]
pub async fn fetch_file(
    drive: &dyn DriveService,
    file_id: &str,
    name_hint: Option<&str>,
) -> FetchOutcome {
    match try_fetch(drive, file_id, name_hint).await {
        Ok(file) => {
            debug!(name = %file.name, size = file.bytes.len(), "fetched file");
            FetchOutcome::Fetched(file)
        }
        Err(reason) => FetchOutcome::Skipped {
            file_id: file_id.to_string(),
            reason,
        },
    }
}

async fn try_fetch(
    drive: &dyn DriveService,
    file_id: &str,
    name_hint: Option<&str>,
) -> Result<FetchedFile, FetchError> {
    let meta = drive
        .file_metadata(file_id)
        .await
        .map_err(FetchError::Metadata)?;

    let mut name = [Some(meta.name.as_str()), name_hint, Some(file_id)]
        .into_iter()
        .flatten()
        .find(|n| !n.trim().is_empty())
        .unwrap_or_default()
        .to_string();

    let stream = match transform::resolve(&meta.mime_type) {
        Some(Transform {
            export_mime,
            extension,
        }) => {
            if !has_extension(&name, extension) {
                name.push_str(extension);
            }
            drive
                .export(file_id, export_mime)
                .await
                .map_err(|cause| FetchError::Export {
                    mime: export_mime,
                    cause,
                })?
        }
        None => drive
            .download(file_id)
            .await
            .map_err(FetchError::Download)?,
    };

    let bytes = drain(stream).await?;
    Ok(FetchedFile {
        file_id: file_id.to_string(),
        name: sanitize_name(&name),
        bytes,
    })
}

async fn drain(mut stream: ByteStream) -> Result<Bytes, FetchError> {
    let mut buf = Vec::new();
    loop {
        match stream.try_next().await {
            Ok(Some(chunk)) => buf.extend_from_slice(&chunk),
            Ok(None) => return Ok(Bytes::from(buf)),
            Err(cause) => {
                return Err(FetchError::Stream {
                    received: buf.len(),
                    cause,
                })
            }
        }
    }
}
