use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use reqwest::{Client, Url};
use std::fmt;
use std::time::Duration;
use tracing::debug;

use crate::config::{Config, DEFAULT_DRIVE_BASE_URL};
use crate::http::{build_client, endpoint, ensure_success};

pub mod model;

pub use model::FileMetadata;

/// Response body of a raw download or an export, delivered incrementally.
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// Object-store capabilities the fetch unit consumes.
#[async_trait]
pub trait DriveService: Send + Sync {
    async fn file_metadata(&self, file_id: &str) -> Result<FileMetadata>;

    /// Stored bytes of a regular file.
    async fn download(&self, file_id: &str) -> Result<ByteStream>;

    /// A native document rendered as `mime_type`.
    async fn export(&self, file_id: &str, mime_type: &str) -> Result<ByteStream>;
}

/// Wrap an in-memory payload as a single-chunk [`ByteStream`].
pub fn byte_stream_from(data: impl Into<Bytes>) -> ByteStream {
    futures::stream::once(futures::future::ready(Ok(data.into()))).boxed()
}

#[derive(Clone)]
pub struct DriveClient {
    http: Client,
    base_url: Url,
    token: String,
}

impl fmt::Debug for DriveClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriveClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl DriveClient {
    pub fn new(token: String) -> Result<Self> {
        let base_url = Url::parse(DEFAULT_DRIVE_BASE_URL)?;
        Self::with_base_url(token, base_url, Duration::from_secs(120))
    }

    pub fn with_base_url(token: String, base_url: Url, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: build_client(timeout)?,
            base_url,
            token,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let base_url =
            Url::parse(&cfg.google.drive_base_url).context("invalid Drive base URL")?;
        Self::with_base_url(
            cfg.google.access_token.clone(),
            base_url,
            cfg.google.request_timeout(),
        )
    }

    fn file_url(&self, file_id: &str, export: bool) -> Result<Url> {
        let mut segments = vec!["drive", "v3", "files", file_id];
        if export {
            segments.push("export");
        }
        endpoint(&self.base_url, &segments)
    }

    pub fn build_get(&self, url: Url, query: &[(&str, &str)]) -> Result<reqwest::Request> {
        self.http
            .get(url)
            .bearer_auth(&self.token)
            .query(query)
            .build()
            .context("failed to build Drive request")
    }

    async fn execute(&self, request: reqwest::Request) -> Result<reqwest::Response> {
        debug!(url = %request.url(), "sending drive request");
        let res = self
            .http
            .execute(request)
            .await
            .context("failed to reach Drive")?;
        ensure_success(res, "drive").await
    }

    async fn execute_stream(&self, request: reqwest::Request) -> Result<ByteStream> {
        let res = self.execute(request).await?;
        Ok(res.bytes_stream().map_err(anyhow::Error::from).boxed())
    }
}

#[async_trait]
impl DriveService for DriveClient {
    async fn file_metadata(&self, file_id: &str) -> Result<FileMetadata> {
        let request = self.build_get(
            self.file_url(file_id, false)?,
            &[("fields", "name,mimeType"), ("supportsAllDrives", "true")],
        )?;
        let res = self.execute(request).await?;
        res.json::<FileMetadata>()
            .await
            .context("invalid Drive metadata response")
    }

    async fn download(&self, file_id: &str) -> Result<ByteStream> {
        let request = self.build_get(
            self.file_url(file_id, false)?,
            &[("alt", "media"), ("supportsAllDrives", "true")],
        )?;
        self.execute_stream(request).await
    }

    async fn export(&self, file_id: &str, mime_type: &str) -> Result<ByteStream> {
        let request = self.build_get(
            self.file_url(file_id, true)?,
            &[("mimeType", mime_type)],
        )?;
        self.execute_stream(request).await
    }
}
