use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;
use tracing::debug;

use crate::config::{Config, DEFAULT_CLASSROOM_BASE_URL};
use crate::http::{build_client, endpoint, ensure_success};
use crate::model::{Course, Page};

pub mod model;

use model::{ContentRecord, ListCourseWorkMaterialsResp, ListCourseWorkResp, ListCoursesResp};

/// Listing capabilities of the remote course directory.
#[async_trait]
pub trait ClassroomService: Send + Sync {
    async fn list_courses(&self, page_token: Option<&str>) -> Result<Page<Course>>;

    /// Graded work of a course.
    async fn list_course_work(
        &self,
        course_id: &str,
        page_token: Option<&str>,
    ) -> Result<Page<ContentRecord>>;

    /// Ungraded material posts of a course.
    async fn list_course_work_materials(
        &self,
        course_id: &str,
        page_token: Option<&str>,
    ) -> Result<Page<ContentRecord>>;
}

#[derive(Clone)]
pub struct ClassroomClient {
    http: Client,
    base_url: Url,
    token: String,
    course_states: Vec<&'static str>,
}

impl fmt::Debug for ClassroomClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassroomClient")
            .field("base_url", &self.base_url)
            .field("course_states", &self.course_states)
            .finish_non_exhaustive()
    }
}

impl ClassroomClient {
    pub fn new(token: String) -> Result<Self> {
        let base_url = Url::parse(DEFAULT_CLASSROOM_BASE_URL)?;
        Self::with_base_url(token, base_url, Duration::from_secs(120))
    }

    pub fn with_base_url(token: String, base_url: Url, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: build_client(timeout)?,
            base_url,
            token,
            course_states: vec!["ACTIVE", "ARCHIVED"],
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let base_url = Url::parse(&cfg.google.classroom_base_url)
            .context("invalid classroom base URL")?;
        let client = Self::with_base_url(
            cfg.google.access_token.clone(),
            base_url,
            cfg.google.request_timeout(),
        )?;
        Ok(client.include_archived(cfg.google.include_archived))
    }

    pub fn include_archived(mut self, include: bool) -> Self {
        self.course_states = if include {
            vec!["ACTIVE", "ARCHIVED"]
        } else {
            vec!["ACTIVE"]
        };
        self
    }

    pub fn build_list_request(
        &self,
        segments: &[&str],
        page_token: Option<&str>,
        extra: &[(&str, &str)],
    ) -> Result<reqwest::Request> {
        let url = endpoint(&self.base_url, segments)?;
        let mut query: Vec<(&str, &str)> = extra.to_vec();
        if let Some(token) = page_token.filter(|t| !t.is_empty()) {
            query.push(("pageToken", token));
        }
        self.http
            .get(url)
            .bearer_auth(&self.token)
            .query(&query)
            .build()
            .context("failed to build Classroom request")
    }

    async fn execute_list<R: DeserializeOwned>(&self, request: reqwest::Request) -> Result<R> {
        debug!(url = %request.url(), "sending classroom request");
        let res = self
            .http
            .execute(request)
            .await
            .context("failed to reach Classroom")?;
        let res = ensure_success(res, "classroom").await?;
        res.json::<R>().await.context("invalid Classroom response")
    }
}

#[async_trait]
impl ClassroomService for ClassroomClient {
    async fn list_courses(&self, page_token: Option<&str>) -> Result<Page<Course>> {
        let states: Vec<(&str, &str)> = self
            .course_states
            .iter()
            .map(|state| ("courseStates", *state))
            .collect();
        let request = self.build_list_request(&["v1", "courses"], page_token, &states)?;
        let resp: ListCoursesResp = self.execute_list(request).await?;
        Ok(resp.into())
    }

    async fn list_course_work(
        &self,
        course_id: &str,
        page_token: Option<&str>,
    ) -> Result<Page<ContentRecord>> {
        let segments = ["v1", "courses", course_id, "courseWork"];
        let request = self.build_list_request(&segments, page_token, &[])?;
        let resp: ListCourseWorkResp = self
            .execute_list(request)
            .await
            .with_context(|| format!("failed to list course work of {}", course_id))?;
        Ok(resp.into())
    }

    async fn list_course_work_materials(
        &self,
        course_id: &str,
        page_token: Option<&str>,
    ) -> Result<Page<ContentRecord>> {
        let segments = ["v1", "courses", course_id, "courseWorkMaterials"];
        let request = self.build_list_request(&segments, page_token, &[])?;
        let resp: ListCourseWorkMaterialsResp = self
            .execute_list(request)
            .await
            .with_context(|| format!("failed to list course materials of {}", course_id))?;
        Ok(resp.into())
    }
}
