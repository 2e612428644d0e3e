#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;
use classroom_zip::classroom::model::{ContentRecord, Material};
use classroom_zip::classroom::ClassroomService;
use classroom_zip::drive::{byte_stream_from, ByteStream, DriveService, FileMetadata};
use classroom_zip::model::{Course, Page};
use futures::TryStreamExt;
use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const GOOGLE_DOC: &str = "application/vnd.google-apps.document";

pub fn course(id: &str, name: &str) -> Course {
    Course {
        id: id.into(),
        name: name.into(),
        section: None,
        state: Some("ACTIVE".into()),
    }
}

pub fn record(title: &str, file_ids: &[&str]) -> ContentRecord {
    ContentRecord {
        id: format!("rec-{}", title),
        title: Some(title.into()),
        materials: file_ids
            .iter()
            .map(|id| Material::drive_file(id, None))
            .collect(),
    }
}

/// Classroom fake: one page per collection unless a course is given several.
#[derive(Clone, Default)]
pub struct FakeClassroom {
    pub courses: Vec<Course>,
    pub work: HashMap<String, Vec<ContentRecord>>,
    pub materials: HashMap<String, Vec<ContentRecord>>,
    pub failing: HashSet<String>,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl FakeClassroom {
    pub fn with_course(mut self, id: &str, name: &str) -> Self {
        self.courses.push(course(id, name));
        self
    }

    pub fn with_work(mut self, course_id: &str, record: ContentRecord) -> Self {
        self.work.entry(course_id.into()).or_default().push(record);
        self
    }

    pub fn with_material(mut self, course_id: &str, record: ContentRecord) -> Self {
        self.materials
            .entry(course_id.into())
            .or_default()
            .push(record);
        self
    }

    pub fn failing(mut self, course_id: &str) -> Self {
        self.failing.insert(course_id.into());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Records are served one per page to exercise continuation tokens.
    fn page(
        &self,
        source: &HashMap<String, Vec<ContentRecord>>,
        course_id: &str,
        page_token: Option<&str>,
    ) -> Result<Page<ContentRecord>> {
        if self.failing.contains(course_id) {
            return Err(anyhow!("classroom error 403 Forbidden: {}", course_id));
        }
        let records = source.get(course_id).cloned().unwrap_or_default();
        let index: usize = match page_token {
            Some(token) => token.parse()?,
            None => 0,
        };
        let next = (index + 1 < records.len()).then(|| (index + 1).to_string());
        Ok(Page::new(
            records.into_iter().skip(index).take(1).collect(),
            next,
        ))
    }
}

#[async_trait]
impl ClassroomService for FakeClassroom {
    async fn list_courses(&self, _page_token: Option<&str>) -> Result<Page<Course>> {
        self.calls.lock().unwrap().push("courses".into());
        Ok(Page::last(self.courses.clone()))
    }

    async fn list_course_work(
        &self,
        course_id: &str,
        page_token: Option<&str>,
    ) -> Result<Page<ContentRecord>> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("work:{}", course_id));
        self.page(&self.work, course_id, page_token)
    }

    async fn list_course_work_materials(
        &self,
        course_id: &str,
        page_token: Option<&str>,
    ) -> Result<Page<ContentRecord>> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("materials:{}", course_id));
        self.page(&self.materials, course_id, page_token)
    }
}

/// Drive fake recording every call; unknown ids fail like a 404.
#[derive(Clone, Default)]
pub struct FakeDrive {
    pub files: HashMap<String, (FileMetadata, Vec<u8>)>,
    pub delays: HashMap<String, Duration>,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl FakeDrive {
    pub fn with_file(mut self, id: &str, name: &str, mime: &str, content: &[u8]) -> Self {
        self.files
            .insert(id.into(), (FileMetadata::new(name, mime), content.to_vec()));
        self
    }

    pub fn with_delay(mut self, id: &str, delay: Duration) -> Self {
        self.delays.insert(id.into(), delay);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn metadata_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.starts_with("meta:"))
            .count()
    }

    async fn content(&self, file_id: &str) -> Result<ByteStream> {
        if let Some(delay) = self.delays.get(file_id) {
            tokio::time::sleep(*delay).await;
        }
        let (_, data) = self
            .files
            .get(file_id)
            .ok_or_else(|| anyhow!("drive error 404 Not Found: {}", file_id))?;
        Ok(byte_stream_from(data.clone()))
    }
}

#[async_trait]
impl DriveService for FakeDrive {
    async fn file_metadata(&self, file_id: &str) -> Result<FileMetadata> {
        self.calls.lock().unwrap().push(format!("meta:{}", file_id));
        self.files
            .get(file_id)
            .map(|(meta, _)| meta.clone())
            .ok_or_else(|| anyhow!("drive error 404 Not Found: {}", file_id))
    }

    async fn download(&self, file_id: &str) -> Result<ByteStream> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("download:{}", file_id));
        self.content(file_id).await
    }

    async fn export(&self, file_id: &str, mime_type: &str) -> Result<ByteStream> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("export:{}:{}", file_id, mime_type));
        self.content(file_id).await
    }
}

/// Decode an archive into (member name, payload) pairs in directory order.
pub fn unzip(archive: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive)).unwrap();
    (0..zip.len())
        .map(|i| {
            let mut file = zip.by_index(i).unwrap();
            let mut data = Vec::new();
            file.read_to_end(&mut data).unwrap();
            (file.name().to_string(), data)
        })
        .collect()
}

pub async fn collect_archive<S>(chunks: S) -> Vec<u8>
where
    S: futures::Stream<Item = std::io::Result<Bytes>>,
{
    let chunks: Vec<Bytes> = chunks.try_collect().await.unwrap();
    chunks.iter().flat_map(|c| c.iter().copied()).collect()
}

pub fn names(members: &[(String, Vec<u8>)]) -> Vec<&str> {
    members.iter().map(|(n, _)| n.as_str()).collect()
}
