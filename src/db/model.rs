use chrono::NaiveDateTime;

/// One row of `downloaded_files`.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct DownloadedFile {
    pub id: i64,
    pub file_id: String,
    pub course_id: Option<String>,
    pub name: String,
    pub size: i64,
    pub downloaded_at: NaiveDateTime,
}
