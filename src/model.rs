use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One page of a remote listing: its items plus the opaque continuation token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_page_token: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_page_token: Option<String>) -> Self {
        Self {
            items,
            next_page_token,
        }
    }

    /// A page with no continuation token.
    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, None)
    }
}

/// A course as exposed to callers for selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Course {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// Which content collection an attachment was discovered in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    CourseWork,
    CourseWorkMaterial,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::CourseWork => "course_work",
            Collection::CourseWorkMaterial => "course_work_material",
        }
    }

    /// Label used when neither the drive file nor its record carries a title.
    pub fn fallback_title(&self) -> &'static str {
        match self {
            Collection::CourseWork => "Assignment",
            Collection::CourseWorkMaterial => "Material",
        }
    }
}

/// A drive file referenced from course content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attachment {
    pub file_id: String,
    pub title: String,
    pub source: Collection,
}

/// Read-only view of the "already downloaded" index taken before a run.
///
/// `version` is the index high-water mark at the time the snapshot was taken.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeenSnapshot {
    pub version: i64,
    ids: HashSet<String>,
}

impl SeenSnapshot {
    pub fn new(version: i64, ids: impl IntoIterator<Item = String>) -> Self {
        Self {
            version,
            ids: ids.into_iter().collect(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn contains(&self, file_id: &str) -> bool {
        self.ids.contains(file_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn course_serializes_without_missing_optionals() {
        let course = Course {
            id: "c1".into(),
            name: "Physics".into(),
            section: None,
            state: Some("ACTIVE".into()),
        };
        let json = serde_json::to_value(&course).unwrap();
        assert!(json.get("section").is_none());
        assert_eq!(json["state"], "ACTIVE");
    }

    #[test]
    fn seen_snapshot_membership() {
        let seen = SeenSnapshot::new(4, vec!["a".to_string(), "b".to_string()]);
        assert!(seen.contains("a"));
        assert!(!seen.contains("c"));
        assert_eq!(seen.len(), 2);
        assert!(SeenSnapshot::empty().is_empty());
    }
}
