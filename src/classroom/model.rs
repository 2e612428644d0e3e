use serde::Deserialize;

use crate::model::{Course, Page};

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CourseResource {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub section: Option<String>,
    pub course_state: Option<String>,
}

impl From<CourseResource> for Course {
    fn from(c: CourseResource) -> Self {
        Course {
            id: c.id,
            name: c.name,
            section: c.section,
            state: c.course_state,
        }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListCoursesResp {
    #[serde(default)]
    pub courses: Vec<CourseResource>,
    pub next_page_token: Option<String>,
}

/// Shape shared by graded course work and ungraded course work materials.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord {
    #[serde(default)]
    pub id: String,
    pub title: Option<String>,
    #[serde(default)]
    pub materials: Vec<Material>,
}

/// Only drive file materials matter; links, videos and forms deserialize to
/// a material with `drive_file: None`.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    pub drive_file: Option<SharedDriveFile>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SharedDriveFile {
    pub drive_file: Option<DriveFileRef>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct DriveFileRef {
    pub id: Option<String>,
    pub title: Option<String>,
}

impl Material {
    pub fn drive_file(id: &str, title: Option<&str>) -> Self {
        Material {
            drive_file: Some(SharedDriveFile {
                drive_file: Some(DriveFileRef {
                    id: Some(id.to_string()),
                    title: title.map(str::to_string),
                }),
            }),
        }
    }

    /// Inner drive file reference, if this material has a usable one.
    pub fn drive_file_ref(&self) -> Option<&DriveFileRef> {
        self.drive_file
            .as_ref()
            .and_then(|shared| shared.drive_file.as_ref())
            .filter(|df| df.id.as_deref().is_some_and(|id| !id.is_empty()))
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListCourseWorkResp {
    #[serde(default)]
    pub course_work: Vec<ContentRecord>,
    pub next_page_token: Option<String>,
}

impl From<ListCourseWorkResp> for Page<ContentRecord> {
    fn from(resp: ListCourseWorkResp) -> Self {
        Page::new(resp.course_work, resp.next_page_token)
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListCourseWorkMaterialsResp {
    #[serde(default)]
    pub course_work_material: Vec<ContentRecord>,
    pub next_page_token: Option<String>,
}

impl From<ListCourseWorkMaterialsResp> for Page<ContentRecord> {
    fn from(resp: ListCourseWorkMaterialsResp) -> Self {
        Page::new(resp.course_work_material, resp.next_page_token)
    }
}

impl From<ListCoursesResp> for Page<Course> {
    fn from(resp: ListCoursesResp) -> Self {
        Page::new(
            resp.courses.into_iter().map(Course::from).collect(),
            resp.next_page_token,
        )
    }
}
