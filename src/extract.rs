//! Course content records → drive file attachments.
use anyhow::Result;
use futures::stream::{self, Stream, StreamExt, TryStreamExt};

use crate::classroom::model::ContentRecord;
use crate::classroom::ClassroomService;
use crate::model::{Attachment, Collection, Course};
use crate::paginate::paginate;

/// Every selectable course, across all listing pages.
pub fn courses<'a>(
    classroom: &'a dyn ClassroomService,
) -> impl Stream<Item = Result<Course>> + Send + 'a {
    paginate(move |token: Option<String>| async move {
        classroom.list_courses(token.as_deref()).await
    })
}

/// Content records of one collection of a course, across all listing pages.
pub fn records<'a>(
    classroom: &'a dyn ClassroomService,
    course_id: &'a str,
    collection: Collection,
) -> impl Stream<Item = Result<ContentRecord>> + Send + 'a {
    paginate(move |token: Option<String>| async move {
        match collection {
            Collection::CourseWork => {
                classroom
                    .list_course_work(course_id, token.as_deref())
                    .await
            }
            Collection::CourseWorkMaterial => {
                classroom
                    .list_course_work_materials(course_id, token.as_deref())
                    .await
            }
        }
    })
}

/// Drive file attachments of one record, in material order.
///
/// The label is the drive file's own title, else the record title, else the
/// collection's generic label.
pub fn record_attachments(record: &ContentRecord, collection: Collection) -> Vec<Attachment> {
    let record_title = non_blank(record.title.as_deref());
    record
        .materials
        .iter()
        .filter_map(|material| material.drive_file_ref())
        .filter_map(|df| {
            let file_id = df.id.clone()?;
            let title = non_blank(df.title.as_deref())
                .or(record_title)
                .unwrap_or(collection.fallback_title())
                .to_string();
            Some(Attachment {
                file_id,
                title,
                source: collection,
            })
        })
        .collect()
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.trim().is_empty())
}

/// Lazily enumerate a course's attachments: graded work first, then ungraded
/// material; within each, page order, record order, material order.
/// Duplicates are kept.
pub fn course_attachments<'a>(
    classroom: &'a dyn ClassroomService,
    course_id: &'a str,
) -> impl Stream<Item = Result<Attachment>> + Send + 'a {
    stream::iter([Collection::CourseWork, Collection::CourseWorkMaterial])
        .map(move |collection| {
            records(classroom, course_id, collection)
                .map_ok(move |record| {
                    stream::iter(
                        record_attachments(&record, collection)
                            .into_iter()
                            .map(Ok::<Attachment, anyhow::Error>),
                    )
                })
                .try_flatten()
        })
        .flatten()
}

/// Collect a course's attachments, failing on the first listing error.
pub async fn list_attachments(
    classroom: &dyn ClassroomService,
    course_id: &str,
) -> Result<Vec<Attachment>> {
    course_attachments(classroom, course_id).try_collect().await
}

/// Collect every selectable course.
pub async fn list_courses(classroom: &dyn ClassroomService) -> Result<Vec<Course>> {
    courses(classroom).try_collect().await
}
