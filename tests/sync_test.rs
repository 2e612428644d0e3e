mod common;

use classroom_zip::db;
use classroom_zip::sync::{sync_courses, SyncOptions};
use common::*;
use std::path::Path;

async fn setup_pool() -> db::Pool {
    let pool = db::init_pool("sqlite::memory:").await.unwrap();
    db::run_migrations(&pool).await.unwrap();
    pool
}

fn options(base: &Path) -> SyncOptions {
    SyncOptions {
        base_dir: base.to_path_buf(),
        course_name_contains: None,
        dry_run: false,
    }
}

fn fixtures() -> (FakeClassroom, FakeDrive) {
    let classroom = FakeClassroom::default()
        .with_course("c1", "Physics 101")
        .with_course("c2", "")
        .with_work("c1", record("HW", &["a", "missing"]))
        .with_material("c1", record("Notes", &["doc"]))
        .with_work("c2", record("Essay", &["b"]));
    let drive = FakeDrive::default()
        .with_file("a", "a.txt", "text/plain", b"alpha")
        .with_file("doc", "Lecture 1", GOOGLE_DOC, b"%PDF")
        .with_file("b", "b.txt", "text/plain", b"beta");
    (classroom, drive)
}

#[tokio::test]
async fn mirrors_courses_and_records_index() {
    let dir = tempfile::tempdir().unwrap();
    let pool = setup_pool().await;
    let (classroom, drive) = fixtures();

    let summary = sync_courses(&classroom, &drive, &pool, &options(dir.path()))
        .await
        .unwrap();

    assert_eq!(summary.courses, 2);
    assert_eq!(summary.written, 3);
    assert_eq!(summary.skipped, 1);
    assert_eq!(
        std::fs::read(dir.path().join("Physics 101/a.txt")).unwrap(),
        b"alpha"
    );
    assert_eq!(
        std::fs::read(dir.path().join("Physics 101/Lecture 1.pdf")).unwrap(),
        b"%PDF"
    );
    assert_eq!(
        std::fs::read(dir.path().join("course_c2/b.txt")).unwrap(),
        b"beta"
    );
    assert_eq!(db::count_downloads(&pool).await.unwrap(), 3);
    assert!(db::find_download(&pool, "missing").await.unwrap().is_none());
}

#[tokio::test]
async fn second_run_skips_indexed_files() {
    let dir = tempfile::tempdir().unwrap();
    let pool = setup_pool().await;
    let (classroom, drive) = fixtures();

    sync_courses(&classroom, &drive, &pool, &options(dir.path()))
        .await
        .unwrap();
    let fetches_before = drive.metadata_calls();

    let summary = sync_courses(&classroom, &drive, &pool, &options(dir.path()))
        .await
        .unwrap();
    assert_eq!(summary.written, 0);
    // Only the file that failed before is tried again.
    assert_eq!(drive.metadata_calls(), fetches_before + 1);
}

#[tokio::test]
async fn existing_local_file_is_recorded_not_rewritten() {
    let dir = tempfile::tempdir().unwrap();
    let pool = setup_pool().await;
    let (classroom, drive) = fixtures();
    std::fs::create_dir_all(dir.path().join("Physics 101")).unwrap();
    std::fs::write(dir.path().join("Physics 101/a.txt"), b"local").unwrap();

    let summary = sync_courses(&classroom, &drive, &pool, &options(dir.path()))
        .await
        .unwrap();

    assert_eq!(summary.already_present, 1);
    assert_eq!(
        std::fs::read(dir.path().join("Physics 101/a.txt")).unwrap(),
        b"local"
    );
    assert!(db::find_download(&pool, "a").await.unwrap().is_some());
}

#[tokio::test]
async fn dry_run_touches_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let pool = setup_pool().await;
    let (classroom, drive) = fixtures();
    let mut opts = options(dir.path());
    opts.dry_run = true;

    let summary = sync_courses(&classroom, &drive, &pool, &opts).await.unwrap();

    assert_eq!(summary.planned, 4);
    assert!(drive.calls().is_empty());
    assert_eq!(db::count_downloads(&pool).await.unwrap(), 0);
    assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
}

#[tokio::test]
async fn name_filter_and_failing_course() {
    let dir = tempfile::tempdir().unwrap();
    let pool = setup_pool().await;
    let (classroom, drive) = fixtures();
    let classroom = classroom.failing("c1");

    let summary = sync_courses(&classroom, &drive, &pool, &options(dir.path()))
        .await
        .unwrap();
    assert_eq!(summary.failed_courses, 1);
    assert_eq!(summary.written, 1);
    assert!(dir.path().join("course_c2/b.txt").exists());

    let mut opts = options(dir.path());
    opts.course_name_contains = Some("PHYSICS".into());
    let summary = sync_courses(&classroom, &drive, &pool, &opts).await.unwrap();
    assert_eq!(summary.courses, 1);
    assert_eq!(summary.failed_courses, 1);
}

#[tokio::test]
async fn local_write_failure_moves_on_to_next_file() {
    let dir = tempfile::tempdir().unwrap();
    let pool = setup_pool().await;
    let (classroom, drive) = fixtures();
    // A plain file where the course folder should go makes every write fail.
    std::fs::write(dir.path().join("Physics 101"), b"not a dir").unwrap();

    let summary = sync_courses(&classroom, &drive, &pool, &options(dir.path()))
        .await
        .unwrap();

    assert_eq!(summary.failed_courses, 0);
    assert_eq!(summary.failed_writes, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.written, 1);
    assert_eq!(drive.metadata_calls(), 4);
    assert!(dir.path().join("course_c2/b.txt").exists());
    assert!(db::find_download(&pool, "a").await.unwrap().is_none());
    assert!(db::find_download(&pool, "doc").await.unwrap().is_none());
    assert_eq!(db::count_downloads(&pool).await.unwrap(), 1);
}
