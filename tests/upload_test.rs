mod common;

use axum::http::StatusCode;
use common::*;
use sea_orm::{EntityTrait, PaginatorTrait};
use std::sync::Arc;
use std::time::Duration;
use studyhub_backend::entities::prelude::*;
use studyhub_backend::entities::stored_files;
use studyhub_backend::services::placement::StorageBackend;
use studyhub_backend::utils::auth::create_jwt_with_ttl;

const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

fn summary_parts<'a>(title: &'a str, course_id: &'a str, data: &'a [u8]) -> Vec<Part<'a>> {
    vec![
        Part::Text("title", title),
        Part::Text("description", "סיכום של כל ההרצאות"),
        Part::Text("courseId", course_id),
        Part::File {
            filename: "lecture-notes.pdf",
            content_type: "application/pdf",
            data,
        },
    ]
}

#[tokio::test]
async fn test_local_upload_is_placed_and_recorded() {
    let t = spawn_app(TestOptions::default()).await;
    let token = t.token(&t.student);
    let course_id = t.course.id.to_string();
    let data = pdf_bytes(4096);

    let (status, body) = t
        .upload(Some(&token), &summary_parts("מבני נתונים - סיכום", &course_id, &data))
        .await;

    assert_eq!(status, StatusCode::CREATED, "{body}");
    let summary = &body["summary"];
    let file_path = summary["filePath"].as_str().unwrap();
    assert!(file_path.starts_with("uploads/summary-"));
    assert!(file_path.ends_with(".pdf"));
    assert_eq!(summary["storage"], "local");
    assert_eq!(summary["courseId"], t.course.id);
    assert_eq!(summary["uploadedById"], t.student.id);
    assert!(summary["avgRating"].is_null());

    let name = file_path.trim_start_matches("uploads/");
    assert_eq!(std::fs::read(t.upload_dir.path().join(name)).unwrap(), data);
    assert_eq!(t.staged_count(), 0);

    let stored = StoredFiles::find().all(&t.db).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].kind, stored_files::KIND_LOCAL);
    assert_eq!(stored[0].size, 4096);
    assert_eq!(stored[0].local_path.as_deref(), Some(file_path));
}

#[tokio::test]
async fn test_docx_upload_is_accepted() {
    let t = spawn_app(TestOptions::default()).await;
    let token = t.token(&t.student);
    let course_id = t.course.id.to_string();
    let mut data = b"PK\x03\x04".to_vec();
    data.resize(2048, 0);

    let (status, body) = t
        .upload(
            Some(&token),
            &[
                Part::Text("title", "Summary in Word"),
                Part::Text("courseId", &course_id),
                Part::File {
                    filename: "notes.docx",
                    content_type: DOCX_MIME,
                    data: &data,
                },
            ],
        )
        .await;

    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert!(body["summary"]["filePath"].as_str().unwrap().ends_with(".docx"));
}

#[tokio::test]
async fn test_remote_upload_uses_remote_reference() {
    let remote = Arc::new(RecordingRemote::default());
    let t = spawn_app(TestOptions {
        backend: StorageBackend::RemoteWithFallback(remote.clone()),
        ..Default::default()
    })
    .await;
    let token = t.token(&t.student);
    let course_id = t.course.id.to_string();
    let data = pdf_bytes(2048);

    let (status, body) = t
        .upload(Some(&token), &summary_parts("Remote summary", &course_id, &data))
        .await;

    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["summary"]["filePath"], "https://drive.example/abc123");
    assert_eq!(body["summary"]["storage"], "remote");
    assert_eq!(t.staged_count(), 0);
    assert_eq!(t.uploaded_count(), 0);

    let uploads = remote.uploads.lock().unwrap();
    assert_eq!(uploads.len(), 1);
    assert!(uploads[0].0.starts_with("summary-"));
    assert_eq!(uploads[0].1, data);

    let stored = StoredFiles::find().all(&t.db).await.unwrap();
    assert_eq!(stored[0].kind, stored_files::KIND_REMOTE);
    assert_eq!(stored[0].remote_id.as_deref(), Some("abc123"));
}

#[tokio::test]
async fn test_remote_failure_falls_back_to_local() {
    let t = spawn_app(TestOptions {
        backend: StorageBackend::RemoteWithFallback(Arc::new(FailingRemote)),
        ..Default::default()
    })
    .await;
    let token = t.token(&t.student);
    let course_id = t.course.id.to_string();
    let data = pdf_bytes(2048);

    let (status, body) = t
        .upload(Some(&token), &summary_parts("Fallback summary", &course_id, &data))
        .await;

    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert!(body["summary"]["filePath"].as_str().unwrap().starts_with("uploads/"));
    assert_eq!(t.uploaded_count(), 1);
    assert_eq!(t.staged_count(), 0);
}

#[tokio::test]
async fn test_remote_timeout_falls_back_to_local() {
    let t = spawn_app(TestOptions {
        backend: StorageBackend::RemoteWithFallback(Arc::new(SlowRemote)),
        remote_timeout: Duration::from_millis(200),
        ..Default::default()
    })
    .await;
    let token = t.token(&t.student);
    let course_id = t.course.id.to_string();
    let data = pdf_bytes(2048);

    let started = std::time::Instant::now();
    let (status, body) = t
        .upload(Some(&token), &summary_parts("Slow remote", &course_id, &data))
        .await;

    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(body["summary"]["filePath"].as_str().unwrap().starts_with("uploads/"));
    assert_eq!(t.staged_count(), 0);
}

#[tokio::test]
async fn test_rejects_disallowed_type_without_leftovers() {
    let t = spawn_app(TestOptions::default()).await;
    let token = t.token(&t.student);
    let course_id = t.course.id.to_string();

    let (status, body) = t
        .upload(
            Some(&token),
            &[
                Part::Text("title", "Plain text"),
                Part::Text("courseId", &course_id),
                Part::File {
                    filename: "notes.txt",
                    content_type: "text/plain",
                    data: b"just some text",
                },
            ],
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "רק קבצי PDF ו-DOCX מותרים");
    assert_eq!(t.staged_count(), 0);
    assert_eq!(t.uploaded_count(), 0);
    assert_eq!(Summaries::find().count(&t.db).await.unwrap(), 0);
}

#[tokio::test]
async fn test_size_limit_boundary() {
    let t = spawn_app(TestOptions {
        max_file_size: 4096,
        ..Default::default()
    })
    .await;
    let token = t.token(&t.student);
    let course_id = t.course.id.to_string();

    let exact = pdf_bytes(4096);
    let (status, body) = t
        .upload(Some(&token), &summary_parts("Exactly at limit", &course_id, &exact))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let over = pdf_bytes(4097);
    let (status, _) = t
        .upload(Some(&token), &summary_parts("One byte over", &course_id, &over))
        .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

    assert_eq!(t.staged_count(), 0);
    assert_eq!(t.uploaded_count(), 1);
    assert_eq!(Summaries::find().count(&t.db).await.unwrap(), 1);
}

#[tokio::test]
async fn test_invalid_fields_clean_up_staged_file() {
    let t = spawn_app(TestOptions::default()).await;
    let token = t.token(&t.student);
    let data = pdf_bytes(1024);
    let course_id = t.course.id.to_string();

    let (status, body) = t
        .upload(
            Some(&token),
            &[
                Part::Text("courseId", &course_id),
                Part::File {
                    filename: "notes.pdf",
                    content_type: "application/pdf",
                    data: &data,
                },
            ],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "כותרת היא שדה חובה");

    let (status, _) = t
        .upload(Some(&token), &summary_parts("ab", &course_id, &data))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = t
        .upload(Some(&token), &[Part::Text("title", "No file"), Part::Text("courseId", &course_id)])
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "יש להעלות קובץ PDF או DOCX");

    assert_eq!(t.staged_count(), 0);
    assert_eq!(t.uploaded_count(), 0);
}

#[tokio::test]
async fn test_unknown_course_is_not_found() {
    let t = spawn_app(TestOptions::default()).await;
    let token = t.token(&t.student);
    let data = pdf_bytes(1024);

    let (status, body) = t
        .upload(Some(&token), &summary_parts("Lost course", "9999", &data))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "קורס לא נמצא");
    assert_eq!(t.staged_count(), 0);
    assert_eq!(t.uploaded_count(), 0);
}

#[tokio::test]
async fn test_recorder_failure_reports_error_after_placement() {
    let t = spawn_app(TestOptions {
        recorder: Some(Arc::new(FailingRecorder)),
        ..Default::default()
    })
    .await;
    let token = t.token(&t.student);
    let course_id = t.course.id.to_string();
    let data = pdf_bytes(1024);

    let (status, body) = t
        .upload(Some(&token), &summary_parts("Never recorded", &course_id, &data))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "שגיאה בהעלאת סיכום");
    assert_eq!(t.staged_count(), 0);
    // placed bytes stay behind as a logged orphan
    assert_eq!(t.uploaded_count(), 1);
    assert_eq!(Summaries::find().count(&t.db).await.unwrap(), 0);
}

#[tokio::test]
async fn test_recorder_failure_after_remote_push_leaves_remote_object() {
    let remote = Arc::new(RecordingRemote::default());
    let t = spawn_app(TestOptions {
        backend: StorageBackend::RemoteWithFallback(remote.clone()),
        recorder: Some(Arc::new(FailingRecorder)),
        ..Default::default()
    })
    .await;
    let token = t.token(&t.student);
    let course_id = t.course.id.to_string();
    let data = pdf_bytes(1024);

    let (status, body) = t
        .upload(Some(&token), &summary_parts("Orphaned remotely", &course_id, &data))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "שגיאה בהעלאת סיכום");
    assert_eq!(t.staged_count(), 0);
    assert_eq!(t.uploaded_count(), 0);
    // the remote object is reported as orphaned, not deleted
    assert_eq!(remote.uploads.lock().unwrap().len(), 1);
    assert!(remote.deletes.lock().unwrap().is_empty());
    assert_eq!(Summaries::find().count(&t.db).await.unwrap(), 0);
}

#[tokio::test]
async fn test_upload_requires_valid_session() {
    let t = spawn_app(TestOptions::default()).await;
    let course_id = t.course.id.to_string();
    let data = pdf_bytes(1024);

    let (status, body) = t
        .upload(None, &summary_parts("Anonymous", &course_id, &data))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "לא סופק טוקן אימות");

    let expired =
        create_jwt_with_ttl(t.student.id, &t.config.jwt_secret, chrono::Duration::seconds(-60))
            .unwrap();
    let (status, body) = t
        .upload(Some(&expired), &summary_parts("Expired", &course_id, &data))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "הטוקן פג תוקף");

    let (status, _) = t
        .upload(Some("not-a-jwt"), &summary_parts("Forged", &course_id, &data))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert_eq!(t.staged_count(), 0);
    assert_eq!(t.uploaded_count(), 0);
}

#[tokio::test]
async fn test_upload_rate_limit() {
    let t = spawn_app(TestOptions {
        uploads_per_hour: 1,
        ..Default::default()
    })
    .await;
    let token = t.token(&t.student);
    let course_id = t.course.id.to_string();
    let data = pdf_bytes(1024);

    let (status, _) = t
        .upload(Some(&token), &summary_parts("First", &course_id, &data))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = t
        .upload(Some(&token), &summary_parts("Second", &course_id, &data))
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_concurrent_uploads_get_distinct_files() {
    let t = spawn_app(TestOptions::default()).await;
    let token = t.token(&t.student);
    let course_id = t.course.id.to_string();

    let uploads = (0..5usize).map(|i| {
        let token = token.clone();
        let course_id = course_id.clone();
        let t = &t;
        async move {
            let title = format!("Parallel summary {}", i);
            let data = pdf_bytes(1024 + i);
            let (status, body) = t
                .upload(Some(&token), &summary_parts(&title, &course_id, &data))
                .await;
            assert_eq!(status, StatusCode::CREATED, "{body}");
            body["summary"]["filePath"].as_str().unwrap().to_string()
        }
    });

    let mut paths = futures::future::join_all(uploads).await;
    paths.sort();
    paths.dedup();

    assert_eq!(paths.len(), 5);
    assert_eq!(t.uploaded_count(), 5);
    assert_eq!(t.staged_count(), 0);
}

#[tokio::test]
async fn test_two_megabyte_pdf_is_stored_locally() {
    let t = spawn_app(TestOptions::default()).await;
    let token = t.token(&t.student);
    let course_id = t.course.id.to_string();
    let data = pdf_bytes(2 * 1024 * 1024);

    let (status, body) = t
        .upload(Some(&token), &summary_parts("Algorithms Midterm", &course_id, &data))
        .await;

    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["message"], "הסיכום הועלה בהצלחה");
    assert_eq!(body["summary"]["title"], "Algorithms Midterm");
    assert!(body["summary"]["filePath"].as_str().unwrap().starts_with("uploads/"));
    assert_eq!(t.uploaded_count(), 1);
    assert_eq!(t.staged_count(), 0);
}
