#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode, header},
};
use chrono::Utc;
use http_body_util::BodyExt;
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, DbErr, Set};
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use studyhub_backend::config::AppConfig;
use studyhub_backend::entities::{courses, summaries, users};
use studyhub_backend::infrastructure::database;
use studyhub_backend::services::placement::{LocalStore, PlacementResolver, StorageBackend, StoredFile};
use studyhub_backend::services::recorder::{DbSummaryRecorder, FileFacts, NewSummary, SummaryRecorder};
use studyhub_backend::services::remote::{RemoteObject, RemoteStorage, RemoteStorageError};
use studyhub_backend::services::staging::StagingArea;
use studyhub_backend::utils::auth::create_jwt;
use studyhub_backend::{AppState, create_app};
use tempfile::TempDir;
use tower::ServiceExt;

pub const BOUNDARY: &str = "studyhub-test-boundary";

pub struct TestOptions {
    pub backend: StorageBackend,
    pub recorder: Option<Arc<dyn SummaryRecorder>>,
    pub max_file_size: usize,
    pub remote_timeout: Duration,
    pub uploads_per_hour: u32,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            backend: StorageBackend::LocalOnly,
            recorder: None,
            max_file_size: 10 * 1024 * 1024,
            remote_timeout: Duration::from_secs(5),
            uploads_per_hour: 1000,
        }
    }
}

pub struct TestApp {
    pub app: Router,
    pub db: DatabaseConnection,
    pub config: AppConfig,
    pub staging_dir: TempDir,
    pub upload_dir: TempDir,
    pub student: users::Model,
    pub other: users::Model,
    pub admin: users::Model,
    pub course: courses::Model,
    pub second_course: courses::Model,
}

impl TestApp {
    pub fn token(&self, user: &users::Model) -> String {
        create_jwt(user.id, &self.config.jwt_secret).unwrap()
    }

    pub fn staged_count(&self) -> usize {
        file_count(self.staging_dir.path())
    }

    pub fn uploaded_count(&self) -> usize {
        file_count(self.upload_dir.path())
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
        (status, headers, body)
    }

    pub async fn send_json(&self, request: Request<Body>) -> (StatusCode, Value) {
        let (status, _, body) = self.send(request).await;
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }

    /// Uploads through the API and returns the response status and JSON body
    pub async fn upload(&self, token: Option<&str>, parts: &[Part<'_>]) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/summaries")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            );
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = builder.body(Body::from(multipart_body(parts))).unwrap();
        self.send_json(request).await
    }

    /// Uploads a PDF as `user` and returns the created summary JSON
    pub async fn upload_pdf(&self, user: &users::Model, title: &str, course_id: i32) -> Value {
        let token = self.token(user);
        let course_id = course_id.to_string();
        let data = pdf_bytes(1024);
        let (status, body) = self
            .upload(
                Some(&token),
                &[
                    Part::Text("title", title),
                    Part::Text("courseId", &course_id),
                    Part::File {
                        filename: "notes.pdf",
                        content_type: "application/pdf",
                        data: &data,
                    },
                ],
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "upload failed: {body}");
        body["summary"].clone()
    }
}

pub async fn spawn_app(options: TestOptions) -> TestApp {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    database::run_migrations(&db).await.unwrap();

    let staging_dir = tempfile::tempdir().unwrap();
    let upload_dir = tempfile::tempdir().unwrap();

    let config = AppConfig {
        max_file_size: options.max_file_size,
        staging_dir: staging_dir.path().to_path_buf(),
        upload_dir: upload_dir.path().to_path_buf(),
        uploads_per_hour: options.uploads_per_hour,
        ..AppConfig::development()
    };

    let staging = StagingArea::open(staging_dir.path(), options.max_file_size as u64)
        .await
        .unwrap();
    let local = LocalStore::open(upload_dir.path()).await.unwrap();
    let placement = PlacementResolver::new(local, options.backend, options.remote_timeout);
    let recorder = options
        .recorder
        .unwrap_or_else(|| Arc::new(DbSummaryRecorder::new(db.clone())));

    let state = AppState::new(db.clone(), config.clone(), staging, placement, recorder);

    let student = create_user(&db, "דנה כהן", "dana@example.com", users::ROLE_STUDENT).await;
    let other = create_user(&db, "Omer Levi", "omer@example.com", users::ROLE_STUDENT).await;
    let admin = create_user(&db, "Admin", "admin@example.com", users::ROLE_ADMIN).await;
    let course = create_course(&db, "20407", "מבני נתונים").await;
    let second_course = create_course(&db, "20109", "אלגברה לינארית").await;

    TestApp {
        app: create_app(state),
        db,
        config,
        staging_dir,
        upload_dir,
        student,
        other,
        admin,
        course,
        second_course,
    }
}

pub async fn create_user(db: &DatabaseConnection, name: &str, email: &str, role: &str) -> users::Model {
    users::ActiveModel {
        full_name: Set(name.to_string()),
        email: Set(email.to_string()),
        role: Set(role.to_string()),
        institution: Set(None),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn create_course(db: &DatabaseConnection, code: &str, name: &str) -> courses::Model {
    create_course_at(db, code, name, "האוניברסיטה הפתוחה").await
}

pub async fn create_course_at(
    db: &DatabaseConnection,
    code: &str,
    name: &str,
    institution: &str,
) -> courses::Model {
    courses::ActiveModel {
        course_code: Set(code.to_string()),
        course_name: Set(name.to_string()),
        institution: Set(institution.to_string()),
        semester: Set("2026א".to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub fn file_count(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.path().is_file())
        .count()
}

pub fn pdf_bytes(len: usize) -> Vec<u8> {
    let mut data = b"%PDF-1.7\n".to_vec();
    data.resize(len, b'x');
    data
}

pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        filename: &'a str,
        content_type: &'a str,
        data: &'a [u8],
    },
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                filename,
                content_type,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                        filename, content_type
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// Remote that accepts everything and remembers what it saw
#[derive(Default)]
pub struct RecordingRemote {
    pub uploads: Mutex<Vec<(String, Vec<u8>)>>,
    pub deletes: Mutex<Vec<String>>,
}

#[async_trait]
impl RemoteStorage for RecordingRemote {
    fn provider_id(&self) -> &'static str {
        "google_drive"
    }

    async fn upload(
        &self,
        path: &Path,
        file_name: &str,
        _mime_type: &str,
    ) -> Result<RemoteObject, RemoteStorageError> {
        let data = tokio::fs::read(path).await?;
        self.uploads
            .lock()
            .unwrap()
            .push((file_name.to_string(), data));
        Ok(RemoteObject {
            id: "abc123".to_string(),
            url: "https://drive.example/abc123".to_string(),
        })
    }

    async fn delete(&self, id: &str) -> Result<(), RemoteStorageError> {
        self.deletes.lock().unwrap().push(id.to_string());
        Ok(())
    }

    async fn verify(&self) -> Result<(), RemoteStorageError> {
        Ok(())
    }
}

pub struct FailingRemote;

#[async_trait]
impl RemoteStorage for FailingRemote {
    fn provider_id(&self) -> &'static str {
        "google_drive"
    }

    async fn upload(&self, _: &Path, _: &str, _: &str) -> Result<RemoteObject, RemoteStorageError> {
        Err(RemoteStorageError::Api {
            status: 503,
            message: "backend unavailable".to_string(),
        })
    }

    async fn delete(&self, _: &str) -> Result<(), RemoteStorageError> {
        Err(RemoteStorageError::Auth("credentials rejected".to_string()))
    }

    async fn verify(&self) -> Result<(), RemoteStorageError> {
        Err(RemoteStorageError::Auth("credentials rejected".to_string()))
    }
}

/// Remote that never answers in time
pub struct SlowRemote;

#[async_trait]
impl RemoteStorage for SlowRemote {
    fn provider_id(&self) -> &'static str {
        "google_drive"
    }

    async fn upload(&self, _: &Path, _: &str, _: &str) -> Result<RemoteObject, RemoteStorageError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(RemoteObject {
            id: "late".to_string(),
            url: "https://drive.example/late".to_string(),
        })
    }

    async fn delete(&self, _: &str) -> Result<(), RemoteStorageError> {
        Ok(())
    }

    async fn verify(&self) -> Result<(), RemoteStorageError> {
        Ok(())
    }
}

pub struct FailingRecorder;

#[async_trait]
impl SummaryRecorder for FailingRecorder {
    async fn create(
        &self,
        _summary: NewSummary,
        _stored: &StoredFile,
        _facts: &FileFacts,
    ) -> Result<summaries::Model, DbErr> {
        Err(DbErr::Custom("database is gone".to_string()))
    }
}
