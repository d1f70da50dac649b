use crate::entities::{stored_files, summaries};
use crate::services::placement::StoredFile;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, Set, TransactionTrait};
use uuid::Uuid;

/// User supplied part of a new summary
#[derive(Debug, Clone)]
pub struct NewSummary {
    pub title: String,
    pub description: Option<String>,
    pub course_id: i32,
    pub owner_id: i32,
}

/// Facts about the uploaded bytes, captured while staging
#[derive(Debug, Clone)]
pub struct FileFacts {
    pub mime_type: String,
    pub size: u64,
    pub sha256: String,
}

/// Persists a summary once its bytes have a final location.
#[async_trait]
pub trait SummaryRecorder: Send + Sync {
    async fn create(
        &self,
        summary: NewSummary,
        stored: &StoredFile,
        facts: &FileFacts,
    ) -> Result<summaries::Model, DbErr>;
}

pub struct DbSummaryRecorder {
    db: DatabaseConnection,
}

impl DbSummaryRecorder {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SummaryRecorder for DbSummaryRecorder {
    async fn create(
        &self,
        summary: NewSummary,
        stored: &StoredFile,
        facts: &FileFacts,
    ) -> Result<summaries::Model, DbErr> {
        let now = Utc::now();
        let stored_file_id = Uuid::new_v4().to_string();

        let mut record = stored_files::ActiveModel {
            id: Set(stored_file_id.clone()),
            kind: Set(stored.kind().to_string()),
            local_path: Set(None),
            provider: Set(None),
            remote_id: Set(None),
            remote_url: Set(None),
            mime_type: Set(facts.mime_type.clone()),
            size: Set(facts.size as i64),
            sha256: Set(facts.sha256.clone()),
            created_at: Set(now),
        };
        match stored {
            StoredFile::Local { path } => record.local_path = Set(Some(path.clone())),
            StoredFile::Remote { provider, id, url } => {
                record.provider = Set(Some(provider.clone()));
                record.remote_id = Set(Some(id.clone()));
                record.remote_url = Set(Some(url.clone()));
            }
        }

        let txn = self.db.begin().await?;

        record.insert(&txn).await?;

        let created = summaries::ActiveModel {
            title: Set(summary.title),
            description: Set(summary.description),
            file_path: Set(stored.file_path().to_string()),
            stored_file_id: Set(stored_file_id),
            course_id: Set(summary.course_id),
            uploaded_by_id: Set(summary.owner_id),
            avg_rating: Set(None),
            upload_date: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        Ok(created)
    }
}
