use crate::entities::{courses, prelude::*, summaries};
use crate::services::error::UploadError;
use crate::services::placement::{PlacementResolver, StoredFile};
use crate::services::recorder::{FileFacts, NewSummary, SummaryRecorder};
use crate::services::staging::{StagedFile, StagingArea};
use crate::utils::validation::first_validation_message;
use sea_orm::{DatabaseConnection, EntityTrait};
use std::sync::Arc;
use tracing::{debug, error, info};
use validator::Validate;

/// Title, description and course of a summary, trimmed and validated.
#[derive(Debug, Clone, Validate)]
pub struct SummaryFields {
    #[validate(length(min = 3, max = 200, message = "כותרת חייבת להכיל בין 3 ל-200 תווים"))]
    pub title: String,
    #[validate(length(max = 2000, message = "תיאור ארוך מדי"))]
    pub description: Option<String>,
    #[validate(range(min = 1, message = "מזהה קורס לא תקין"))]
    pub course_id: i32,
}

impl SummaryFields {
    pub fn new(title: &str, description: Option<&str>, course_id: i32) -> Result<Self, String> {
        let fields = Self {
            title: title.trim().to_string(),
            description: description
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            course_id,
        };
        fields
            .validate()
            .map_err(|e| first_validation_message(&e))?;
        Ok(fields)
    }

    /// Builds the fields from raw multipart text values.
    pub fn parse(
        title: Option<&str>,
        description: Option<&str>,
        course_id: Option<&str>,
    ) -> Result<Self, String> {
        let title = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| "כותרת היא שדה חובה".to_string())?;
        let course_id = course_id
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| "קורס הוא שדה חובה".to_string())?
            .parse::<i32>()
            .map_err(|_| "מזהה קורס לא תקין".to_string())?;

        Self::new(title, description, course_id)
    }
}

/// Result of a completed upload
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub summary: summaries::Model,
    pub course: courses::Model,
    pub stored: StoredFile,
}

/// Drives an upload from the staging area to a recorded summary.
pub struct UploadService {
    db: DatabaseConnection,
    staging: StagingArea,
    placement: Arc<PlacementResolver>,
    recorder: Arc<dyn SummaryRecorder>,
}

impl UploadService {
    pub fn new(
        db: DatabaseConnection,
        staging: StagingArea,
        placement: Arc<PlacementResolver>,
        recorder: Arc<dyn SummaryRecorder>,
    ) -> Self {
        Self {
            db,
            staging,
            placement,
            recorder,
        }
    }

    pub fn staging(&self) -> &StagingArea {
        &self.staging
    }

    /// Places a staged file and records the summary. Every early return
    /// drops `staged`, which deletes the staging copy.
    pub async fn complete(
        &self,
        fields: SummaryFields,
        owner_id: i32,
        staged: StagedFile,
    ) -> Result<UploadOutcome, UploadError> {
        debug!(
            "Upload of {} by user {} staged as {}",
            staged.original_filename(),
            owner_id,
            staged.name()
        );

        let course = Courses::find_by_id(fields.course_id)
            .one(&self.db)
            .await?
            .ok_or(UploadError::CourseNotFound(fields.course_id))?;

        let facts = FileFacts {
            mime_type: staged.mime_type().to_string(),
            size: staged.size(),
            sha256: staged.sha256().to_string(),
        };

        let stored = self.placement.resolve(staged).await?;
        debug!("Placed upload as {} at {}", stored.kind(), stored.file_path());

        let new_summary = NewSummary {
            title: fields.title,
            description: fields.description,
            course_id: fields.course_id,
            owner_id,
        };

        match self.recorder.create(new_summary, &stored, &facts).await {
            Ok(summary) => {
                info!(
                    "✅ Summary {} recorded ({}, {} bytes)",
                    summary.id,
                    stored.kind(),
                    facts.size
                );
                Ok(UploadOutcome {
                    summary,
                    course,
                    stored,
                })
            }
            Err(e) => {
                // TODO: release `stored` here once remote deletes are retried in the background
                error!(
                    "❌ Failed to record summary, {} file {} is now orphaned: {}",
                    stored.kind(),
                    stored.file_path(),
                    e
                );
                Err(UploadError::Persistence(e))
            }
        }
    }
}
