use thiserror::Error;

/// Failures of the upload pipeline. Remote storage failures never appear here:
/// they are absorbed by the local fallback.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Payload too large: {size} bytes exceeds {limit} bytes")]
    PayloadTooLarge { size: u64, limit: u64 },

    #[error("Upload interrupted: {0}")]
    Interrupted(String),

    #[error("Course {0} not found")]
    CourseNotFound(i32),

    #[error("Filesystem error: {0}")]
    Filesystem(#[from] std::io::Error),

    #[error("Persistence error: {0}")]
    Persistence(#[from] sea_orm::DbErr),
}

/// Failures of summary management (read, edit, delete, rate).
#[derive(Error, Debug)]
pub enum SummaryError {
    #[error("Summary {0} not found")]
    NotFound(i32),

    #[error("Not allowed to modify summary {0}")]
    Forbidden(i32),

    #[error("Course {0} not found")]
    CourseNotFound(i32),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}
