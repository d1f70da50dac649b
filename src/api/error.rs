use crate::services::error::{SummaryError, UploadError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Payload Too Large: {0}")]
    PayloadTooLarge(String),

    #[error("Too Many Requests: {0}")]
    TooManyRequests(String),

    /// Internal failure; the first field is logged, the second is shown to the user
    #[error("Internal Server Error: {0}")]
    Internal(String, &'static str),

    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

const GENERIC_ERROR: &str = "שגיאת שרת פנימית";

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Validation(msg) => AppError::BadRequest(msg),
            UploadError::UnsupportedMediaType(_) => {
                AppError::BadRequest("רק קבצי PDF ו-DOCX מותרים".to_string())
            }
            UploadError::PayloadTooLarge { limit, .. } => AppError::PayloadTooLarge(format!(
                "הקובץ גדול מדי. הגודל המרבי הוא {} MB",
                limit / 1024 / 1024
            )),
            UploadError::Interrupted(_) => {
                AppError::BadRequest("העלאת הקובץ נקטעה".to_string())
            }
            UploadError::CourseNotFound(_) => AppError::NotFound("קורס לא נמצא".to_string()),
            UploadError::Filesystem(e) => {
                AppError::Internal(format!("Filesystem: {}", e), "שגיאה בשמירת הקובץ")
            }
            UploadError::Persistence(e) => {
                AppError::Internal(format!("Persistence: {}", e), "שגיאה בהעלאת סיכום")
            }
        }
    }
}

impl From<SummaryError> for AppError {
    fn from(err: SummaryError) -> Self {
        match err {
            SummaryError::NotFound(_) => AppError::NotFound("סיכום לא נמצא".to_string()),
            SummaryError::Forbidden(_) => {
                AppError::Forbidden("אין הרשאה לבצע פעולה זו".to_string())
            }
            SummaryError::CourseNotFound(_) => AppError::NotFound("קורס לא נמצא".to_string()),
            SummaryError::Validation(msg) => AppError::BadRequest(msg),
            SummaryError::Database(e) => AppError::Database(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "שגיאת מסד נתונים".to_string(),
                )
            }
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
            AppError::TooManyRequests(msg) => (StatusCode::TOO_MANY_REQUESTS, msg),
            AppError::Internal(detail, public) => {
                tracing::error!("Internal error: {}", detail);
                (StatusCode::INTERNAL_SERVER_ERROR, public.to_string())
            }
            AppError::Anyhow(e) => {
                tracing::error!("Anyhow error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    GENERIC_ERROR.to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_errors_map_to_statuses() {
        let cases = [
            (
                AppError::from(UploadError::UnsupportedMediaType("text/plain".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::from(UploadError::PayloadTooLarge {
                    size: 11,
                    limit: 10,
                }),
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
            (
                AppError::from(UploadError::CourseNotFound(9)),
                StatusCode::NOT_FOUND,
            ),
            (
                AppError::from(UploadError::Persistence(sea_orm::DbErr::Custom(
                    "boom".into(),
                ))),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn test_summary_errors_map_to_statuses() {
        let cases = [
            (AppError::from(SummaryError::NotFound(1)), StatusCode::NOT_FOUND),
            (AppError::from(SummaryError::Forbidden(1)), StatusCode::FORBIDDEN),
            (
                AppError::from(SummaryError::Validation("x".into())),
                StatusCode::BAD_REQUEST,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
