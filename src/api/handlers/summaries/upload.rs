use crate::AppState;
use crate::api::error::AppError;
use crate::api::middleware::auth::AuthUser;
use crate::services::staging::StagedFile;
use crate::services::summary_service::{SummaryDetails, Uploader};
use crate::services::upload_service::SummaryFields;
use axum::{
    Extension, Json,
    extract::{Multipart, State, multipart::MultipartError},
    http::StatusCode,
};
use futures::TryStreamExt;
use tokio_util::io::StreamReader;

use super::types::*;

#[utoipa::path(
    post,
    path = "/api/summaries",
    request_body(content = Multipart, description = "Fields: file (PDF or DOCX), title, description, courseId"),
    responses(
        (status = 201, description = "Summary uploaded", body = SummaryMessageResponse),
        (status = 400, description = "Invalid fields or file type"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Course not found"),
        (status = 413, description = "File too large"),
        (status = 429, description = "Too many uploads")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "summaries"
)]
pub async fn upload_summary(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<SummaryMessageResponse>), AppError> {
    if !state.upload_limiter.check(&user.id.to_string()) {
        return Err(AppError::TooManyRequests(
            "יותר מדי העלאות. נסה שוב מאוחר יותר.".to_string(),
        ));
    }

    let result: Result<(StatusCode, Json<SummaryMessageResponse>), AppError> = async {
        let mut title: Option<String> = None;
        let mut description: Option<String> = None;
        let mut course_id: Option<String> = None;
        let mut staged: Option<StagedFile> = None;

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or_default().to_string();

            match name.as_str() {
                "file" => {
                    if staged.is_some() {
                        return Err(AppError::BadRequest("ניתן להעלות קובץ אחד בלבד".to_string()));
                    }
                    let original_filename = field.file_name().unwrap_or("summary").to_string();
                    let content_type = field.content_type().map(|s| s.to_string());

                    let reader = StreamReader::new(field.map_err(std::io::Error::other));
                    staged = Some(
                        state
                            .uploads
                            .staging()
                            .stage(&original_filename, content_type.as_deref(), reader)
                            .await?,
                    );
                }
                "title" => title = Some(field.text().await.map_err(multipart_error)?),
                "description" => description = Some(field.text().await.map_err(multipart_error)?),
                "courseId" => course_id = Some(field.text().await.map_err(multipart_error)?),
                other => tracing::debug!("Ignoring multipart field '{}'", other),
            }
        }

        let staged = staged.ok_or_else(|| {
            AppError::BadRequest("יש להעלות קובץ PDF או DOCX".to_string())
        })?;

        let fields =
            SummaryFields::parse(title.as_deref(), description.as_deref(), course_id.as_deref())
                .map_err(AppError::BadRequest)?;

        let outcome = state.uploads.complete(fields, user.id, staged).await?;

        Ok((
            StatusCode::CREATED,
            Json(SummaryMessageResponse {
                message: "הסיכום הועלה בהצלחה".to_string(),
                summary: SummaryDetails {
                    storage: Some(outcome.stored.kind().to_string()),
                    course: Some(outcome.course),
                    uploader: Some(Uploader {
                        id: user.id,
                        full_name: user.full_name.clone(),
                    }),
                    summary: outcome.summary,
                }
                .into(),
            }),
        ))
    }
    .await;

    match result {
        Ok(res) => Ok(res),
        Err(e) => {
            // Drain what the client is still sending so it sees the error response
            tracing::warn!("Upload failed early: {}. Consuming remaining stream...", e);
            while let Ok(Some(mut field)) = multipart.next_field().await {
                while let Ok(Some(_)) = field.chunk().await {}
            }
            Err(e)
        }
    }
}

fn multipart_error(e: MultipartError) -> AppError {
    let err_msg = e.to_string();
    if err_msg.contains("length limit exceeded") {
        AppError::PayloadTooLarge("הקובץ גדול מדי".to_string())
    } else {
        AppError::BadRequest(err_msg)
    }
}
