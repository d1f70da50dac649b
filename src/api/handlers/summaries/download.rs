use crate::AppState;
use crate::api::error::AppError;
use crate::services::summary_service::DownloadTarget;
use crate::utils::validation::content_disposition;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::Response,
};
use tokio_util::io::ReaderStream;

#[utoipa::path(
    get,
    path = "/api/summaries/{id}/download",
    params(
        ("id" = i32, Path, description = "Summary ID")
    ),
    responses(
        (status = 200, description = "File stream for locally stored summaries"),
        (status = 302, description = "Redirect to the remote copy"),
        (status = 404, description = "Summary or file not found")
    ),
    tag = "summaries"
)]
pub async fn download_summary(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    let response = match state.summaries.download_target(id).await? {
        DownloadTarget::Redirect(url) => {
            tracing::info!("📎 Redirecting download of summary {} to remote copy", id);
            Response::builder()
                .status(StatusCode::FOUND)
                .header(header::LOCATION, url)
                .body(Body::empty())
        }
        DownloadTarget::Local {
            path,
            title,
            stored_path,
            mime_type,
        } => {
            let file = tokio::fs::File::open(&path).await.map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    tracing::warn!("File of summary {} missing at {}", id, path.display());
                    AppError::NotFound("קובץ לא נמצא".to_string())
                } else {
                    AppError::Internal(format!("Open {}: {}", path.display(), e), "שגיאה בהורדת הקובץ")
                }
            })?;
            let size = file
                .metadata()
                .await
                .map_err(|e| AppError::Internal(format!("Stat {}: {}", path.display(), e), "שגיאה בהורדת הקובץ"))?
                .len();

            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, mime_type)
                .header(header::CONTENT_LENGTH, size)
                .header(
                    header::CONTENT_DISPOSITION,
                    content_disposition(&title, &stored_path),
                )
                .body(Body::from_stream(ReaderStream::new(file)))
        }
    };

    response.map_err(|e| AppError::Internal(format!("Build response: {}", e), "שגיאה בהורדת הקובץ"))
}
