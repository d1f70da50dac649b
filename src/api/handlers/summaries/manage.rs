use crate::AppState;
use crate::api::error::AppError;
use crate::api::middleware::auth::AuthUser;
use crate::services::upload_service::SummaryFields;
use axum::{
    Extension, Json,
    extract::{Path, State},
};

use super::types::*;

#[utoipa::path(
    put,
    path = "/api/summaries/{id}",
    request_body = UpdateSummaryRequest,
    params(
        ("id" = i32, Path, description = "Summary ID")
    ),
    responses(
        (status = 200, description = "Summary updated", body = SummaryMessageResponse),
        (status = 400, description = "Invalid fields"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Summary or course not found"),
        (status = 429, description = "Too many updates")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "summaries"
)]
pub async fn update_summary(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
    Json(req): Json<UpdateSummaryRequest>,
) -> Result<Json<SummaryMessageResponse>, AppError> {
    if !state.update_limiter.check(&user.id.to_string()) {
        return Err(AppError::TooManyRequests(
            "יותר מדי עדכונים. נסה שוב מאוחר יותר.".to_string(),
        ));
    }

    let fields = SummaryFields::new(&req.title, req.description.as_deref(), req.course_id)
        .map_err(AppError::BadRequest)?;

    let updated = state.summaries.update(id, user.actor(), fields).await?;

    Ok(Json(SummaryMessageResponse {
        message: "הסיכום עודכן בהצלחה".to_string(),
        summary: updated.into(),
    }))
}

#[utoipa::path(
    delete,
    path = "/api/summaries/{id}",
    params(
        ("id" = i32, Path, description = "Summary ID")
    ),
    responses(
        (status = 200, description = "Summary deleted", body = MessageResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Summary not found")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "summaries"
)]
pub async fn delete_summary(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
) -> Result<Json<MessageResponse>, AppError> {
    state.summaries.delete(id, user.actor()).await?;

    Ok(Json(MessageResponse {
        message: "הסיכום נמחק בהצלחה".to_string(),
    }))
}
