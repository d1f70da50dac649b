use crate::AppState;
use crate::api::error::AppError;
use crate::api::middleware::auth::AuthUser;
use crate::services::summary_service::{SummaryFilter, SummarySort};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};

use super::types::*;

#[utoipa::path(
    get,
    path = "/api/summaries",
    params(ListSummariesQuery),
    responses(
        (status = 200, description = "Summaries matching the filter", body = Vec<SummaryResponse>)
    ),
    tag = "summaries"
)]
pub async fn list_summaries(
    State(state): State<AppState>,
    Query(query): Query<ListSummariesQuery>,
) -> Result<Json<Vec<SummaryResponse>>, AppError> {
    let filter = SummaryFilter {
        course_id: query.course_id,
        institution: query.institution,
        uploaded_by: None,
        search: query.search,
        sort: SummarySort::parse(query.sort_by.as_deref()),
    };

    let summaries = state.summaries.list(filter).await?;
    Ok(Json(summaries.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/api/summaries/my-content",
    responses(
        (status = 200, description = "Summaries uploaded by the caller, newest first", body = Vec<SummaryResponse>),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "summaries"
)]
pub async fn my_summaries(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<SummaryResponse>>, AppError> {
    let filter = SummaryFilter {
        uploaded_by: Some(user.id),
        ..Default::default()
    };

    let summaries = state.summaries.list(filter).await?;
    Ok(Json(summaries.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/api/summaries/{id}",
    params(
        ("id" = i32, Path, description = "Summary ID")
    ),
    responses(
        (status = 200, description = "Summary", body = SummaryResponse),
        (status = 404, description = "Summary not found")
    ),
    tag = "summaries"
)]
pub async fn get_summary(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<SummaryResponse>, AppError> {
    Ok(Json(state.summaries.details(id).await?.into()))
}
