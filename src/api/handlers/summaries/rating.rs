use crate::AppState;
use crate::api::error::AppError;
use crate::api::middleware::auth::{AuthUser, Session};
use axum::{
    Extension, Json,
    extract::{Path, State},
};

use super::types::*;

#[utoipa::path(
    post,
    path = "/api/summaries/{id}/rate",
    request_body = RateRequest,
    params(
        ("id" = i32, Path, description = "Summary ID")
    ),
    responses(
        (status = 200, description = "Rating saved", body = RateResponse),
        (status = 400, description = "Rating outside 1-5"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Summary not found")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "ratings"
)]
pub async fn rate_summary(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
    Json(req): Json<RateRequest>,
) -> Result<Json<RateResponse>, AppError> {
    let (rating, avg_rating) = state.summaries.rate(id, user.id, req.rating).await?;

    Ok(Json(RateResponse {
        message: "הדירוג נשמר בהצלחה".to_string(),
        rating: rating.into(),
        avg_rating,
    }))
}

#[utoipa::path(
    get,
    path = "/api/summaries/{id}/ratings",
    params(
        ("id" = i32, Path, description = "Summary ID")
    ),
    responses(
        (status = 200, description = "Ratings of the summary", body = RatingsResponse),
        (status = 404, description = "Summary not found")
    ),
    tag = "ratings"
)]
pub async fn get_ratings(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<i32>,
) -> Result<Json<RatingsResponse>, AppError> {
    let viewer = session.user().map(|u| u.id);
    let overview = state.summaries.ratings(id, viewer).await?;
    Ok(Json(overview.into()))
}
