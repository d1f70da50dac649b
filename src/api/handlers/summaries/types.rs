use crate::entities::{courses, ratings};
use crate::services::summary_service::{RatingsOverview, SummaryDetails, Uploader};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseBrief {
    pub course_code: String,
    pub course_name: String,
    pub institution: String,
}

impl From<courses::Model> for CourseBrief {
    fn from(course: courses::Model) -> Self {
        Self {
            course_code: course.course_code,
            course_name: course.course_name,
            institution: course.institution,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploaderBrief {
    pub id: i32,
    pub full_name: String,
}

impl From<Uploader> for UploaderBrief {
    fn from(uploader: Uploader) -> Self {
        Self {
            id: uploader.id,
            full_name: uploader.full_name,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    /// `uploads/<name>` for local files or the remote URL
    pub file_path: String,
    /// "local" or "remote"
    pub storage: Option<String>,
    pub course_id: i32,
    pub course: Option<CourseBrief>,
    pub uploaded_by_id: i32,
    pub uploaded_by: Option<UploaderBrief>,
    pub avg_rating: Option<f64>,
    pub upload_date: DateTime<Utc>,
}

impl From<SummaryDetails> for SummaryResponse {
    fn from(details: SummaryDetails) -> Self {
        let summary = details.summary;
        Self {
            id: summary.id,
            title: summary.title,
            description: summary.description,
            file_path: summary.file_path,
            storage: details.storage,
            course_id: summary.course_id,
            course: details.course.map(Into::into),
            uploaded_by_id: summary.uploaded_by_id,
            uploaded_by: details.uploader.map(Into::into),
            avg_rating: summary.avg_rating,
            upload_date: summary.upload_date,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SummaryMessageResponse {
    pub message: String,
    pub summary: SummaryResponse,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListSummariesQuery {
    pub course_id: Option<i32>,
    pub institution: Option<String>,
    /// Matches title, description, course name or course code
    pub search: Option<String>,
    /// recent (default), rating or title
    pub sort_by: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSummaryRequest {
    pub title: String,
    pub description: Option<String>,
    pub course_id: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RateRequest {
    pub rating: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RatingResponse {
    pub id: i32,
    pub summary_id: i32,
    pub user_id: i32,
    pub rating: i32,
    pub date: DateTime<Utc>,
}

impl From<ratings::Model> for RatingResponse {
    fn from(rating: ratings::Model) -> Self {
        Self {
            id: rating.id,
            summary_id: rating.summary_id,
            user_id: rating.user_id,
            rating: rating.rating,
            date: rating.date,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RateResponse {
    pub message: String,
    pub rating: RatingResponse,
    pub avg_rating: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RatingsResponse {
    pub ratings: Vec<RatingResponse>,
    pub avg_rating: Option<f64>,
    pub user_rating: Option<i32>,
    pub total_ratings: usize,
}

impl From<RatingsOverview> for RatingsResponse {
    fn from(overview: RatingsOverview) -> Self {
        Self {
            total_ratings: overview.ratings.len(),
            ratings: overview.ratings.into_iter().map(Into::into).collect(),
            avg_rating: overview.avg_rating,
            user_rating: overview.user_rating,
        }
    }
}
