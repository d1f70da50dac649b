use crate::entities::{courses, prelude::*, ratings, stored_files, summaries, users};
use crate::services::error::SummaryError;
use crate::services::placement::{PlacementResolver, StoredFile};
use crate::services::upload_service::SummaryFields;
use chrono::Utc;
use sea_orm::sea_query::{Expr, Func, OnConflict, Query, SimpleExpr, SubQueryStatement};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Who is acting on a summary
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub user_id: i32,
    pub is_admin: bool,
}

impl Actor {
    fn may_modify(&self, summary: &summaries::Model) -> bool {
        self.is_admin || summary.uploaded_by_id == self.user_id
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SummarySort {
    #[default]
    Recent,
    Rating,
    Title,
}

impl SummarySort {
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("rating") => SummarySort::Rating,
            Some("title") => SummarySort::Title,
            _ => SummarySort::Recent,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SummaryFilter {
    pub course_id: Option<i32>,
    /// Institution of the summary's course
    pub institution: Option<String>,
    pub uploaded_by: Option<i32>,
    /// Matched against title, description, course name and course code
    pub search: Option<String>,
    pub sort: SummarySort,
}

/// Public identity of the uploader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uploader {
    pub id: i32,
    pub full_name: String,
}

impl From<users::Model> for Uploader {
    fn from(user: users::Model) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name,
        }
    }
}

/// A summary together with its course, uploader and storage kind
#[derive(Debug, Clone)]
pub struct SummaryDetails {
    pub summary: summaries::Model,
    pub course: Option<courses::Model>,
    pub uploader: Option<Uploader>,
    /// `kind` of the stored file row ("local" or "remote")
    pub storage: Option<String>,
}

/// How a summary's file is served
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadTarget {
    Redirect(String),
    Local {
        path: PathBuf,
        title: String,
        stored_path: String,
        mime_type: String,
    },
}

#[derive(Debug, Clone)]
pub struct RatingsOverview {
    pub ratings: Vec<ratings::Model>,
    pub avg_rating: Option<f64>,
    pub user_rating: Option<i32>,
}

pub struct SummaryService {
    db: DatabaseConnection,
    placement: Arc<PlacementResolver>,
}

impl SummaryService {
    pub fn new(db: DatabaseConnection, placement: Arc<PlacementResolver>) -> Self {
        Self { db, placement }
    }

    pub async fn get(&self, id: i32) -> Result<summaries::Model, SummaryError> {
        Summaries::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(SummaryError::NotFound(id))
    }

    pub async fn details(&self, id: i32) -> Result<SummaryDetails, SummaryError> {
        let row = Summaries::find_by_id(id)
            .find_also_related(Courses)
            .one(&self.db)
            .await?
            .ok_or(SummaryError::NotFound(id))?;

        self.attach(vec![row])
            .await?
            .pop()
            .ok_or(SummaryError::NotFound(id))
    }

    pub async fn list(&self, filter: SummaryFilter) -> Result<Vec<SummaryDetails>, SummaryError> {
        let mut cond = Condition::all();

        if let Some(course_id) = filter.course_id {
            cond = cond.add(summaries::Column::CourseId.eq(course_id));
        }

        if let Some(institution) = filter
            .institution
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            cond = cond.add(courses::Column::Institution.eq(institution));
        }

        if let Some(owner) = filter.uploaded_by {
            cond = cond.add(summaries::Column::UploadedById.eq(owner));
        }

        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", search.to_lowercase());
            let lower_like = |col: SimpleExpr| Expr::expr(Func::lower(col)).like(pattern.as_str());
            cond = cond.add(
                Condition::any()
                    .add(lower_like(Expr::col((Summaries, summaries::Column::Title)).into()))
                    .add(lower_like(Expr::col((Summaries, summaries::Column::Description)).into()))
                    .add(lower_like(Expr::col((Courses, courses::Column::CourseName)).into()))
                    .add(lower_like(Expr::col((Courses, courses::Column::CourseCode)).into())),
            );
        }

        // LEFT JOIN courses, so course columns can be filtered on
        let mut select = Summaries::find().find_also_related(Courses).filter(cond);

        select = match filter.sort {
            SummarySort::Recent => select.order_by_desc(summaries::Column::UploadDate),
            SummarySort::Rating => select.order_by_desc(summaries::Column::AvgRating),
            SummarySort::Title => select.order_by_asc(summaries::Column::Title),
        };

        let rows = select
            .order_by_desc(summaries::Column::Id)
            .all(&self.db)
            .await?;

        self.attach(rows).await
    }

    /// Loads uploaders and stored file kinds for a page of summaries in two
    /// batched queries.
    async fn attach(
        &self,
        rows: Vec<(summaries::Model, Option<courses::Model>)>,
    ) -> Result<Vec<SummaryDetails>, SummaryError> {
        let user_ids: Vec<i32> = rows.iter().map(|(s, _)| s.uploaded_by_id).collect();
        let file_ids: Vec<String> = rows.iter().map(|(s, _)| s.stored_file_id.clone()).collect();

        let uploaders: HashMap<i32, Uploader> = Users::find()
            .filter(users::Column::Id.is_in(user_ids))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|u| (u.id, u.into()))
            .collect();

        let kinds: HashMap<String, String> = StoredFiles::find()
            .filter(stored_files::Column::Id.is_in(file_ids))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|f| (f.id, f.kind))
            .collect();

        Ok(rows
            .into_iter()
            .map(|(summary, course)| SummaryDetails {
                uploader: uploaders.get(&summary.uploaded_by_id).cloned(),
                storage: kinds.get(&summary.stored_file_id).cloned(),
                course,
                summary,
            })
            .collect())
    }

    pub async fn update(
        &self,
        id: i32,
        actor: Actor,
        fields: SummaryFields,
    ) -> Result<SummaryDetails, SummaryError> {
        let summary = self.get(id).await?;
        if !actor.may_modify(&summary) {
            return Err(SummaryError::Forbidden(id));
        }

        if Courses::find_by_id(fields.course_id)
            .one(&self.db)
            .await?
            .is_none()
        {
            return Err(SummaryError::CourseNotFound(fields.course_id));
        }

        let mut active = summary.into_active_model();
        active.title = Set(fields.title);
        active.description = Set(fields.description);
        active.course_id = Set(fields.course_id);

        active.update(&self.db).await?;
        info!("✏️  Summary {} updated by user {}", id, actor.user_id);
        self.details(id).await
    }

    /// Removes the summary rows, then its bytes. A failure to delete the bytes
    /// is logged and does not fail the request.
    pub async fn delete(&self, id: i32, actor: Actor) -> Result<(), SummaryError> {
        let summary = self.get(id).await?;
        if !actor.may_modify(&summary) {
            return Err(SummaryError::Forbidden(id));
        }

        let stored = StoredFiles::find_by_id(summary.stored_file_id.clone())
            .one(&self.db)
            .await?;

        let txn = self.db.begin().await?;
        Ratings::delete_many()
            .filter(ratings::Column::SummaryId.eq(id))
            .exec(&txn)
            .await?;
        Summaries::delete_by_id(id).exec(&txn).await?;
        StoredFiles::delete_by_id(summary.stored_file_id.clone())
            .exec(&txn)
            .await?;
        txn.commit().await?;

        info!("🗑️  Summary {} deleted by user {}", id, actor.user_id);

        match stored.as_ref().and_then(StoredFile::from_model) {
            Some(stored) => {
                if let Err(e) = self.placement.release(&stored).await {
                    warn!(
                        "Failed to delete file {} of summary {}: {}",
                        stored.file_path(),
                        id,
                        e
                    );
                }
            }
            None => warn!("Summary {} had no usable stored file record", id),
        }

        Ok(())
    }

    /// Creates or replaces the user's rating and returns it with the new
    /// average. Both writes are single statements, so concurrent raters
    /// neither collide on the (summary, user) index nor leave a stale average.
    pub async fn rate(
        &self,
        id: i32,
        user_id: i32,
        value: i32,
    ) -> Result<(ratings::Model, Option<f64>), SummaryError> {
        if !(1..=5).contains(&value) {
            return Err(SummaryError::Validation(
                "דירוג חייב להיות בין 1 ל-5".to_string(),
            ));
        }

        self.get(id).await?;

        Ratings::insert(ratings::ActiveModel {
            summary_id: Set(id),
            user_id: Set(user_id),
            rating: Set(value),
            date: Set(Utc::now()),
            ..Default::default()
        })
        .on_conflict(
            OnConflict::columns([ratings::Column::SummaryId, ratings::Column::UserId])
                .update_columns([ratings::Column::Rating, ratings::Column::Date])
                .to_owned(),
        )
        .exec_without_returning(&self.db)
        .await?;

        refresh_average(&self.db, id).await?;

        let rating = Ratings::find()
            .filter(ratings::Column::SummaryId.eq(id))
            .filter(ratings::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?
            .ok_or(SummaryError::NotFound(id))?;
        let avg = self.get(id).await?.avg_rating;

        Ok((rating, avg))
    }

    pub async fn ratings(
        &self,
        id: i32,
        viewer: Option<i32>,
    ) -> Result<RatingsOverview, SummaryError> {
        let summary = self.get(id).await?;

        let ratings = Ratings::find()
            .filter(ratings::Column::SummaryId.eq(id))
            .order_by_desc(ratings::Column::Date)
            .all(&self.db)
            .await?;

        let user_rating = viewer.and_then(|user_id| {
            ratings
                .iter()
                .find(|r| r.user_id == user_id)
                .map(|r| r.rating)
        });

        Ok(RatingsOverview {
            avg_rating: summary.avg_rating,
            user_rating,
            ratings,
        })
    }

    pub async fn download_target(&self, id: i32) -> Result<DownloadTarget, SummaryError> {
        let summary = self.get(id).await?;
        let stored = StoredFiles::find_by_id(summary.stored_file_id.clone())
            .one(&self.db)
            .await?;

        let mime_type = stored
            .as_ref()
            .map(|s| s.mime_type.clone())
            .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string());

        match stored.as_ref().and_then(StoredFile::from_model) {
            Some(StoredFile::Remote { url, .. }) => Ok(DownloadTarget::Redirect(url)),
            Some(StoredFile::Local { path }) => {
                let resolved = self
                    .placement
                    .local()
                    .resolve(&path)
                    .ok_or(SummaryError::NotFound(id))?;
                Ok(DownloadTarget::Local {
                    path: resolved,
                    title: summary.title,
                    stored_path: path,
                    mime_type,
                })
            }
            None => {
                warn!("Summary {} has no stored file record", id);
                Err(SummaryError::NotFound(id))
            }
        }
    }
}

/// `UPDATE summaries SET avg_rating = (SELECT AVG(rating) ...)`; NULL when
/// the summary has no ratings.
async fn refresh_average<C: ConnectionTrait>(db: &C, summary_id: i32) -> Result<(), DbErr> {
    let average = Query::select()
        .expr(Func::avg(Expr::col((Ratings, ratings::Column::Rating))))
        .from(Ratings)
        .and_where(Expr::col((Ratings, ratings::Column::SummaryId)).eq(summary_id))
        .to_owned();

    Summaries::update_many()
        .col_expr(
            summaries::Column::AvgRating,
            SimpleExpr::SubQuery(None, Box::new(SubQueryStatement::SelectStatement(average))),
        )
        .filter(summaries::Column::Id.eq(summary_id))
        .exec(db)
        .await?;

    Ok(())
}
