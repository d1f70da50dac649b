pub mod api;
pub mod config;
pub mod entities;
pub mod infrastructure;
pub mod services;
pub mod utils;

use crate::api::handlers::{health, summaries};
use crate::api::middleware::auth::{require_auth, session_middleware};
use crate::config::AppConfig;
use crate::services::placement::{PlacementResolver, StorageBackend};
use crate::services::rate_limit::RateLimiter;
use crate::services::recorder::{DbSummaryRecorder, SummaryRecorder};
use crate::services::staging::StagingArea;
use crate::services::summary_service::SummaryService;
use crate::services::upload_service::UploadService;
use axum::{
    Router,
    handler::Handler,
    http::HeaderValue,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::health::health_check,
        api::handlers::summaries::upload::upload_summary,
        api::handlers::summaries::list::list_summaries,
        api::handlers::summaries::list::my_summaries,
        api::handlers::summaries::list::get_summary,
        api::handlers::summaries::manage::update_summary,
        api::handlers::summaries::manage::delete_summary,
        api::handlers::summaries::download::download_summary,
        api::handlers::summaries::rating::rate_summary,
        api::handlers::summaries::rating::get_ratings,
    ),
    components(
        schemas(
            api::handlers::health::HealthResponse,
            api::handlers::summaries::SummaryResponse,
            api::handlers::summaries::CourseBrief,
            api::handlers::summaries::UploaderBrief,
            api::handlers::summaries::SummaryMessageResponse,
            api::handlers::summaries::MessageResponse,
            api::handlers::summaries::UpdateSummaryRequest,
            api::handlers::summaries::RateRequest,
            api::handlers::summaries::RateResponse,
            api::handlers::summaries::RatingResponse,
            api::handlers::summaries::RatingsResponse,
        )
    ),
    tags(
        (name = "summaries", description = "Summary upload, download and management"),
        (name = "ratings", description = "Summary ratings"),
        (name = "system", description = "Health")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: AppConfig,
    pub uploads: Arc<UploadService>,
    pub summaries: Arc<SummaryService>,
    pub placement: Arc<PlacementResolver>,
    pub upload_limiter: Arc<RateLimiter>,
    pub update_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(
        db: DatabaseConnection,
        config: AppConfig,
        staging: StagingArea,
        placement: PlacementResolver,
        recorder: Arc<dyn SummaryRecorder>,
    ) -> Self {
        let placement = Arc::new(placement);

        Self {
            uploads: Arc::new(UploadService::new(
                db.clone(),
                staging,
                placement.clone(),
                recorder,
            )),
            summaries: Arc::new(SummaryService::new(db.clone(), placement.clone())),
            upload_limiter: Arc::new(RateLimiter::per_hour(config.uploads_per_hour)),
            update_limiter: Arc::new(RateLimiter::per_hour(config.updates_per_hour)),
            placement,
            config,
            db,
        }
    }

    /// Standard wiring: database backed recorder, directories from config.
    pub async fn build(
        db: DatabaseConnection,
        config: AppConfig,
        backend: StorageBackend,
    ) -> anyhow::Result<Self> {
        let staging = StagingArea::open(&config.staging_dir, config.max_file_size as u64).await?;
        let placement = infrastructure::storage::setup_placement(&config, backend).await?;
        let recorder = Arc::new(DbSummaryRecorder::new(db.clone()));

        Ok(Self::new(db, config, staging, placement, recorder))
    }
}

pub fn create_app(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health::health_check))
        .route(
            "/summaries",
            get(summaries::list_summaries)
                .post(summaries::upload_summary.layer(from_fn(require_auth))),
        )
        .route(
            "/summaries/my-content",
            get(summaries::my_summaries.layer(from_fn(require_auth))),
        )
        .route(
            "/summaries/:id",
            get(summaries::get_summary)
                .put(summaries::update_summary.layer(from_fn(require_auth)))
                .delete(summaries::delete_summary.layer(from_fn(require_auth))),
        )
        .route(
            "/summaries/:id/download",
            get(summaries::download_summary),
        )
        .route(
            "/summaries/:id/rate",
            post(summaries::rate_summary).layer(from_fn(require_auth)),
        )
        .route("/summaries/:id/ratings", get(summaries::get_ratings))
        .layer(from_fn_with_state(state.clone(), session_middleware));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/api", api_routes)
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .layer(cors_layer(&state.config.allowed_origins))
        .layer(axum::extract::DefaultBodyLimit::max(
            state.config.max_file_size + 1024 * 1024, // multipart overhead
        ))
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origin = if allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(
            allowed_origins
                .iter()
                .filter_map(|o| HeaderValue::from_str(o).ok()),
        )
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any)
}
