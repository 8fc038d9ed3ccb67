//! lumen-catalog library - luminaire catalog service
//!
//! Serves the catalog, similar-item suggestions, designers, the timeline,
//! uploads and image search over HTTP.

use axum::Router;
use lumen_common::config::ServiceConfig;
use sqlx::SqlitePool;
use std::sync::Arc;

pub mod api;
pub mod db;
pub mod error;
pub mod export;
pub mod import;
pub mod pagination;
pub mod periods;
pub mod services;

use services::ImageSearchClient;

/// Multipart slack on top of the per-file limits
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Images accepted in one upload request
const MAX_IMAGES_PER_REQUEST: usize = 20;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    pub config: Arc<ServiceConfig>,
    /// `None` when no image search URL is configured
    pub image_search: Option<ImageSearchClient>,
}

impl AppState {
    /// Create new application state
    ///
    /// An unusable image search URL disables image search instead of
    /// failing startup.
    pub fn new(db: SqlitePool, config: ServiceConfig) -> Self {
        let image_search = config.image_search_url.as_deref().and_then(|url| {
            ImageSearchClient::new(url)
                .map_err(|e| tracing::warn!("Image search disabled: {}", e))
                .ok()
        });

        Self {
            db,
            config: Arc::new(config),
            image_search,
        }
    }
}

/// Build application router
///
/// Every route passes through [`api::resolve_user`]; handlers declare the
/// role they need through their extractors.
pub fn build_router(state: AppState) -> Router {
    use axum::extract::DefaultBodyLimit;
    use axum::middleware;
    use axum::routing::{get, post};
    use tower_http::cors::CorsLayer;
    use tower_http::services::ServeDir;
    use tower_http::trace::TraceLayer;

    let uploads_dir = state.config.folders().uploads_path();

    let catalog = Router::new()
        .route(
            "/api/luminaires",
            get(api::list_luminaires).post(api::create_luminaire),
        )
        .route(
            "/api/luminaires/:id",
            get(api::get_luminaire)
                .put(api::update_luminaire)
                .delete(api::delete_luminaire),
        )
        .route("/api/luminaires/similar/:id", get(api::similar_luminaires))
        .route(
            "/api/designers",
            get(api::list_designers).post(api::create_designer),
        )
        .route(
            "/api/designers/:name",
            get(api::get_designer).put(api::upsert_designer),
        )
        .route("/api/timeline", get(api::get_timeline))
        .route(
            "/api/timeline/descriptions",
            get(api::get_descriptions).post(api::set_description),
        )
        .route("/api/welcome-video", get(api::get_welcome_video))
        .route("/api/export/csv", get(api::export_csv));

    let accounts = Router::new()
        .route("/api/me", get(api::get_me))
        .route("/api/users", post(api::create_user))
        .route("/api/favorites", get(api::list_favorites))
        .route("/api/favorites/:id", post(api::toggle_favorite));

    let uploads = Router::new()
        .route("/api/upload/csv", post(api::upload_csv))
        .route(
            "/api/upload/images",
            post(api::upload_images).layer(DefaultBodyLimit::max(
                api::uploads::MAX_IMAGE_BYTES * MAX_IMAGES_PER_REQUEST + MULTIPART_OVERHEAD,
            )),
        )
        .route(
            "/api/upload/video",
            post(api::upload_video).layer(DefaultBodyLimit::max(
                api::uploads::MAX_VIDEO_BYTES + MULTIPART_OVERHEAD,
            )),
        )
        .route(
            "/api/search/image",
            post(api::search_by_image).layer(DefaultBodyLimit::max(
                api::uploads::MAX_IMAGE_BYTES + MULTIPART_OVERHEAD,
            )),
        );

    Router::new()
        .merge(catalog)
        .merge(accounts)
        .merge(uploads)
        .merge(api::health_routes())
        .nest_service("/uploads", ServeDir::new(uploads_dir))
        .layer(middleware::from_fn_with_state(state.clone(), api::resolve_user))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
