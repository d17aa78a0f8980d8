use axum::{
    Router,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::tools::Toolbox;

pub mod handlers;
pub mod models;

pub fn create_router(toolbox: Arc<Toolbox>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::root_handler))
        .route("/health", get(handlers::health_handler))
        // Tool surface
        .route("/tools/web_search", post(handlers::web_search_handler))
        .route("/tools/web_crawl", post(handlers::web_crawl_handler))
        .route(
            "/tools/extract_content",
            post(handlers::extract_content_handler),
        )
        .route(
            "/tools/analyze_search_results",
            post(handlers::analyze_handler),
        )
        // Crawl service
        .route("/crawl", post(handlers::crawl_handler))
        .route("/crawl/batch", post(handlers::batch_crawl_handler))
        .route("/result/:job_id", get(handlers::result_handler))
        .route("/cache/:job_id", delete(handlers::clear_cache_handler))
        .with_state(toolbox)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
