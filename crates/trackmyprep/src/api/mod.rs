//! HTTP surface: router, shared state and handlers.

use axum::extract::DefaultBodyLimit;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde_json::{json, Value};

mod applications;
mod error;
mod middleware;
mod profile;
mod state;
mod uploads;

pub use error::ApiError;
pub use state::{ApiSettings, AppState};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz_handler))
        .route(
            "/applications",
            get(applications::list_applications).post(applications::create_application),
        )
        .route("/applications/stats", get(applications::application_stats))
        .route(
            "/applications/:id",
            put(applications::update_application).delete(applications::delete_application),
        )
        .route("/profile", get(profile::get_profile))
        .route("/uploads/:filename", get(uploads::serve_upload))
        .layer(DefaultBodyLimit::max(state.settings.max_upload_bytes))
        .layer(from_fn_with_state(state.clone(), middleware::cors_middleware))
        .layer(from_fn(middleware::request_tracing_middleware))
        .with_state(state)
}

async fn healthz_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
