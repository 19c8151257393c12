mod jobs;
mod recommendations;
mod ws;

use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the full router (spec §6 External Interfaces).
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(Duration::from_secs(3600));

    Router::new()
        .route("/jobs", post(jobs::create_job).get(jobs::list_jobs))
        .route("/jobs/:id", get(jobs::get_job))
        .route("/jobs/:id/cancel", post(jobs::cancel_job))
        .route("/recommendations", get(recommendations::get_recommendations))
        .route("/ws/progress", get(ws::ws_progress))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
