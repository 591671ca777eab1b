pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::documents::handlers::{handle_parse_resume, MAX_UPLOAD_BYTES};
use crate::outreach::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/agent-status", get(handlers::handle_agent_status))
        .route(
            "/api/parse-resume",
            post(handle_parse_resume).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        // Outreach jobs
        .route("/api/generate", post(handlers::handle_create_job))
        .route("/api/stream/:job_id", get(handlers::handle_stream))
        .route("/api/regenerate/:job_id", post(handlers::handle_regenerate))
        .route("/api/fetch-jd", post(handlers::handle_fetch_jd))
        .with_state(state)
}
