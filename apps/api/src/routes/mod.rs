pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};
use tower_http::services::ServeDir;

/// Resume uploads can exceed axum's 2 MB default body limit.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

use crate::assessment::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    // Locally stored artifacts are served straight from the upload dir so
    // local-provider URLs resolve; harmless when a remote provider is active.
    let files = ServeDir::new(state.config.upload_dir.clone());

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/sessions", post(handlers::handle_start_session))
        .route("/api/v1/sessions/:id", get(handlers::handle_get_status))
        .route(
            "/api/v1/sessions/:id/mcq/generate",
            post(handlers::handle_generate_mcq),
        )
        .route(
            "/api/v1/sessions/:id/mcq/submit",
            post(handlers::handle_submit_mcq),
        )
        .route(
            "/api/v1/sessions/:id/code/generate",
            post(handlers::handle_generate_code),
        )
        .route(
            "/api/v1/sessions/:id/code/draft",
            patch(handlers::handle_save_code_draft),
        )
        .route(
            "/api/v1/sessions/:id/code/submit",
            post(handlers::handle_submit_code),
        )
        .route(
            "/api/v1/sessions/:id/voice/link",
            post(handlers::handle_link_voice),
        )
        .route(
            "/api/v1/sessions/:id/complete",
            post(handlers::handle_complete),
        )
        .route(
            "/api/v1/sessions/:id/resume/url",
            get(handlers::handle_resume_url),
        )
        .nest_service("/files", files)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}
