pub mod health;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::analysis::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/resumes", post(handlers::handle_analyze))
        .route("/api/v1/resumes", get(handlers::handle_list))
        .route("/api/v1/resumes/wipe", post(handlers::handle_wipe))
        .route("/api/v1/resumes/:id", get(handlers::handle_get))
        .route("/api/v1/resumes/:id", delete(handlers::handle_delete))
        .with_state(state)
}
