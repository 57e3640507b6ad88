use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/session", get(handlers::get_session))
        .route("/api/refresh", post(handlers::refresh))
        .route("/api/chart", get(handlers::get_chart))
        .with_state(state)
}
