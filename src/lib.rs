pub mod api;
pub mod config;
pub mod core;
pub mod infra;
pub mod models;

#[cfg(test)]
mod testing;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::chat::{chat_query, health};

pub mod ax_state {
    use crate::core::pipeline::QueryRouter;

    pub struct AppState {
        pub router: QueryRouter,
    }
}

pub fn create_router(state: Arc<ax_state::AppState>) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/api/chat", post(chat_query))
        .route("/api/health", get(health))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
