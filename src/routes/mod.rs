use axum::{
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::services::{catalog::CatalogService, watchlist::WatchlistService};

pub mod movies;
pub mod user_movies;

/// Shared application state handed to every handler.
pub struct AppState {
    pub catalog: Arc<CatalogService>,
    pub watchlist: Arc<WatchlistService>,
}

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes(state))
}

/// API routes under /api/v1
fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/movies", get(movies::list))
        .route("/movies/search", get(movies::search))
        .route("/movies/search/suggest", get(movies::suggest))
        .route("/user-movies", get(user_movies::get_user_movies))
        .route("/user-movies/status", patch(user_movies::update_status))
        .route("/user-movies/favorite", patch(user_movies::update_favorite))
        .route("/user-movies/user-rate", patch(user_movies::update_rate))
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
