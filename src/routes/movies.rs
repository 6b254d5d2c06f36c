use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{error::AppResult, models::Movie, routes::AppState};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    q: String,
}

/// Handler for the full catalog listing
pub async fn list(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<Movie>>> {
    let movies = state.catalog.list_all().await?;
    Ok(Json(movies))
}

/// Handler for hybrid catalog search
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<Vec<Movie>>> {
    let movies = state.catalog.search(&params.q).await?;
    Ok(Json(movies))
}

/// Handler for title suggestions
pub async fn suggest(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<Vec<String>>> {
    let titles = state.catalog.suggest(&params.q).await?;
    Ok(Json(titles))
}
