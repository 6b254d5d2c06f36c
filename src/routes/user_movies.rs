use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{CurrentUser, UserMovieWithMovie, WatchStatus},
    routes::AppState,
};

#[derive(Debug, Deserialize)]
pub struct UserMoviesQuery {
    status: Option<WatchStatus>,
    favorite: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeStatusRequest {
    title: String,
    status: Option<WatchStatus>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeFavoriteRequest {
    title: String,
    favorite: bool,
}

#[derive(Debug, Deserialize)]
pub struct ChangeRateRequest {
    title: String,
    rate: f64,
}

fn require_title(title: &str) -> AppResult<()> {
    if title.trim().is_empty() {
        return Err(AppError::InvalidInput("Title cannot be blank".to_string()));
    }
    Ok(())
}

/// Handler for the user's filtered movie listing
pub async fn get_user_movies(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Query(params): Query<UserMoviesQuery>,
) -> AppResult<Json<Vec<UserMovieWithMovie>>> {
    let movies = state
        .watchlist
        .get_user_movies(&user, params.status, params.favorite)
        .await?;
    Ok(Json(movies))
}

/// Handler for status changes; a null status removes the movie from all lists
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(request): Json<ChangeStatusRequest>,
) -> AppResult<StatusCode> {
    require_title(&request.title)?;

    tracing::info!(
        user_id = %user.user_id,
        title = %request.title,
        status = ?request.status,
        "Processing status change"
    );

    state
        .watchlist
        .update_status(&user, &request.title, request.status)
        .await?;
    Ok(StatusCode::OK)
}

/// Handler for favorite flag changes
pub async fn update_favorite(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(request): Json<ChangeFavoriteRequest>,
) -> AppResult<StatusCode> {
    require_title(&request.title)?;

    state
        .watchlist
        .update_favorite(&user, &request.title, request.favorite)
        .await?;
    Ok(StatusCode::OK)
}

/// Handler for personal rating changes
pub async fn update_rate(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(request): Json<ChangeRateRequest>,
) -> AppResult<StatusCode> {
    require_title(&request.title)?;

    state
        .watchlist
        .update_rate(&user, &request.title, request.rate)
        .await?;
    Ok(StatusCode::OK)
}
