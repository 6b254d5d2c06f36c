use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Movie not found")]
    MovieNotFound,

    #[error("{0}")]
    NotInAnyList(String),

    #[error("{0}")]
    NoOpStatusChange(String),

    #[error("{0}")]
    InvalidRating(String),

    #[error("{0}")]
    NotRateable(String),

    /// Duplicate external id on insert. Recovered inside the resolver by
    /// re-fetching the winning record; must never reach a client.
    #[error("Catalog record with that external id already exists")]
    CatalogConflict,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("External API error: {0}")]
    ExternalApi(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::MovieNotFound => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::NotInAnyList(msg)
            | AppError::NoOpStatusChange(msg)
            | AppError::InvalidRating(msg)
            | AppError::NotRateable(msg)
            | AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::CatalogConflict => {
                tracing::error!("Unrecovered catalog conflict reached the response layer");
                (StatusCode::CONFLICT, self.to_string())
            }
            AppError::Database(_) | AppError::Cache(_) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::ExternalApi(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::HttpClient(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
