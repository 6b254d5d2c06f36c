use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::CurrentUser;

/// HTTP header carrying the gateway-verified user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Extracts the authenticated caller from the `x-user-id` header.
///
/// Identity verification itself happens upstream; this service only
/// consumes the already-resolved identity and rejects requests that
/// arrive without one.
///
/// ```ignore
/// async fn my_handler(user: CurrentUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = %user.user_id, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing x-user-id header".into()))?;

        let user_id = Uuid::parse_str(header)
            .map_err(|_| AppError::Unauthorized("Malformed x-user-id header".into()))?;

        Ok(CurrentUser { user_id })
    }
}
