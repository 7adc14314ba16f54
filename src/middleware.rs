use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::error::ApiError;
use crate::model::User;
use crate::state::AppState;

/// Identity of the caller, attached to the request by [`require_session`]
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub token: String,
}

/// Extracts the token of an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Middleware that resolves the session token into a [`CurrentUser`]
///
/// Requests without a valid session are rejected with 401 before reaching
/// the handler.
pub async fn require_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = bearer_token(&headers) else {
        return Err(ApiError::Unauthorized);
    };

    let Some(session) = state.store.get_session(token)? else {
        warn!("Request with unknown session token rejected");
        return Err(ApiError::Unauthorized);
    };

    // A session can outlive its user only through a hand-edited import
    let Some(user) = state.store.get_user(&session.user_id)? else {
        return Err(ApiError::Unauthorized);
    };

    request.extensions_mut().insert(CurrentUser {
        user,
        token: session.token,
    });

    Ok(next.run(request).await)
}
