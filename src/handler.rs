//! HTTP request handlers
//!
//! This module implements:
//! - Signup, login and logout with session tokens
//! - The dashboard (analytics) and profile views
//! - Creating, listing and deactivating short links
//! - Storing and listing QR codes, counting downloads
//! - Redirecting short codes to their original destinations

use axum::{
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Extension, Json,
};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::analytics::{DEFAULT_DAYS, DEFAULT_RECENT_LIMIT, MAX_DAYS};
use crate::error::{ApiError, StoreError};
use crate::middleware::CurrentUser;
use crate::model::{
    AnalyticsParams, AuthResponse, CreateLinkRequest, CreateQrRequest, LoginRequest, NewLink,
    NewQrCode, NewUser, SignupRequest, UserProfile,
};
use crate::shortcode::is_valid_alias;
use crate::state::AppState;

/// Longest recent-activity feed the dashboard will return
pub const MAX_RECENT_LIMIT: usize = 100;

pub const DEFAULT_QR_SIZE: u32 = 300;
pub const MAX_QR_SIZE: u32 = 2000;
pub const DEFAULT_QR_FORMAT: &str = "png";

/// Attempts at finding a free random short code
const CODE_ATTEMPTS: usize = 5;

/// Runs a store call that hashes passwords off the async worker threads
async fn blocking<T, F>(task: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?
        .map_err(ApiError::from)
}

/// Accepts only URLs that can later be sent back as a `Location` header
fn validate_url(url: &str) -> Result<String, ApiError> {
    let url = url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ApiError::BadRequest(
            "URL must start with http:// or https://".to_string(),
        ));
    }

    if url.chars().any(|c| c.is_control() || c.is_whitespace())
        || HeaderValue::from_str(url).is_err()
    {
        return Err(ApiError::BadRequest(
            "URL contains characters that are not allowed".to_string(),
        ));
    }

    Ok(url.to_string())
}

/// Creates an account and opens a session for it
///
/// # Response
///
/// - **201 Created** - `{ "user": {...}, "token": "..." }`
/// - **400 Bad Request** - Missing email, password or name
/// - **409 Conflict** - Email already registered
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = payload.email.trim().to_string();
    let name = payload.name.trim().to_string();

    if !email.contains('@') {
        return Err(ApiError::BadRequest("A valid email is required".to_string()));
    }
    if payload.password.is_empty() {
        return Err(ApiError::BadRequest("Password is required".to_string()));
    }
    if name.is_empty() {
        return Err(ApiError::BadRequest("Name is required".to_string()));
    }

    let store = state.store.clone();
    let new_user = NewUser {
        email,
        password: payload.password,
        name,
    };
    let (user, session) = blocking(move || {
        let user = store.create_user(new_user)?;
        let session = store.create_session(&user.id)?;
        Ok((user, session))
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: UserProfile::from(user),
            token: session.token,
        }),
    ))
}

/// Verifies credentials and opens a session
///
/// # Response
///
/// - **200 OK** - `{ "user": {...}, "token": "..." }`
/// - **401 Unauthorized** - Wrong password
/// - **404 Not Found** - Unknown email
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let store = state.store.clone();
    let email = payload.email.trim().to_string();
    let (user, session) = blocking(move || {
        let user = store.authenticate_user(&email, &payload.password)?;
        let session = store.create_session(&user.id)?;
        Ok((user, session))
    })
    .await?;

    Ok(Json(AuthResponse {
        user: UserProfile::from(user),
        token: session.token,
    }))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    state.store.delete_session(&current.token)?;
    info!(user_id = %current.user.id, "User logged out");

    Ok(Json(json!({ "message": "Logged out" })))
}

pub async fn me(Extension(current): Extension<CurrentUser>) -> Json<UserProfile> {
    Json(UserProfile::from(current.user))
}

/// Analytics view of the caller's links and QR codes
///
/// # Query Parameters
///
/// - `days` (optional) - Histogram length, 1 to 365 (default: 7)
/// - `limit` (optional) - Recent-activity length, 1 to 100 (default: 10)
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(params): Query<AnalyticsParams>,
) -> Result<impl IntoResponse, ApiError> {
    let days = params.days.unwrap_or(DEFAULT_DAYS).clamp(1, MAX_DAYS);
    let limit = params
        .limit
        .unwrap_or(DEFAULT_RECENT_LIMIT)
        .clamp(1, MAX_RECENT_LIMIT);

    let analytics = state
        .store
        .get_user_analytics(&current.user.id, days, limit)?;

    Ok(Json(analytics))
}

/// Shortens a URL for the caller
///
/// Uses `custom_alias` as the short code when given, otherwise asks the
/// short-code generator for a free one.
///
/// # Response
///
/// - **201 Created** - The stored link
/// - **400 Bad Request** - Invalid URL or alias
/// - **409 Conflict** - Alias already taken
pub async fn create_link(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<CreateLinkRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let long_url = validate_url(&payload.url)?;

    // Empty aliases count as "not provided"
    let custom_alias = payload
        .custom_alias
        .map(|alias| alias.trim().to_string())
        .filter(|alias| !alias.is_empty());

    let short_code = match &custom_alias {
        Some(alias) => {
            if !is_valid_alias(alias) {
                return Err(ApiError::BadRequest(
                    "Alias may only contain letters, digits, '-' and '_'".to_string(),
                ));
            }
            alias.clone()
        }
        None => free_code(&state)?,
    };

    let link = state.store.create_link(
        &current.user.id,
        NewLink {
            long_url,
            short_url: format!("{}/{}", state.short_domain, short_code),
            short_code,
            custom_alias,
        },
    )?;

    Ok((StatusCode::CREATED, Json(link)))
}

fn free_code(state: &AppState) -> Result<String, ApiError> {
    for _ in 0..CODE_ATTEMPTS {
        let code = state.codes.generate();
        if state.store.get_link_by_code(&code)?.is_none() {
            return Ok(code);
        }
        debug!(code = %code, "Generated short code already taken");
    }
    Err(ApiError::Internal(
        "No free short code found".to_string(),
    ))
}

pub async fn list_links(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let links = state.store.get_links_by_user(&current.user.id)?;

    Ok(Json(json!({
        "total": links.len(),
        "data": links
    })))
}

/// Soft-deletes a link owned by the caller
///
/// # Response
///
/// - **200 OK** - Link deactivated
/// - **403 Forbidden** - Link belongs to another user
/// - **404 Not Found** - Unknown link
pub async fn deactivate_link(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(link) = state.store.get_link(&id)? else {
        return Err(StoreError::NotFound("Link".to_string()).into());
    };

    if link.user_id != current.user.id {
        warn!(link_id = %id, user_id = %current.user.id, "Deactivation of foreign link rejected");
        return Err(ApiError::Forbidden(
            "You are not authorized to delete this link".to_string(),
        ));
    }

    state.store.deactivate_link(&id)?;

    Ok(Json(json!({
        "message": "Short link deleted successfully",
        "deleted_id": id
    })))
}

/// Stores the metadata of a QR code rendered by the image provider
pub async fn create_qr_code(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<CreateQrRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let url = validate_url(&payload.url)?;

    let size = payload.size.unwrap_or(DEFAULT_QR_SIZE);
    if size == 0 || size > MAX_QR_SIZE {
        return Err(ApiError::BadRequest(format!(
            "Size must be between 1 and {}",
            MAX_QR_SIZE
        )));
    }

    let format = payload
        .format
        .map(|format| format.trim().to_lowercase())
        .filter(|format| !format.is_empty())
        .unwrap_or_else(|| DEFAULT_QR_FORMAT.to_string());

    if payload.image_data.is_empty() {
        return Err(ApiError::BadRequest("Image data is required".to_string()));
    }

    let qr = state.store.create_qr_code(
        &current.user.id,
        NewQrCode {
            url,
            size,
            format,
            image_data: payload.image_data,
        },
    )?;

    Ok((StatusCode::CREATED, Json(qr)))
}

pub async fn list_qr_codes(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let qr_codes = state.store.get_qr_codes_by_user(&current.user.id)?;

    Ok(Json(json!({
        "total": qr_codes.len(),
        "data": qr_codes
    })))
}

/// Counts a download of a QR code owned by the caller
pub async fn download_qr_code(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(qr) = state.store.get_qr_code(&id)? else {
        return Err(StoreError::NotFound("QR code".to_string()).into());
    };

    if qr.user_id != current.user.id {
        return Err(ApiError::Forbidden(
            "You are not authorized to access this QR code".to_string(),
        ));
    }

    let qr = state
        .store
        .record_qr_download(&id)?
        .ok_or_else(|| StoreError::NotFound("QR code".to_string()))?;

    Ok(Json(qr))
}

/// Redirects a short code to its original destination and records the click
///
/// # Response
///
/// - **307 Temporary Redirect** - Redirects to the original URL
/// - **404 Not Found** - Unknown or deactivated short code
///
/// 307 keeps browsers from caching the redirect, so every visit is counted.
pub async fn redirect_link(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let link = match state.store.get_link_by_code(&code)? {
        Some(link) if link.active => link,
        _ => return Ok((StatusCode::NOT_FOUND, "URL not found").into_response()),
    };

    // Only count visits that can actually be redirected
    if HeaderValue::from_str(&link.long_url).is_err() {
        warn!(link_id = %link.id, "Stored URL is not a valid Location header");
        return Err(ApiError::Internal(format!(
            "Link {} has an unusable target URL",
            link.id
        )));
    }

    state.store.record_link_click(&link.id)?;

    Ok(Redirect::temporary(&link.long_url).into_response())
}
