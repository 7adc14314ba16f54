//! Route definitions for the link and QR code API
//!
//! This module configures all HTTP routes and maps them to their respective handlers.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handler::{
    create_link, create_qr_code, dashboard, deactivate_link, download_qr_code, list_links,
    list_qr_codes, login, logout, me, redirect_link, signup,
};
use crate::state::AppState;

use axum::middleware;
use crate::middleware::require_session;

/// Creates and configures the Axum application router with all routes
///
/// # Route Definitions
///
/// Public:
/// - `GET /{code}` - Redirects to the original URL and records a click
/// - `POST /api/auth/signup` - Creates an account, returns a session token
/// - `POST /api/auth/login` - Returns a session token
///
/// Requires `Authorization: Bearer <token>`:
/// - `POST /api/auth/logout`
/// - `GET /api/me` - Profile of the caller
/// - `GET /api/dashboard` - Analytics view
/// - `GET /api/links`, `POST /api/links`
/// - `DELETE /api/links/{id}` - Soft delete
/// - `GET /api/qr-codes`, `POST /api/qr-codes`
/// - `POST /api/qr-codes/{id}/download`
pub fn create_app(state: AppState) -> Router {
    // route_layer keeps unknown paths at 404 instead of 401
    let protected_routes = Router::new()
        .route("/auth/logout", post(logout))
        .route("/me", get(me))
        .route("/dashboard", get(dashboard))
        .route("/links", get(list_links).post(create_link))
        .route("/links/{id}", delete(deactivate_link))
        .route("/qr-codes", get(list_qr_codes).post(create_qr_code))
        .route("/qr-codes/{id}/download", post(download_qr_code))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session));

    let api_routes = Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .merge(protected_routes);

    Router::new()
        .route("/{code}", get(redirect_link))
        .nest("/api", api_routes)
        .with_state(state)
}
