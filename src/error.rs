//! Error types for the record store and the HTTP API
//!
//! [`StoreError`] is what every store operation returns. Lookups that simply
//! miss are not errors: they come back as `Ok(None)`.
//! [`ApiError`] adds the request-level failures and knows how to render itself
//! as a JSON response.

use std::fmt::{Display, Formatter};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

#[derive(Debug)]
pub enum StoreError {
    /// Another user already registered this email
    DuplicateEmail,
    /// The short code of a new link is already in use
    DuplicateCode(String),
    /// A referenced record does not exist
    NotFound(String),
    /// The password did not verify against the stored hash
    InvalidCredentials,
    Storage(String),
    Serialization(String),
    Hashing(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::DuplicateEmail => write!(f, "Email already registered"),
            StoreError::DuplicateCode(code) => write!(f, "Short code '{}' is already taken", code),
            StoreError::NotFound(what) => write!(f, "{} not found", what),
            StoreError::InvalidCredentials => write!(f, "Invalid email or password"),
            StoreError::Storage(msg) => write!(f, "storage error: {}", msg),
            StoreError::Serialization(msg) => write!(f, "serialization error: {}", msg),
            StoreError::Hashing(msg) => write!(f, "password hashing error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

macro_rules! storage_error_from {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for StoreError {
                fn from(err: $source) -> Self {
                    StoreError::Storage(err.to_string())
                }
            }
        )*
    };
}

storage_error_from!(
    redb::Error,
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<bcrypt::BcryptError> for StoreError {
    fn from(err: bcrypt::BcryptError) -> Self {
        StoreError::Hashing(err.to_string())
    }
}

/// Failure of an API request
#[derive(Debug)]
pub enum ApiError {
    Store(StoreError),
    /// Missing or unknown session token
    Unauthorized,
    /// The record belongs to another user
    Forbidden(String),
    BadRequest(String),
    /// A blocking task panicked or was cancelled
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Store(StoreError::DuplicateEmail) => (StatusCode::CONFLICT, "duplicate_email"),
            ApiError::Store(StoreError::DuplicateCode(_)) => (StatusCode::CONFLICT, "duplicate_code"),
            ApiError::Store(StoreError::NotFound(_)) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Store(StoreError::InvalidCredentials) => {
                (StatusCode::UNAUTHORIZED, "invalid_credentials")
            }
            ApiError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Store(err) => write!(f, "{}", err),
            ApiError::Unauthorized => write!(f, "Invalid or missing session token"),
            ApiError::Forbidden(msg) | ApiError::BadRequest(msg) => write!(f, "{}", msg),
            ApiError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        // Internal details stay in the log
        let message = if status.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (
            status,
            Json(json!({
                "error": message,
                "code": code
            })),
        )
            .into_response()
    }
}
