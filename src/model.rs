//! Data models for the link and QR code service
//!
//! This module defines the persisted records (users, links, QR codes, sessions),
//! the derived analytics view, and the request/response payloads of the HTTP API.
//!
//! Persisted records use camelCase field names so that an exported document keeps
//! the `{ users, links, qrCodes, analytics }` layout of previously stored data.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Plan assigned to every new account
pub const DEFAULT_PLAN: &str = "free";

/// Counter names understood by [`UserStats::add`]
pub const STAT_TOTAL_URLS: &str = "totalUrls";
pub const STAT_TOTAL_QR_CODES: &str = "totalQRCodes";
pub const STAT_TOTAL_CLICKS: &str = "totalClicks";

/// Denormalized counters kept on every user record
///
/// The three well-known counters are plain fields. Any other counter written
/// through [`UserStats::add`] lands in `other` and is persisted alongside them.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    #[serde(default)]
    pub total_urls: u64,

    #[serde(default, rename = "totalQRCodes")]
    pub total_qr_codes: u64,

    #[serde(default)]
    pub total_clicks: u64,

    #[serde(flatten)]
    pub other: BTreeMap<String, u64>,
}

impl UserStats {
    /// Adds `amount` to the named counter, starting from 0 if it was never set
    pub fn add(&mut self, name: &str, amount: u64) {
        let counter = match name {
            STAT_TOTAL_URLS => &mut self.total_urls,
            STAT_TOTAL_QR_CODES => &mut self.total_qr_codes,
            STAT_TOTAL_CLICKS => &mut self.total_clicks,
            other => self.other.entry(other.to_string()).or_insert(0),
        };
        *counter = counter.saturating_add(amount);
    }
}

/// Represents an account stored in the database
///
/// `password` holds a bcrypt hash, never the plaintext. Use [`UserProfile`]
/// for anything that leaves the process through the API.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Identifier in the form `user_<epoch millis>`
    pub id: String,

    /// Unique login key
    pub email: String,

    /// Display name
    pub name: String,

    /// Credential hash
    pub password: String,

    pub created_at: DateTime<Utc>,

    /// Updated on every successful authentication
    pub last_login: DateTime<Utc>,

    #[serde(default = "default_plan")]
    pub plan: String,

    #[serde(default)]
    pub stats: UserStats,
}

fn default_plan() -> String {
    DEFAULT_PLAN.to_string()
}

/// Input for creating a user
#[derive(Deserialize, Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// A single recorded visit of a short link
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ClickEvent {
    pub timestamp: DateTime<Utc>,

    /// UTC calendar date of `timestamp`, used to bucket the daily histogram
    pub date: NaiveDate,
}

impl ClickEvent {
    pub fn at(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            date: timestamp.date_naive(),
        }
    }
}

/// Represents a shortened URL stored in the database
///
/// This structure contains:
/// - The identifier and owner of the link
/// - Original and shortened URLs plus the short code
/// - Click counter and the ordered list of click events
/// - The `active` flag used for soft deletion
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    /// Identifier in the form `link_<epoch millis>`
    pub id: String,

    /// Owning user identifier
    pub user_id: String,

    /// The original long URL that was shortened
    pub long_url: String,

    /// The complete shortened URL (e.g., "http://localhost:8080/abc123")
    pub short_url: String,

    /// Path segment resolved by the redirect endpoint
    pub short_code: String,

    /// Alias requested by the owner, if any
    #[serde(default)]
    pub custom_alias: Option<String>,

    pub created_at: DateTime<Utc>,

    /// Number of recorded visits
    #[serde(default)]
    pub clicks: u64,

    #[serde(default)]
    pub click_events: Vec<ClickEvent>,

    /// Inactive links are hidden from listings and no longer redirect
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Input for creating a link
///
/// The short URL and code are produced by the shortening collaborator before
/// the link reaches the store.
#[derive(Debug, Clone)]
pub struct NewLink {
    pub long_url: String,
    pub short_url: String,
    pub short_code: String,
    pub custom_alias: Option<String>,
}

/// Metadata of a generated QR code
///
/// `image_data` is whatever payload the external image provider returned
/// (typically a data URI); it is stored as-is.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QrCode {
    /// Identifier in the form `qr_<epoch millis>`
    pub id: String,

    pub user_id: String,

    /// Target encoded in the QR image
    pub url: String,

    pub size: u32,

    pub format: String,

    pub image_data: String,

    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub downloads: u64,
}

/// Input for creating a QR code record
#[derive(Debug, Clone)]
pub struct NewQrCode {
    pub url: String,
    pub size: u32,
    pub format: String,
    pub image_data: String,
}

/// Authenticated session, identified by an opaque bearer token
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

/// Entry of the merged recent-activity feed
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Activity {
    Link(Link),
    Qr(QrCode),
}

impl Activity {
    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Activity::Link(link) => link.created_at,
            Activity::Qr(qr) => qr.created_at,
        }
    }
}

/// Aggregate view over one user's links and QR codes
///
/// Computed on demand, never persisted.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub total_urls: u64,

    #[serde(rename = "totalQRCodes")]
    pub total_qr_codes: u64,

    pub total_clicks: u64,

    /// Click counts keyed by `YYYY-MM-DD`, oldest date first
    pub daily_clicks: BTreeMap<NaiveDate, u64>,

    /// Up to five links with the most clicks
    pub top_links: Vec<Link>,

    /// Links and QR codes, newest first
    pub recent_activity: Vec<Activity>,
}

/// User data safe to return from the API (no credential)
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub name: String,
    pub plan: String,
    pub created_at: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
    pub stats: UserStats,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            plan: user.plan,
            created_at: user.created_at,
            last_login: user.last_login,
            stats: user.stats,
        }
    }
}

/// Request payload for signing up
///
/// # Example
/// ```json
/// {
///   "email": "a@x.com",
///   "password": "pw",
///   "name": "Alice"
/// }
/// ```
#[derive(Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// Request payload for logging in
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response returned after signup or login
///
/// The token is sent back as `Authorization: Bearer <token>` on later requests.
#[derive(Serialize)]
pub struct AuthResponse {
    pub user: UserProfile,
    pub token: String,
}

/// Request payload for shortening a URL
///
/// # Example
/// ```json
/// {
///   "url": "https://example.com/very/long/url",
///   "custom_alias": "my-link"  // Optional
/// }
/// ```
#[derive(Deserialize)]
pub struct CreateLinkRequest {
    /// The original URL to be shortened
    pub url: String,

    /// Optional custom short code
    /// If not provided, the short-code generator picks one
    pub custom_alias: Option<String>,
}

/// Request payload for storing a generated QR code
#[derive(Deserialize)]
pub struct CreateQrRequest {
    pub url: String,

    /// Defaults to 300 pixels
    pub size: Option<u32>,

    /// Defaults to "png"
    pub format: Option<String>,

    /// Payload returned by the image provider
    pub image_data: String,
}

/// Query parameters for the dashboard
///
/// # Example
/// Query string: `?days=30&limit=20`
#[derive(Deserialize)]
pub struct AnalyticsParams {
    /// Length of the daily histogram, 7 if not provided
    pub days: Option<u32>,

    /// Length of the recent-activity feed, 10 if not provided
    pub limit: Option<usize>,
}
