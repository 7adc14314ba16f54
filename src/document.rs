//! Single-document export format
//!
//! Data of the earlier browser-only deployment was kept as one JSON document:
//!
//! ```json
//! { "users": [...], "links": [...], "qrCodes": [...], "analytics": [] }
//! ```
//!
//! The store no longer persists data this way, but it can still export itself
//! into this shape and import it back, which keeps old data loadable.

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::model::{Link, QrCode, User};

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoreDocument {
    #[serde(default)]
    pub users: Vec<User>,

    #[serde(default)]
    pub links: Vec<Link>,

    #[serde(default, rename = "qrCodes")]
    pub qr_codes: Vec<QrCode>,

    /// Always written empty; analytics are derived on demand
    #[serde(default)]
    pub analytics: Vec<serde_json::Value>,
}

impl StoreDocument {
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string(self)?)
    }
}
