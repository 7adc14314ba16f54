use std::sync::Arc;

use crate::config::Config;
use crate::shortcode::{RandomSlug, ShortCodeGenerator};
use crate::store::RecordStore;

/// Application state shared across all request handlers
///
/// The store and the short-code generator are trait objects so that tests and
/// alternative deployments can swap them without touching the handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub codes: Arc<dyn ShortCodeGenerator>,
    /// Prefix of every short URL, e.g. "http://localhost:8080"
    pub short_domain: String,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>, config: &Config) -> Self {
        Self {
            store,
            codes: Arc::new(RandomSlug::default()),
            short_domain: config.short_domain(),
        }
    }

    pub fn with_codes(mut self, codes: Arc<dyn ShortCodeGenerator>) -> Self {
        self.codes = codes;
        self
    }
}
