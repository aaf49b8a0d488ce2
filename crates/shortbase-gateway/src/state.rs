use std::collections::HashSet;
use std::sync::Arc;

use shortbase_core::{Converter, RecordStore};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    converter: Arc<dyn Converter>,
    store: Arc<dyn RecordStore>,
    domain: Arc<str>,
    access_keys: Arc<HashSet<String>>,
}

impl AppState {
    /// `domain` is the public prefix short codes are appended to, e.g.
    /// `"https://sb.example/"`.
    pub fn new(
        converter: Arc<dyn Converter>,
        store: Arc<dyn RecordStore>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            converter,
            store,
            domain: Arc::from(domain.into()),
            access_keys: Arc::default(),
        }
    }

    /// Restricts creation to callers presenting one of `keys`.
    ///
    /// Keys are trimmed; blank keys are ignored. An empty list leaves
    /// creation open.
    pub fn with_access_keys<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let keys = keys
            .into_iter()
            .map(|key| key.as_ref().trim().to_string())
            .filter(|key| !key.is_empty())
            .collect();
        self.access_keys = Arc::new(keys);
        self
    }

    pub fn converter(&self) -> &dyn Converter {
        self.converter.as_ref()
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn is_authorized(&self, key: &str) -> bool {
        self.access_keys.is_empty() || self.access_keys.contains(key.trim())
    }
}
