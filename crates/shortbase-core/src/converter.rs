use crate::error::ConvertError;
use crate::shortcode::ShortCode;
use crate::store::Redirect;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

type Result<T> = std::result::Result<T, ConvertError>;

/// Parameters for minting a new short code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodeParams {
    /// The target to redirect to.
    pub target: String,
    pub permanent: bool,
    pub preserve_method: bool,
    pub track_hits: bool,
}

impl EncodeParams {
    /// Parameters with the default flags: temporary redirect that preserves
    /// the request method, no hit tracking.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            permanent: false,
            preserve_method: true,
            track_hits: false,
        }
    }
}

/// The two operations the transport layer calls.
#[async_trait]
pub trait Converter: Send + Sync + 'static {
    /// Stores `params.target` under a freshly allocated key and returns its
    /// short code.
    ///
    /// Returns `Ok(None)` when every allocation attempt hit an existing key.
    async fn encode_new(&self, params: EncodeParams) -> Result<Option<ShortCode>>;

    /// Resolves a short code to its redirect.
    ///
    /// Returns `Ok(None)` if the code is malformed or no record exists.
    async fn resolve(&self, code: &str) -> Result<Option<Redirect>>;
}
