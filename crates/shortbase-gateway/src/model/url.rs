use serde::{Deserialize, Serialize};

/// Value of the `kind` field in creation responses.
pub const URL_KIND: &str = "urlshortener#url";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUrlRequest {
    #[serde(default)]
    pub long_url: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct KeyQuery {
    #[serde(default)]
    pub key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlResponse {
    pub kind: &'static str,
    /// The full short URL.
    pub id: String,
    pub long_url: String,
}
