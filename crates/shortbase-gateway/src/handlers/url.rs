use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use shortbase_core::EncodeParams;
use tracing::{debug, warn};
use url::Url;

use crate::error::{AppError, Result};
use crate::model::{CreateUrlRequest, KeyQuery, UrlResponse, URL_KIND};
use crate::state::AppState;

pub async fn create_url_handler(
    State(state): State<AppState>,
    query: std::result::Result<Query<KeyQuery>, QueryRejection>,
    request: std::result::Result<Json<CreateUrlRequest>, JsonRejection>,
) -> Result<Json<UrlResponse>> {
    let Query(query) = query?;
    let Json(request) = request?;
    validate_long_url(&request.long_url)?;

    if !state.is_authorized(&query.key) {
        return Err(AppError::Unauthorized);
    }

    let Some(code) = state
        .converter()
        .encode_new(EncodeParams::new(request.long_url.as_str()))
        .await?
    else {
        warn!(long_url = %request.long_url, "no free short code after retries");
        return Err(AppError::Exhausted);
    };

    debug!(code = %code, long_url = %request.long_url, "shortened url");
    Ok(Json(UrlResponse {
        kind: URL_KIND,
        id: code.to_url(state.domain()),
        long_url: request.long_url,
    }))
}

/// Accepts absolute `http`/`https` URLs with a host.
fn validate_long_url(long_url: &str) -> Result<()> {
    if long_url.trim().is_empty() {
        return Err(AppError::InvalidUrl("longUrl must not be empty".to_string()));
    }

    let parsed = Url::parse(long_url).map_err(|e| AppError::InvalidUrl(e.to_string()))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(AppError::InvalidUrl(format!(
            "scheme must be http or https, got '{}'",
            parsed.scheme()
        )));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(AppError::InvalidUrl("url must have a host".to_string()));
    }

    Ok(())
}
