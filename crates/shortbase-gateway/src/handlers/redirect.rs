use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use shortbase_core::Redirect;

use crate::error::{AppError, Result};
use crate::state::AppState;

pub async fn redirect_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Response> {
    let redirect = state
        .converter()
        .resolve(&code)
        .await?
        .ok_or(AppError::NotFound)?;

    let status = redirect_status(&redirect);
    Ok((status, [(header::LOCATION, redirect.target)]).into_response())
}

fn redirect_status(redirect: &Redirect) -> StatusCode {
    match (redirect.permanent, redirect.preserve_method) {
        (true, true) => StatusCode::PERMANENT_REDIRECT,
        (true, false) => StatusCode::MOVED_PERMANENTLY,
        (false, true) => StatusCode::TEMPORARY_REDIRECT,
        (false, false) => StatusCode::FOUND,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn redirect(permanent: bool, preserve_method: bool) -> Redirect {
        Redirect {
            target: "https://example.com".to_string(),
            permanent,
            preserve_method,
        }
    }

    #[test]
    fn status_follows_flags() {
        assert_eq!(redirect_status(&redirect(true, true)), StatusCode::PERMANENT_REDIRECT);
        assert_eq!(redirect_status(&redirect(true, false)), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(redirect_status(&redirect(false, true)), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(redirect_status(&redirect(false, false)), StatusCode::FOUND);
    }
}
