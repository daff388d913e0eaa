use crate::core::auth::Session;
use crate::core::config::AppState;
use crate::core::ctx::Ctx;
use crate::core::error::{Error, Result};
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

/// Cookie carrying the session token for browser pages
pub const SESSION_COOKIE: &str = "cynefin_session";

pub async fn mw_require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response> {
    debug!("MIDDLEWARE: require_auth");

    let token = token_from_headers(req.headers())?;

    let session = state.auth.validate_session(&token).await.map_err(|e| {
        warn!("Rejected session token: {}", e);
        Error::LoginFail
    })?;

    req.extensions_mut()
        .insert(Ctx::new(session.user_id, session.token));

    Ok(next.run(req).await)
}

/// Token from `Authorization: Bearer <token>`, falling back to the session cookie.
pub fn token_from_headers(headers: &HeaderMap) -> Result<String> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        let value = value.to_str().map_err(|_| Error::AuthFailTokenWrongFormat)?;
        let token = value
            .strip_prefix("Bearer ")
            .ok_or(Error::AuthFailTokenWrongFormat)?
            .trim();
        if token.is_empty() {
            return Err(Error::AuthFailTokenWrongFormat);
        }
        return Ok(token.to_string());
    }

    session_cookie(headers).ok_or(Error::AuthFailNoToken)
}

pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

/// Session for page routes, which render the sign-in form instead of failing.
pub async fn optional_session(state: &AppState, headers: &HeaderMap) -> Option<Session> {
    let token = token_from_headers(headers).ok()?;
    state.auth.validate_session(&token).await.ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_preferred() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("cynefin_session=cookie"),
        );
        assert_eq!(token_from_headers(&headers).unwrap(), "abc");
    }

    #[test]
    fn test_cookie_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("other=1; cynefin_session=tok; x=y"),
        );
        assert_eq!(token_from_headers(&headers).unwrap(), "tok");
    }

    #[test]
    fn test_missing_and_malformed() {
        let headers = HeaderMap::new();
        assert!(matches!(
            token_from_headers(&headers),
            Err(Error::AuthFailNoToken)
        ));

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic xyz"));
        assert!(matches!(
            token_from_headers(&headers),
            Err(Error::AuthFailTokenWrongFormat)
        ));
    }
}
