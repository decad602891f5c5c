//! OAuth install flow.
//!
//! `/auth?shop=` sends the merchant to Shopify's consent screen and
//! `/auth/callback` exchanges the returned code for an offline access token.

use axum::{
    extract::{Query, RawQuery, State},
    http::{
        HeaderMap, HeaderValue,
        header::{COOKIE, SET_COOKIE},
    },
    response::{IntoResponse, Redirect, Response},
};
use metaplan_core::ShopDomain;
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::instrument;

use crate::db::ShopSessionRepository;
use crate::error::AppError;
use crate::shopify::verify::verify_query_hmac;
use crate::state::AppState;

use super::top_level_redirect;

/// Cookie holding the OAuth `state` nonce between the two legs.
const OAUTH_STATE_COOKIE: &str = "metaplan_oauth_state";

/// Seconds the merchant has to complete the consent screen.
const OAUTH_STATE_MAX_AGE: u32 = 600;

/// Query parameters for `/auth`.
#[derive(Debug, Deserialize)]
pub struct BeginParams {
    pub shop: Option<String>,
    pub embedded: Option<String>,
}

/// Query parameters Shopify sends to the OAuth callback.
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
}

fn state_cookie(value: &str, max_age: u32) -> String {
    format!(
        "{OAUTH_STATE_COOKIE}={value}; Path=/auth; Max-Age={max_age}; HttpOnly; Secure; SameSite=None"
    )
}

/// Read a cookie value from the request headers.
fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
}

/// GET /auth - Start the OAuth install flow.
#[instrument(skip(state))]
pub async fn begin(State(state): State<AppState>, Query(params): Query<BeginParams>) -> Response {
    let Some(shop) = params.shop.as_deref().and_then(|s| ShopDomain::parse(s).ok()) else {
        return AppError::BadRequest("missing or invalid shop".to_string()).into_response();
    };

    let config = state.config();

    // The state cookie cannot be set from inside the admin iframe.
    if params.embedded.as_deref() == Some("1") {
        let url = format!(
            "{}/auth?shop={}",
            config.app_url,
            urlencoding::encode(shop.as_str())
        );
        return top_level_redirect(&config.shopify.api_key, &url).into_response();
    }

    let nonce = uuid::Uuid::new_v4().to_string();
    let redirect_uri = format!("{}/auth/callback", config.app_url);
    let auth_url = state.shopify().authorization_url(
        &shop,
        &redirect_uri,
        &config.shopify.scopes,
        &nonce,
    );

    tracing::info!(shop = %shop, "Starting OAuth install");

    let mut response = Redirect::to(&auth_url).into_response();
    if let Ok(cookie) = HeaderValue::from_str(&state_cookie(&nonce, OAUTH_STATE_MAX_AGE)) {
        response.headers_mut().insert(SET_COOKIE, cookie);
    }
    response
}

/// GET /auth/callback - Finish the OAuth install flow.
#[instrument(skip(state, headers, raw_query, params))]
pub async fn callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawQuery(raw_query): RawQuery,
    Query(params): Query<CallbackParams>,
) -> Result<Response, AppError> {
    let shopify = state.shopify();

    let shop = verify_query_hmac(
        raw_query.as_deref().unwrap_or_default(),
        shopify.api_secret().expose_secret(),
        chrono::Utc::now().timestamp(),
    )
    .map_err(|e| {
        tracing::warn!(error = %e, "OAuth callback failed verification");
        AppError::Unauthorized("invalid OAuth callback signature".to_string())
    })?;

    let stored_state = read_cookie(&headers, OAUTH_STATE_COOKIE);
    if stored_state.is_none() || stored_state != params.state.as_deref() {
        tracing::warn!(shop = %shop, "OAuth state mismatch");
        return Err(AppError::Unauthorized("OAuth state mismatch".to_string()));
    }

    let code = params
        .code
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("missing code".to_string()))?;

    let token = shopify.exchange_code(&shop, code).await?;

    ShopSessionRepository::new(state.pool())
        .save(&shop, token.access_token.expose_secret(), &token.scopes)
        .await?;

    tracing::info!(shop = %shop, scopes = ?token.scopes, "Shop installed");

    let app_url = format!("{}/admin/apps/{}", shop.origin(), shopify.api_key());
    let mut response = Redirect::to(&app_url).into_response();
    if let Ok(cookie) = HeaderValue::from_str(&state_cookie("", 0)) {
        response.headers_mut().insert(SET_COOKIE, cookie);
    }
    Ok(response)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_state_cookie_attributes() {
        let cookie = state_cookie("abc", 600);
        assert!(cookie.starts_with("metaplan_oauth_state=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=None"));
        assert!(cookie.contains("Max-Age=600"));
    }

    #[test]
    fn test_read_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("a=1; metaplan_oauth_state=nonce-1; b=2"),
        );
        assert_eq!(read_cookie(&headers, OAUTH_STATE_COOKIE), Some("nonce-1"));
        assert_eq!(read_cookie(&headers, "missing"), None);
    }
}
