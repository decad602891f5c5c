//! Verification of Shopify-signed requests.
//!
//! Two credentials reach the app from the Shopify admin:
//!
//! - Session tokens: HS256 JWTs signed with the app secret, sent by App Bridge
//!   as `Authorization: Bearer` (or `id_token` on document loads).
//! - Signed query strings: `shop`, `timestamp`, ... plus an `hmac` parameter,
//!   sent on app launch and on the OAuth callback.

use hmac::{Hmac, Mac};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use metaplan_core::ShopDomain;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a signed query string.
pub const MAX_QUERY_AGE_SECS: i64 = 24 * 60 * 60;

/// Clock skew tolerated on session token `exp`/`nbf`.
pub const SESSION_TOKEN_LEEWAY_SECS: u64 = 5;

/// Reasons a Shopify credential is rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("missing hmac parameter")]
    MissingHmac,
    #[error("hmac does not match")]
    InvalidHmac,
    #[error("missing or invalid timestamp")]
    InvalidTimestamp,
    #[error("signed request is too old")]
    Expired,
    #[error("missing or invalid shop")]
    InvalidShop,
    #[error("invalid session token: {0}")]
    InvalidToken(String),
}

/// Claims of an App Bridge session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTokenClaims {
    /// `https://{shop}/admin`
    pub iss: String,
    /// `https://{shop}`
    pub dest: String,
    /// App API key.
    pub aud: String,
    #[serde(default)]
    pub sub: Option<String>,
    pub exp: i64,
    pub nbf: i64,
    pub iat: i64,
    #[serde(default)]
    pub jti: Option<String>,
    #[serde(default)]
    pub sid: Option<String>,
}

/// Verify a session token and return the shop it was issued for.
///
/// # Errors
///
/// Returns `VerifyError::InvalidToken` if the signature, audience, or
/// validity window is wrong, and `VerifyError::InvalidShop` if `dest` is not
/// a shop domain.
pub fn verify_session_token(
    token: &str,
    api_key: &str,
    api_secret: &str,
) -> Result<ShopDomain, VerifyError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[api_key]);
    validation.set_required_spec_claims(&["exp", "nbf", "aud"]);
    validation.validate_nbf = true;
    validation.leeway = SESSION_TOKEN_LEEWAY_SECS;

    let data = decode::<SessionTokenClaims>(
        token,
        &DecodingKey::from_secret(api_secret.as_bytes()),
        &validation,
    )
    .map_err(|e| VerifyError::InvalidToken(e.to_string()))?;

    let claims = data.claims;
    let shop = ShopDomain::parse(&claims.dest).map_err(|_| VerifyError::InvalidShop)?;

    if !claims.iss.starts_with(&shop.origin()) {
        return Err(VerifyError::InvalidToken("issuer does not match destination".to_string()));
    }

    Ok(shop)
}

/// Verify a Shopify-signed query string and return its shop.
///
/// The signature covers every parameter except `hmac` and `signature`,
/// sorted by key and joined as `k=v&k=v`.
///
/// # Errors
///
/// Returns a `VerifyError` describing the first check that failed.
pub fn verify_query_hmac(query: &str, api_secret: &str, now: i64) -> Result<ShopDomain, VerifyError> {
    let mut provided_hmac = None;
    let mut pairs: Vec<(String, String)> = Vec::new();

    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "hmac" => provided_hmac = Some(value.into_owned()),
            "signature" => {}
            _ => pairs.push((key.into_owned(), value.into_owned())),
        }
    }

    let provided_hmac = provided_hmac.ok_or(VerifyError::MissingHmac)?;
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    let message = pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let expected = hex::decode(&provided_hmac).map_err(|_| VerifyError::InvalidHmac)?;
    let mut mac =
        HmacSha256::new_from_slice(api_secret.as_bytes()).map_err(|_| VerifyError::InvalidHmac)?;
    mac.update(message.as_bytes());
    // Constant-time comparison
    mac.verify_slice(&expected)
        .map_err(|_| VerifyError::InvalidHmac)?;

    let timestamp = pairs
        .iter()
        .find(|(k, _)| k == "timestamp")
        .and_then(|(_, v)| v.parse::<i64>().ok())
        .ok_or(VerifyError::InvalidTimestamp)?;
    if (now - timestamp).abs() > MAX_QUERY_AGE_SECS {
        return Err(VerifyError::Expired);
    }

    pairs
        .iter()
        .find(|(k, _)| k == "shop")
        .and_then(|(_, v)| ShopDomain::parse(v).ok())
        .ok_or(VerifyError::InvalidShop)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use jsonwebtoken::{EncodingKey, Header, encode};

    use super::*;

    const SECRET: &str = "hush-its-a-secret";
    const API_KEY: &str = "api-key-1";
    const NOW: i64 = 1_760_000_000;

    fn sign(message: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(message.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn signed_query(timestamp: i64) -> String {
        let message = format!("host=YWRtaW4&shop=store.myshopify.com&timestamp={timestamp}");
        format!("{message}&hmac={}", sign(&message))
    }

    fn claims(shop: &str, exp: i64) -> SessionTokenClaims {
        let now = chrono::Utc::now().timestamp();
        SessionTokenClaims {
            iss: format!("https://{shop}/admin"),
            dest: format!("https://{shop}"),
            aud: API_KEY.to_string(),
            sub: Some("42".to_string()),
            exp,
            nbf: now - 10,
            iat: now - 10,
            jti: None,
            sid: None,
        }
    }

    fn token(claims: &SessionTokenClaims, secret: &str) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_query_hmac_valid() {
        let shop = verify_query_hmac(&signed_query(NOW - 60), SECRET, NOW).unwrap();
        assert_eq!(shop.as_str(), "store.myshopify.com");
    }

    #[test]
    fn test_query_hmac_param_order_does_not_matter() {
        let message = format!("host=YWRtaW4&shop=store.myshopify.com&timestamp={NOW}");
        let query = format!("hmac={}&timestamp={NOW}&shop=store.myshopify.com&host=YWRtaW4", sign(&message));
        assert!(verify_query_hmac(&query, SECRET, NOW).is_ok());
    }

    #[test]
    fn test_query_hmac_tampered() {
        let query = signed_query(NOW).replace("store.myshopify.com", "other.myshopify.com");
        assert_eq!(
            verify_query_hmac(&query, SECRET, NOW),
            Err(VerifyError::InvalidHmac)
        );
    }

    #[test]
    fn test_query_hmac_missing() {
        assert_eq!(
            verify_query_hmac("shop=store.myshopify.com", SECRET, NOW),
            Err(VerifyError::MissingHmac)
        );
    }

    #[test]
    fn test_query_hmac_expired() {
        let query = signed_query(NOW - MAX_QUERY_AGE_SECS - 1);
        assert_eq!(
            verify_query_hmac(&query, SECRET, NOW),
            Err(VerifyError::Expired)
        );
    }

    #[test]
    fn test_session_token_valid() {
        let exp = chrono::Utc::now().timestamp() + 60;
        let jwt = token(&claims("store.myshopify.com", exp), SECRET);
        let shop = verify_session_token(&jwt, API_KEY, SECRET).unwrap();
        assert_eq!(shop.as_str(), "store.myshopify.com");
    }

    #[test]
    fn test_session_token_wrong_secret() {
        let exp = chrono::Utc::now().timestamp() + 60;
        let jwt = token(&claims("store.myshopify.com", exp), "another-secret");
        assert!(matches!(
            verify_session_token(&jwt, API_KEY, SECRET),
            Err(VerifyError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_session_token_wrong_audience() {
        let exp = chrono::Utc::now().timestamp() + 60;
        let jwt = token(&claims("store.myshopify.com", exp), SECRET);
        assert!(matches!(
            verify_session_token(&jwt, "other-app", SECRET),
            Err(VerifyError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_session_token_expired() {
        let exp = chrono::Utc::now().timestamp() - 120;
        let jwt = token(&claims("store.myshopify.com", exp), SECRET);
        assert!(matches!(
            verify_session_token(&jwt, API_KEY, SECRET),
            Err(VerifyError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_session_token_bad_destination() {
        let exp = chrono::Utc::now().timestamp() + 60;
        let jwt = token(&claims("example.com", exp), SECRET);
        assert_eq!(
            verify_session_token(&jwt, API_KEY, SECRET),
            Err(VerifyError::InvalidShop)
        );
    }
}
