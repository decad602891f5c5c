//! Shop authentication extractors for embedded admin requests.
//!
//! Requests reach `/app/*` from inside the Shopify admin iframe. They are
//! authenticated by a session token (bearer header or `id_token` query
//! parameter) or by a Shopify-signed query string, in that order.

use axum::{
    extract::FromRequestParts,
    http::{HeaderValue, StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use metaplan_core::{Plan, PlanState, ShopDomain};
use secrecy::ExposeSecret;
use tracing::Span;

use crate::db::ShopSessionRepository;
use crate::error::set_sentry_shop;
use crate::services::{Entitlements, pricing_redirect, pricing_redirect_with_error};
use crate::shopify::{
    AdminClient,
    verify::{VerifyError, verify_query_hmac, verify_session_token},
};
use crate::state::AppState;

/// Header asking App Bridge to fetch a fresh session token and retry.
const RETRY_INVALID_SESSION_HEADER: &str = "x-shopify-retry-invalid-session-request";

/// An authenticated shop with an installed offline token.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(session: ShopSession) -> impl IntoResponse {
///     format!("Hello, {}!", session.shop)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ShopSession {
    pub shop: ShopDomain,
    /// Raw query string of the request, kept for redirects.
    pub query: Option<String>,
    /// Admin API client for the shop.
    pub client: AdminClient,
}

impl ShopSession {
    /// `?{query}` or an empty string.
    #[must_use]
    pub fn search(&self) -> String {
        self.query
            .as_deref()
            .filter(|q| !q.is_empty())
            .map_or_else(String::new, |q| format!("?{q}"))
    }
}

/// Error returned when a request cannot be tied to an installed shop.
#[derive(Debug)]
pub enum ShopSessionRejection {
    /// The shop is authentic but has no stored token; (re)install.
    Install(ShopDomain),
    /// Missing or invalid credentials.
    Unauthorized(VerifyError),
    /// The session store could not be read.
    Internal,
}

impl IntoResponse for ShopSessionRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Install(shop) => {
                Redirect::to(&format!("/auth?shop={}", urlencoding::encode(shop.as_str())))
                    .into_response()
            }
            Self::Unauthorized(reason) => {
                tracing::debug!(%reason, "Rejected embedded request");
                let mut response = StatusCode::UNAUTHORIZED.into_response();
                response.headers_mut().insert(
                    RETRY_INVALID_SESSION_HEADER,
                    HeaderValue::from_static("1"),
                );
                response
            }
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

/// Determine the shop a request was issued for.
fn authenticate(
    parts: &Parts,
    api_key: &str,
    api_secret: &str,
    now: i64,
) -> Result<ShopDomain, VerifyError> {
    let bearer = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));
    if let Some(token) = bearer {
        return verify_session_token(token.trim(), api_key, api_secret);
    }

    let query = parts.uri.query().unwrap_or_default();

    let id_token = url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == "id_token")
        .map(|(_, v)| v.into_owned());
    if let Some(token) = id_token {
        match verify_session_token(&token, api_key, api_secret) {
            Ok(shop) => return Ok(shop),
            // Links carry the launch query forward, so its `id_token` expires
            // long before the signed query does.
            Err(reason) if has_param(query, "hmac") => {
                tracing::debug!(%reason, "Query session token rejected, checking signed query");
            }
            Err(reason) => return Err(reason),
        }
    }

    verify_query_hmac(&without_param(query, "billing_error"), api_secret, now)
}

/// Query string minus one parameter the app adds itself after Shopify signed it.
fn without_param(query: &str, name: &str) -> String {
    query
        .split('&')
        .filter(|pair| pair.split('=').next() != Some(name))
        .collect::<Vec<_>>()
        .join("&")
}

fn has_param(query: &str, name: &str) -> bool {
    url::form_urlencoded::parse(query.as_bytes()).any(|(k, _)| k == name)
}

impl FromRequestParts<AppState> for ShopSession {
    type Rejection = ShopSessionRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let shopify = state.shopify();
        let shop = authenticate(
            parts,
            shopify.api_key(),
            shopify.api_secret().expose_secret(),
            chrono::Utc::now().timestamp(),
        )
        .map_err(ShopSessionRejection::Unauthorized)?;

        Span::current().record("shop", shop.as_str());
        set_sentry_shop(shop.as_str());

        let session = ShopSessionRepository::new(state.pool())
            .get_by_shop(&shop)
            .await
            .map_err(|e| {
                tracing::error!(shop = %shop, error = %e, "Failed to load shop session");
                ShopSessionRejection::Internal
            })?
            .ok_or_else(|| ShopSessionRejection::Install(shop.clone()))?;

        let client = shopify.admin_client(&shop, &session.access_token);

        Ok(Self {
            shop,
            query: parts.uri.query().map(String::from),
            client,
        })
    }
}

/// Error code added to the pricing URL when the plan could not be checked.
pub const PLAN_UNAVAILABLE: &str = "plan_unavailable";

/// Let paid plans through and send everyone else to pricing.
///
/// The redirect keeps the request's query string so the embedded app keeps
/// its `shop` and `host` context.
pub fn require_paid(plan: &PlanState, query: Option<&str>) -> Result<(), Redirect> {
    if plan.is_paid() {
        Ok(())
    } else {
        Err(Redirect::to(&pricing_redirect(query)))
    }
}

/// Extractor that requires a paid plan.
///
/// Shops on the free plan are redirected to the pricing page with the
/// request's query string intact. When billing cannot be reached the shop is
/// sent there too, with `billing_error=plan_unavailable`.
#[derive(Debug, Clone)]
pub struct RequirePaidPlan {
    pub session: ShopSession,
    pub plan: PlanState,
}

impl FromRequestParts<AppState> for RequirePaidPlan {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = ShopSession::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;
        let query = session.query.as_deref();

        let plan = match Entitlements::new(&session.client, &Plan::PAID, state.config().billing.test)
            .resolve()
            .await
        {
            Ok(plan) => plan,
            Err(e) => {
                tracing::warn!(shop = %session.shop, error = %e, "Entitlement check failed");
                return Err(
                    Redirect::to(&pricing_redirect_with_error(query, PLAN_UNAVAILABLE))
                        .into_response(),
                );
            }
        };

        if let Err(redirect) = require_paid(&plan, query) {
            tracing::info!(shop = %session.shop, "Paid feature requested on free plan");
            return Err(redirect.into_response());
        }

        Ok(Self { session, plan })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;
    use hmac::{Hmac, Mac};
    use jsonwebtoken::{EncodingKey, Header, encode};
    use metaplan_core::ActiveSubscription;
    use sha2::Sha256;

    use super::*;
    use crate::shopify::verify::SessionTokenClaims;

    const KEY: &str = "api-key";
    const SECRET: &str = "api-secret";

    fn parts(uri: &str, bearer: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = bearer {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn session_token(shop: &str) -> String {
        session_token_expiring(shop, chrono::Utc::now().timestamp() + 60)
    }

    fn session_token_expiring(shop: &str, exp: i64) -> String {
        let claims = SessionTokenClaims {
            iss: format!("https://{shop}/admin"),
            dest: format!("https://{shop}"),
            aud: KEY.to_string(),
            sub: None,
            exp,
            nbf: exp - 120,
            iat: exp - 120,
            jti: None,
            sid: None,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_bearer_token_takes_precedence() {
        let token = session_token("bearer.myshopify.com");
        let parts = parts("/app?shop=query.myshopify.com", Some(&token));
        let shop = authenticate(&parts, KEY, SECRET, chrono::Utc::now().timestamp()).unwrap();
        assert_eq!(shop.as_str(), "bearer.myshopify.com");
    }

    #[test]
    fn test_id_token_query_param() {
        let token = session_token("store.myshopify.com");
        let parts = parts(&format!("/app?embedded=1&id_token={token}"), None);
        let shop = authenticate(&parts, KEY, SECRET, chrono::Utc::now().timestamp()).unwrap();
        assert_eq!(shop.as_str(), "store.myshopify.com");
    }

    #[test]
    fn test_signed_query_fallback() {
        let now = 1_760_000_000;
        let message = format!("shop=store.myshopify.com&timestamp={now}");

        let parts = parts(&format!("/app?{message}&hmac={}", sign(&message)), None);
        let shop = authenticate(&parts, KEY, SECRET, now).unwrap();
        assert_eq!(shop.as_str(), "store.myshopify.com");
    }

    fn sign(message: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(message.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_expired_id_token_falls_back_to_signed_query() {
        let now = chrono::Utc::now().timestamp();
        let token = session_token_expiring("store.myshopify.com", now - 60);
        let message = format!(
            "embedded=1&host=YWJj&id_token={token}&shop=store.myshopify.com&timestamp={}",
            now - 120
        );
        let parts = parts(
            &format!("/app/metafieldcreation?{message}&hmac={}", sign(&message)),
            None,
        );

        let shop = authenticate(&parts, KEY, SECRET, now).unwrap();
        assert_eq!(shop.as_str(), "store.myshopify.com");
    }

    #[test]
    fn test_signed_query_with_billing_error_code() {
        let now = chrono::Utc::now().timestamp();
        let message = format!("host=YWJj&shop=store.myshopify.com&timestamp={now}");
        let uri = format!(
            "/app/pricing?{message}&hmac={}&billing_error=cancel_failed",
            sign(&message)
        );

        let shop = authenticate(&parts(&uri, None), KEY, SECRET, now).unwrap();
        assert_eq!(shop.as_str(), "store.myshopify.com");
    }

    #[test]
    fn test_expired_id_token_without_signature_is_rejected() {
        let now = chrono::Utc::now().timestamp();
        let token = session_token_expiring("store.myshopify.com", now - 60);
        let parts = parts(&format!("/app?shop=store.myshopify.com&id_token={token}"), None);

        assert!(matches!(
            authenticate(&parts, KEY, SECRET, now),
            Err(VerifyError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_expired_id_token_with_bad_signature_is_rejected() {
        let now = chrono::Utc::now().timestamp();
        let token = session_token_expiring("store.myshopify.com", now - 60);
        let parts = parts(
            &format!("/app?id_token={token}&shop=store.myshopify.com&timestamp={now}&hmac=00ff"),
            None,
        );

        assert_eq!(
            authenticate(&parts, KEY, SECRET, now),
            Err(VerifyError::InvalidHmac)
        );
    }

    #[test]
    fn test_free_plan_redirects_to_pricing_with_query() {
        let query = "embedded=1&host=YWJj&shop=store.myshopify.com";
        let response = require_paid(&PlanState::Free, Some(query))
            .unwrap_err()
            .into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get("location").unwrap(),
            "/app/pricing?embedded=1&host=YWJj&shop=store.myshopify.com"
        );
    }

    #[test]
    fn test_paid_plan_passes() {
        let plan = PlanState::Subscribed(ActiveSubscription {
            id: "gid://shopify/AppSubscription/3".to_string(),
            name: "Monthly subscription".to_string(),
            plan: Plan::Monthly,
            test: false,
        });
        assert!(require_paid(&plan, Some("shop=store.myshopify.com")).is_ok());
    }

    #[test]
    fn test_no_credentials() {
        let parts = parts("/app?shop=store.myshopify.com", None);
        assert_eq!(
            authenticate(&parts, KEY, SECRET, 0),
            Err(VerifyError::MissingHmac)
        );
    }

    #[test]
    fn test_rejections() {
        let shop = ShopDomain::parse("store.myshopify.com").unwrap();
        let response = ShopSessionRejection::Install(shop).into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get("location").unwrap(),
            "/auth?shop=store.myshopify.com"
        );

        let response = ShopSessionRejection::Unauthorized(VerifyError::InvalidHmac).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(RETRY_INVALID_SESSION_HEADER).unwrap(),
            "1"
        );
    }
}
