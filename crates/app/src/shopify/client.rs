//! Shopify app credentials, OAuth install flow, and per-shop GraphQL client.

use std::sync::Arc;

use graphql_client::GraphQLQuery;
use metaplan_core::ShopDomain;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, de::DeserializeOwned};
use tracing::instrument;

use crate::config::ShopifyAppConfig;

use super::{GraphQLError, ShopifyError};

// =============================================================================
// ShopifyApp
// =============================================================================

/// The Shopify app itself: client credentials plus a shared HTTP client.
///
/// Cheap to clone. One instance lives in the application state; per-shop
/// [`AdminClient`]s borrow its HTTP connection pool.
#[derive(Clone)]
pub struct ShopifyApp {
    inner: Arc<ShopifyAppInner>,
}

struct ShopifyAppInner {
    client: reqwest::Client,
    api_key: String,
    api_secret: SecretString,
    api_version: String,
}

/// Offline access token returned by the OAuth code exchange.
#[derive(Clone)]
pub struct AccessToken {
    pub access_token: SecretString,
    /// Granted scopes.
    pub scopes: Vec<String>,
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("access_token", &"[REDACTED]")
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// OAuth token response from Shopify.
#[derive(Debug, Deserialize)]
struct OAuthTokenResponse {
    access_token: String,
    scope: String,
}

impl ShopifyApp {
    /// Create the app client from configuration.
    #[must_use]
    pub fn new(config: &ShopifyAppConfig) -> Self {
        Self {
            inner: Arc::new(ShopifyAppInner {
                client: reqwest::Client::new(),
                api_key: config.api_key.clone(),
                api_secret: config.api_secret.clone(),
                api_version: config.api_version.clone(),
            }),
        }
    }

    /// The app's client ID (API key).
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.inner.api_key
    }

    /// The app's client secret. Signs OAuth query strings and session tokens.
    #[must_use]
    pub fn api_secret(&self) -> &SecretString {
        &self.inner.api_secret
    }

    /// Admin API version used for every GraphQL call.
    #[must_use]
    pub fn api_version(&self) -> &str {
        &self.inner.api_version
    }

    /// Build a GraphQL client for one installed shop.
    #[must_use]
    pub fn admin_client(&self, shop: &ShopDomain, access_token: &SecretString) -> AdminClient {
        AdminClient {
            inner: Arc::new(AdminClientInner {
                client: self.inner.client.clone(),
                endpoint: format!(
                    "https://{}/admin/api/{}/graphql.json",
                    shop.as_str(),
                    self.inner.api_version
                ),
                shop: shop.clone(),
                access_token: access_token.clone(),
            }),
        }
    }

    // =========================================================================
    // OAuth Flow
    // =========================================================================

    /// Generate the OAuth authorization URL for a shop.
    ///
    /// Redirect the merchant to this URL to begin the install flow.
    #[must_use]
    pub fn authorization_url(
        &self,
        shop: &ShopDomain,
        redirect_uri: &str,
        scopes: &[String],
        state: &str,
    ) -> String {
        let scope = scopes.join(",");
        format!(
            "https://{}/admin/oauth/authorize?client_id={}&scope={}&redirect_uri={}&state={}",
            shop.as_str(),
            urlencoding::encode(&self.inner.api_key),
            urlencoding::encode(&scope),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(state)
        )
    }

    /// Exchange an authorization code for an offline access token.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::Unauthorized` if Shopify rejects the exchange.
    /// Returns `ShopifyError::Http` if the HTTP request fails.
    #[instrument(skip(self, shop, code), fields(shop = %shop))]
    pub async fn exchange_code(
        &self,
        shop: &ShopDomain,
        code: &str,
    ) -> Result<AccessToken, ShopifyError> {
        let url = format!("https://{}/admin/oauth/access_token", shop.as_str());

        let params = [
            ("client_id", self.inner.api_key.as_str()),
            ("client_secret", self.inner.api_secret.expose_secret()),
            ("code", code),
        ];

        let response = self.inner.client.post(&url).form(&params).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ShopifyError::Unauthorized(format!(
                "Token exchange failed ({status}): {text}"
            )));
        }

        let token_response: OAuthTokenResponse = response.json().await?;

        Ok(AccessToken {
            access_token: SecretString::from(token_response.access_token),
            scopes: token_response
                .scope
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
        })
    }
}

// =============================================================================
// AdminClient
// =============================================================================

/// Shopify Admin API GraphQL client bound to one shop.
#[derive(Clone)]
pub struct AdminClient {
    inner: Arc<AdminClientInner>,
}

struct AdminClientInner {
    client: reqwest::Client,
    endpoint: String,
    shop: ShopDomain,
    access_token: SecretString,
}

impl std::fmt::Debug for AdminClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminClient")
            .field("shop", &self.inner.shop)
            .field("endpoint", &self.inner.endpoint)
            .finish_non_exhaustive()
    }
}

/// GraphQL response wrapper.
#[derive(Debug, Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQLErrorResponse>>,
}

#[derive(Debug, Deserialize)]
struct GraphQLErrorResponse {
    message: String,
    #[serde(default)]
    path: Vec<serde_json::Value>,
}

impl AdminClient {
    /// The shop this client talks to.
    #[must_use]
    pub fn shop(&self) -> &ShopDomain {
        &self.inner.shop
    }

    // =========================================================================
    // GraphQL Execution
    // =========================================================================

    /// Execute a GraphQL operation.
    pub(super) async fn execute<Q: GraphQLQuery>(
        &self,
        variables: Q::Variables,
    ) -> Result<Q::ResponseData, ShopifyError>
    where
        Q::ResponseData: DeserializeOwned,
    {
        self.execute_raw::<Q>(variables).await.map(|(data, _)| data)
    }

    /// Execute a GraphQL operation and also return the raw response body.
    pub(super) async fn execute_raw<Q: GraphQLQuery>(
        &self,
        variables: Q::Variables,
    ) -> Result<(Q::ResponseData, serde_json::Value), ShopifyError>
    where
        Q::ResponseData: DeserializeOwned,
    {
        let body = Q::build_query(variables);

        let response = self
            .inner
            .client
            .post(&self.inner.endpoint)
            .header(
                "X-Shopify-Access-Token",
                self.inner.access_token.expose_secret(),
            )
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        // Check for rate limiting
        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.split('.').next())
                .and_then(|s| s.parse().ok())
                .unwrap_or(2);
            return Err(ShopifyError::RateLimited(retry_after));
        }

        // Check for unauthorized
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ShopifyError::Unauthorized(
                "Invalid or revoked access token".to_string(),
            ));
        }

        if !response.status().is_success() {
            return Err(ShopifyError::UnexpectedResponse(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let raw: serde_json::Value = response.json().await?;
        let data = parse_graphql_response::<Q::ResponseData>(&raw)?;
        Ok((data, raw))
    }
}

/// Decode a GraphQL response body into typed data.
///
/// A non-empty top-level `errors` array wins over any partial `data`.
fn parse_graphql_response<T: DeserializeOwned>(raw: &serde_json::Value) -> Result<T, ShopifyError> {
    let graphql_response: GraphQLResponse<T> = serde_json::from_value(raw.clone())?;

    if let Some(errors) = graphql_response.errors
        && !errors.is_empty()
    {
        let converted_errors: Vec<GraphQLError> = errors
            .into_iter()
            .map(|e| GraphQLError {
                message: e.message,
                path: e.path,
            })
            .collect();
        return Err(ShopifyError::GraphQL(converted_errors));
    }

    graphql_response.data.ok_or_else(|| {
        ShopifyError::GraphQL(vec![GraphQLError {
            message: "No data in response".to_string(),
            path: vec![],
        }])
    })
}
