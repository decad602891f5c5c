//! Shopify Admin API access for installed shops.
//!
//! # Architecture
//!
//! - [`ShopifyApp`] holds the app credentials and the shared HTTP client. It
//!   runs the OAuth install flow and hands out per-shop clients.
//! - [`AdminClient`] is bound to one shop and its offline access token and
//!   executes typed GraphQL operations generated by `graphql_client`.
//! - [`BillingApi`] and [`MetafieldDefinitionApi`] are the seams the service
//!   layer calls, so services can be exercised without a network.
//!
//! # Example
//!
//! ```rust,ignore
//! let client = state.shopify().admin_client(&shop, &session.access_token);
//! let subscriptions = client.get_active_subscriptions().await?;
//! ```

mod billing;
mod client;
mod metafields;
pub mod queries;
pub mod types;
pub mod verify;

use std::future::Future;

pub use client::{AccessToken, AdminClient, ShopifyApp};
pub use types::*;

use thiserror::Error;

/// Errors that can occur when interacting with the Shopify Admin API.
#[derive(Debug, Error)]
pub enum ShopifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// GraphQL query returned errors.
    #[error("GraphQL errors: {}", format_graphql_errors(.0))]
    GraphQL(Vec<GraphQLError>),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Rate limited by Shopify.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Authentication/authorization failed.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User error from a mutation (e.g., invalid input).
    #[error("User error: {0}")]
    UserError(String),

    /// The response was well-formed but not what the operation promises.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

/// A GraphQL error returned by the Shopify Admin API.
#[derive(Debug, Clone)]
pub struct GraphQLError {
    /// Error message.
    pub message: String,
    /// Path to the error in the response.
    pub path: Vec<serde_json::Value>,
}

fn format_graphql_errors(errors: &[GraphQLError]) -> String {
    errors
        .iter()
        .map(|e| e.message.clone())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Join mutation `userErrors` into a single `field: message; ...` string.
pub(crate) fn join_user_errors(errors: &[UserError]) -> String {
    errors
        .iter()
        .map(|e| {
            if e.field.is_empty() {
                e.message.clone()
            } else {
                format!("{}: {}", e.field.join("."), e.message)
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

// =============================================================================
// Service seams
// =============================================================================

/// Billing operations against the Shopify app subscription API.
pub trait BillingApi {
    /// Active app subscriptions of the current installation.
    fn active_subscriptions(
        &self,
    ) -> impl Future<Output = Result<Vec<AppSubscription>, ShopifyError>> + Send;

    /// Cancel a subscription by GID. Returns the cancelled subscription.
    fn cancel_subscription(
        &self,
        subscription_id: &str,
        prorate: bool,
    ) -> impl Future<Output = Result<AppSubscription, ShopifyError>> + Send;

    /// Create a recurring subscription. Returns the merchant confirmation URL.
    fn create_subscription(
        &self,
        request: &SubscriptionRequest,
    ) -> impl Future<Output = Result<String, ShopifyError>> + Send;
}

/// Metafield definition operations.
pub trait MetafieldDefinitionApi {
    /// Run `metafieldDefinitionCreate`.
    ///
    /// `userErrors` are part of a successful response, not an error.
    fn create_metafield_definition(
        &self,
        input: &MetafieldDefinitionInput,
    ) -> impl Future<Output = Result<MetafieldDefinitionCreateResponse, ShopifyError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graphql_error_formatting() {
        let errors = vec![
            GraphQLError {
                message: "Field not found".to_string(),
                path: vec![],
            },
            GraphQLError {
                message: "Access denied".to_string(),
                path: vec![],
            },
        ];
        let err = ShopifyError::GraphQL(errors);
        assert_eq!(
            err.to_string(),
            "GraphQL errors: Field not found; Access denied"
        );
    }

    #[test]
    fn test_rate_limited_error() {
        let err = ShopifyError::RateLimited(2);
        assert_eq!(err.to_string(), "Rate limited, retry after 2 seconds");
    }

    #[test]
    fn test_join_user_errors() {
        let errors = vec![
            UserError {
                field: vec!["definition".to_string(), "key".to_string()],
                message: "Key is taken".to_string(),
                code: Some("TAKEN".to_string()),
            },
            UserError {
                field: vec![],
                message: "Limit reached".to_string(),
                code: None,
            },
        ];
        assert_eq!(
            join_user_errors(&errors),
            "definition.key: Key is taken; Limit reached"
        );
    }
}
