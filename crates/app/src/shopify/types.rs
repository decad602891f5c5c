//! Domain types for Shopify Admin API responses and inputs.
//!
//! These are decoupled from the `graphql_client` generated types so the
//! service layer and its fakes never touch generated code.

use metaplan_core::{MetafieldOwnerType, MetafieldType};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An app subscription as returned by billing queries and mutations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSubscription {
    /// Shopify GID.
    pub id: String,
    /// Subscription name, exactly as registered.
    pub name: String,
    /// Whether this is a test charge.
    pub test: bool,
}

/// Recurring billing interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingInterval {
    Every30Days,
    Annual,
}

/// Parameters for `appSubscriptionCreate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRequest {
    /// Subscription name; identifies the plan on later checks.
    pub name: String,
    pub price: Decimal,
    /// ISO 4217 currency code.
    pub currency: String,
    pub interval: BillingInterval,
    /// Where Shopify sends the merchant after approval.
    pub return_url: String,
    pub test: bool,
    pub trial_days: u32,
}

/// A mutation `userErrors` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserError {
    /// Path to the offending input field.
    pub field: Vec<String>,
    pub message: String,
    /// Machine readable error code, when the mutation provides one.
    pub code: Option<String>,
}

/// Input for `metafieldDefinitionCreate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetafieldDefinitionInput {
    pub name: String,
    pub namespace: String,
    pub key: String,
    pub description: String,
    pub value_type: MetafieldType,
    pub owner_type: MetafieldOwnerType,
}

/// A metafield definition created on Shopify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteMetafieldDefinition {
    /// Shopify GID.
    pub id: String,
    pub name: String,
    pub namespace: String,
    pub key: String,
}

/// Outcome of `metafieldDefinitionCreate`.
#[derive(Debug, Clone, PartialEq)]
pub struct MetafieldDefinitionCreateResponse {
    /// The created definition, absent when `user_errors` is non-empty.
    pub created: Option<RemoteMetafieldDefinition>,
    pub user_errors: Vec<UserError>,
    /// The full GraphQL response body.
    pub raw: serde_json::Value,
}
