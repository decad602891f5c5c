//! GraphQL operation definitions for the Shopify Admin API.
//!
//! Uses `graphql_client` to generate typed request and response code from
//! the curated schema in `graphql/admin/schema.graphql`.

use graphql_client::GraphQLQuery;

// =============================================================================
// Custom scalar type aliases (used by graphql_client)
// =============================================================================

/// Decimal number as string (preserves precision).
type Decimal = String;

/// URL string.
#[allow(clippy::upper_case_acronyms)]
type URL = String;

// =============================================================================
// Billing
// =============================================================================

#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/admin/schema.graphql",
    query_path = "graphql/admin/queries/billing.graphql",
    response_derives = "Debug, Clone"
)]
pub struct ActiveSubscriptions;

#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/admin/schema.graphql",
    query_path = "graphql/admin/queries/billing.graphql",
    response_derives = "Debug, Clone"
)]
pub struct AppSubscriptionCancel;

#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/admin/schema.graphql",
    query_path = "graphql/admin/queries/billing.graphql",
    response_derives = "Debug, Clone"
)]
pub struct AppSubscriptionCreate;

// =============================================================================
// Metafields
// =============================================================================

#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/admin/schema.graphql",
    query_path = "graphql/admin/queries/metafields.graphql",
    response_derives = "Debug, Clone"
)]
pub struct CreateMetafieldDefinition;
