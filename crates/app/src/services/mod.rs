//! Application services.
//!
//! Each flow is a function generic over the collaborator traits in
//! [`crate::shopify`] and [`crate::db`], so it can run against the real
//! Admin API and Postgres or against in-memory fakes.

pub mod billing;
pub mod entitlement;
pub mod metafields;

pub use billing::{
    BillingError, CancelOutcome, UpgradeOutcome, cancel_active_subscription, request_upgrade,
};
pub use entitlement::{
    EntitlementResolver, Entitlements, pricing_redirect, pricing_redirect_with_error, with_query,
};
pub use metafields::{
    MetafieldCreationForm, MetafieldCreationResponse, MetafieldCreationResult,
    create_metafield_definition,
};
