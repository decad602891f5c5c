//! Plan entitlement resolution.
//!
//! Every page and guard decides what a shop may do through [`Entitlements`].
//! Nothing here is cached: each call asks Shopify billing.

use std::future::Future;

use metaplan_core::{ActiveSubscription, Plan, PlanState};
use tracing::instrument;

use crate::shopify::{AppSubscription, BillingApi, ShopifyError};

/// Resolves the current plan of a shop.
pub trait EntitlementResolver {
    fn resolve_entitlement(&self) -> impl Future<Output = Result<PlanState, ShopifyError>> + Send;
}

/// Entitlement check against a fixed plan set.
pub struct Entitlements<'a, B> {
    billing: &'a B,
    plans: &'a [Plan],
    is_test: bool,
}

impl<'a, B: BillingApi + Sync> Entitlements<'a, B> {
    /// `is_test` decides whether test charges count as active.
    #[must_use]
    pub const fn new(billing: &'a B, plans: &'a [Plan], is_test: bool) -> Self {
        Self {
            billing,
            plans,
            is_test,
        }
    }

    /// Query billing and reduce the active subscriptions to a [`PlanState`].
    ///
    /// # Errors
    ///
    /// Returns the billing error unchanged.
    #[instrument(skip(self), fields(is_test = self.is_test))]
    pub async fn resolve(&self) -> Result<PlanState, ShopifyError> {
        let subscriptions = self.billing.active_subscriptions().await?;
        let state = select_plan(subscriptions, self.plans, self.is_test);
        tracing::debug!(plan = %state.plan(), "Resolved entitlement");
        Ok(state)
    }
}

impl<B: BillingApi + Sync> EntitlementResolver for Entitlements<'_, B> {
    async fn resolve_entitlement(&self) -> Result<PlanState, ShopifyError> {
        self.resolve().await
    }
}

/// Pick the first subscription whose name maps to a plan in `plans`.
fn select_plan(subscriptions: Vec<AppSubscription>, plans: &[Plan], is_test: bool) -> PlanState {
    subscriptions
        .into_iter()
        .filter(|sub| is_test || !sub.test)
        .find_map(|sub| {
            let plan = Plan::from_subscription_name(&sub.name)?;
            plans.contains(&plan).then(|| {
                PlanState::Subscribed(ActiveSubscription {
                    id: sub.id,
                    name: sub.name,
                    plan,
                    test: sub.test,
                })
            })
        })
        .unwrap_or_default()
}

/// Append a raw query string to a path, keeping it byte-for-byte.
///
/// Accepts the query with or without its leading `?`.
#[must_use]
pub fn with_query(path: &str, query: Option<&str>) -> String {
    match query.map(|q| q.strip_prefix('?').unwrap_or(q)) {
        Some(q) if !q.is_empty() => format!("{path}?{q}"),
        _ => path.to_string(),
    }
}

/// Where a shop without a paid plan is sent.
#[must_use]
pub fn pricing_redirect(query: Option<&str>) -> String {
    with_query("/app/pricing", query)
}

/// Pricing URL with a `billing_error` code appended to the original query.
#[must_use]
pub fn pricing_redirect_with_error(query: Option<&str>, code: &str) -> String {
    let error = format!("billing_error={code}");
    match query.filter(|q| !q.is_empty()) {
        Some(q) => pricing_redirect(Some(&format!("{q}&{error}"))),
        None => pricing_redirect(Some(&error)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(id: &str, name: &str, test: bool) -> AppSubscription {
        AppSubscription {
            id: id.to_string(),
            name: name.to_string(),
            test,
        }
    }

    #[test]
    fn test_no_subscriptions_is_free() {
        assert_eq!(select_plan(vec![], &Plan::PAID, true), PlanState::Free);
    }

    #[test]
    fn test_matching_subscription_passes_through() {
        let state = select_plan(
            vec![sub("gid://shopify/AppSubscription/1", "Monthly subscription", true)],
            &Plan::PAID,
            true,
        );
        assert_eq!(state.plan(), Plan::Monthly);
        assert_eq!(state.name(), "Monthly subscription");
        assert_eq!(state.subscription_id(), Some("gid://shopify/AppSubscription/1"));
    }

    #[test]
    fn test_unknown_names_are_ignored() {
        let state = select_plan(
            vec![
                sub("gid://shopify/AppSubscription/1", "Legacy gold", false),
                sub("gid://shopify/AppSubscription/2", "Annual subscription", false),
            ],
            &Plan::PAID,
            false,
        );
        assert_eq!(state.plan(), Plan::Annual);
        assert_eq!(state.subscription_id(), Some("gid://shopify/AppSubscription/2"));
    }

    #[test]
    fn test_test_charges_ignored_in_live_mode() {
        let subs = vec![sub("gid://shopify/AppSubscription/1", "Monthly subscription", true)];
        assert_eq!(select_plan(subs, &Plan::PAID, false), PlanState::Free);
    }

    #[test]
    fn test_plan_outside_set_is_free() {
        let subs = vec![sub("gid://shopify/AppSubscription/1", "Annual subscription", false)];
        assert_eq!(select_plan(subs, &[Plan::Monthly], false), PlanState::Free);
    }

    #[test]
    fn test_pricing_redirect_preserves_query() {
        assert_eq!(
            pricing_redirect(Some("shop=s.myshopify.com&host=YWJj%3D&embedded=1")),
            "/app/pricing?shop=s.myshopify.com&host=YWJj%3D&embedded=1"
        );
        assert_eq!(pricing_redirect(Some("?a=1")), "/app/pricing?a=1");
        assert_eq!(pricing_redirect(Some("")), "/app/pricing");
        assert_eq!(pricing_redirect(None), "/app/pricing");
    }

    #[test]
    fn test_pricing_redirect_with_error_keeps_query() {
        assert_eq!(
            pricing_redirect_with_error(Some("shop=s.myshopify.com&host=abc"), "cancel_failed"),
            "/app/pricing?shop=s.myshopify.com&host=abc&billing_error=cancel_failed"
        );
        assert_eq!(
            pricing_redirect_with_error(None, "upgrade_failed"),
            "/app/pricing?billing_error=upgrade_failed"
        );
        assert_eq!(
            pricing_redirect_with_error(Some(""), "upgrade_failed"),
            "/app/pricing?billing_error=upgrade_failed"
        );
    }
}
