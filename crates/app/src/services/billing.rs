//! Subscription cancellation and upgrade.

use metaplan_core::{Plan, PlanState};
use thiserror::Error;
use tracing::instrument;

use crate::config::BillingSettings;
use crate::shopify::{BillingApi, BillingInterval, ShopifyError, SubscriptionRequest};

use super::entitlement::Entitlements;

/// Errors from billing flows.
#[derive(Debug, Error)]
pub enum BillingError {
    /// The plan has no subscription to buy.
    #[error("plan '{0}' cannot be purchased")]
    NotPurchasable(Plan),

    #[error(transparent)]
    Shopify(#[from] ShopifyError),
}

/// Result of a cancellation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The shop had no active subscription; nothing was called.
    NoSubscription,
    /// The subscription was cancelled with proration.
    Cancelled { id: String, name: String },
}

/// Result of an upgrade request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeOutcome {
    /// The shop is already on the requested plan.
    AlreadySubscribed,
    /// The merchant must approve the charge at this URL.
    ConfirmationRequired { confirmation_url: String },
}

/// Cancel the shop's active subscription, if any.
///
/// # Errors
///
/// Returns the billing error from either the lookup or the cancel call.
#[instrument(skip(billing))]
pub async fn cancel_active_subscription<B: BillingApi + Sync>(
    billing: &B,
    plans: &[Plan],
    is_test: bool,
) -> Result<CancelOutcome, ShopifyError> {
    let state = Entitlements::new(billing, plans, is_test).resolve().await?;

    let PlanState::Subscribed(subscription) = state else {
        tracing::info!("No active subscription to cancel");
        return Ok(CancelOutcome::NoSubscription);
    };

    billing.cancel_subscription(&subscription.id, true).await?;

    tracing::info!(
        subscription_id = %subscription.id,
        name = %subscription.name,
        "Subscription cancelled"
    );

    Ok(CancelOutcome::Cancelled {
        id: subscription.id,
        name: subscription.name,
    })
}

/// Request a subscription to a paid plan.
///
/// # Errors
///
/// Returns `BillingError::NotPurchasable` for the free plan, or the billing
/// error from Shopify.
#[instrument(skip(billing, settings, return_url))]
pub async fn request_upgrade<B: BillingApi + Sync>(
    billing: &B,
    settings: &BillingSettings,
    plan: Plan,
    return_url: &str,
) -> Result<UpgradeOutcome, BillingError> {
    let interval = match plan {
        Plan::Free => return Err(BillingError::NotPurchasable(plan)),
        Plan::Monthly => BillingInterval::Every30Days,
        Plan::Annual => BillingInterval::Annual,
    };

    let current = Entitlements::new(billing, &Plan::PAID, settings.test)
        .resolve()
        .await?;
    if current.plan() == plan {
        return Ok(UpgradeOutcome::AlreadySubscribed);
    }

    let request = SubscriptionRequest {
        name: plan.subscription_name().to_string(),
        price: settings.price(plan),
        currency: settings.currency.clone(),
        interval,
        return_url: return_url.to_string(),
        test: settings.test,
        trial_days: settings.trial_days,
    };

    let confirmation_url = billing.create_subscription(&request).await?;
    tracing::info!(%plan, "Subscription requested, awaiting merchant approval");

    Ok(UpgradeOutcome::ConfirmationRequired { confirmation_url })
}
