//! Subscription cancel and upgrade handlers.
//!
//! Billing failures never surface as error pages. The merchant is sent back
//! to the pricing page with a `billing_error` code added to the original
//! query string.

use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use metaplan_core::Plan;
use tracing::instrument;

use crate::middleware::ShopSession;
use crate::services::{
    CancelOutcome, UpgradeOutcome, cancel_active_subscription, pricing_redirect,
    pricing_redirect_with_error, request_upgrade,
};
use crate::state::AppState;

use super::top_level_redirect;

/// GET /app/cancel - Cancel the active subscription.
///
/// Always answers with a 303 redirect to the pricing page.
#[instrument(skip(state, session), fields(shop = %session.shop))]
pub async fn cancel(State(state): State<AppState>, session: ShopSession) -> Redirect {
    let query = session.query.as_deref();

    match cancel_active_subscription(&session.client, &Plan::PAID, state.config().billing.test)
        .await
    {
        Ok(CancelOutcome::Cancelled { id, .. }) => {
            tracing::info!(subscription_id = %id, "Plan cancelled from pricing page");
            Redirect::to(&pricing_redirect(query))
        }
        Ok(CancelOutcome::NoSubscription) => Redirect::to(&pricing_redirect(query)),
        Err(e) => {
            tracing::warn!(error = %e, "Subscription cancel failed");
            Redirect::to(&pricing_redirect_with_error(query, "cancel_failed"))
        }
    }
}

/// GET /app/upgrade - Subscribe to the monthly plan.
pub async fn upgrade_monthly(state: State<AppState>, session: ShopSession) -> Response {
    upgrade(state, session, Plan::Monthly).await
}

/// GET /app/upgrade-annual - Subscribe to the annual plan.
pub async fn upgrade_annual(state: State<AppState>, session: ShopSession) -> Response {
    upgrade(state, session, Plan::Annual).await
}

#[instrument(skip(state, session), fields(shop = %session.shop))]
async fn upgrade(State(state): State<AppState>, session: ShopSession, plan: Plan) -> Response {
    let config = state.config();
    let query = session.query.as_deref();

    // Shopify returns the merchant to the embedded app after approval.
    let return_url = format!(
        "{}/admin/apps/{}/app/pricing",
        session.shop.origin(),
        config.shopify.api_key
    );

    match request_upgrade(&session.client, &config.billing, plan, &return_url).await {
        Ok(UpgradeOutcome::ConfirmationRequired { confirmation_url }) => {
            top_level_redirect(&config.shopify.api_key, &confirmation_url).into_response()
        }
        Ok(UpgradeOutcome::AlreadySubscribed) => {
            Redirect::to(&pricing_redirect(query)).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, %plan, "Subscription request failed");
            Redirect::to(&pricing_redirect_with_error(query, "upgrade_failed")).into_response()
        }
    }
}
