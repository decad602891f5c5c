//! App home page.

use askama::Template;
use axum::{extract::State, response::Html};
use metaplan_core::{Plan, PlanState};
use tracing::instrument;

use crate::middleware::ShopSession;
use crate::services::Entitlements;
use crate::state::AppState;

use super::render;

/// Home page template.
#[derive(Template)]
#[template(path = "app/home.html")]
pub struct HomeTemplate {
    pub api_key: String,
    pub search: String,
    pub shop: String,
    pub plan_name: String,
    pub is_paid: bool,
    /// Shown when the plan could not be checked.
    pub notice: Option<&'static str>,
}

const PLAN_CHECK_FAILED: &str =
    "We couldn't check your plan with Shopify right now. Paid features stay locked until it can be checked.";

impl HomeTemplate {
    fn new(api_key: String, search: String, shop: String, plan: Option<&PlanState>) -> Self {
        let (plan_name, is_paid, notice) = match plan {
            Some(plan) => (plan.name().to_string(), plan.is_paid(), None),
            None => ("Unknown".to_string(), false, Some(PLAN_CHECK_FAILED)),
        };
        Self {
            api_key,
            search,
            shop,
            plan_name,
            is_paid,
            notice,
        }
    }
}

/// GET /app - Home page.
#[instrument(skip(state, session), fields(shop = %session.shop))]
pub async fn index(State(state): State<AppState>, session: ShopSession) -> Html<String> {
    let plan = Entitlements::new(&session.client, &Plan::PAID, state.config().billing.test)
        .resolve()
        .await
        .inspect_err(|e| tracing::warn!(error = %e, "Entitlement check failed on home page"))
        .ok();

    render(&HomeTemplate::new(
        state.config().shopify.api_key.clone(),
        session.search(),
        session.shop.to_string(),
        plan.as_ref(),
    ))
}
