//! Pricing page.
//!
//! Shows the current plan, the plan catalog, and which features each plan
//! unlocks. All links keep the embedded query string (`shop`, `host`, ...).

use askama::Template;
use axum::{
    extract::{Query, State},
    response::Html,
};
use metaplan_core::{Plan, PlanState};
use serde::Deserialize;
use tracing::instrument;

use crate::config::BillingSettings;
use crate::middleware::{PLAN_UNAVAILABLE, ShopSession};
use crate::services::Entitlements;
use crate::state::AppState;

use super::render;

/// Static description of a plan card.
struct CatalogEntry {
    plan: Plan,
    title: &'static str,
    subtitle: &'static str,
    cadence: &'static str,
    cta_label: &'static str,
    cta_path: Option<&'static str>,
    highlight: bool,
    features: [&'static str; 5],
}

const CATALOG: [CatalogEntry; 3] = [
    CatalogEntry {
        plan: Plan::Free,
        title: "Free",
        subtitle: "Good for getting started",
        cadence: "forever",
        cta_label: "Current plan",
        cta_path: None,
        highlight: false,
        features: [
            "100 wishlist per day",
            "500 products",
            "Basic customization",
            "Basic support",
            "Basic analytics",
        ],
    },
    CatalogEntry {
        plan: Plan::Monthly,
        title: "Pro",
        subtitle: "For growing stores",
        cadence: "/month",
        cta_label: "Upgrade to Pro",
        cta_path: Some("/app/upgrade"),
        highlight: true,
        features: [
            "Unlimited wishlist per day",
            "10,000 products",
            "Advanced customization",
            "Priority support",
            "Advanced analytics",
        ],
    },
    CatalogEntry {
        plan: Plan::Annual,
        title: "Pro Annual",
        subtitle: "Best value (save more)",
        cadence: "/year",
        cta_label: "Upgrade to Annual",
        cta_path: Some("/app/upgrade-annual"),
        highlight: false,
        features: [
            "Everything in Pro",
            "Faster support SLA",
            "Early access features",
            "Advanced reporting",
            "Annual billing discount",
        ],
    },
];

/// Features gated behind a paid plan.
const GATED_FEATURES: [&str; 2] = ["QR Code Converter", "Metafield Creation"];

/// A plan card as rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanCard {
    pub slug: &'static str,
    pub title: &'static str,
    pub subtitle: &'static str,
    pub price: String,
    pub cadence: &'static str,
    pub features: Vec<&'static str>,
    pub highlight: bool,
    pub is_current: bool,
    /// `Current`, `Popular`, or nothing.
    pub badge: Option<&'static str>,
    pub cta_label: &'static str,
    /// `None` renders a disabled button.
    pub cta_href: Option<String>,
    pub show_approval_note: bool,
}

/// Whether a gated feature is available on the current plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureAccess {
    pub name: &'static str,
    pub enabled: bool,
}

/// Everything the pricing template needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricingView {
    pub plan_name: String,
    pub is_paid: bool,
    pub cancel_href: Option<String>,
    pub cards: Vec<PlanCard>,
    pub features: Vec<FeatureAccess>,
    pub billing_error: Option<&'static str>,
}

/// Message for a `billing_error` query code.
fn billing_error_message(code: &str) -> &'static str {
    match code {
        "cancel_failed" => "We couldn't cancel your subscription. Please try again.",
        "upgrade_failed" => "We couldn't start the subscription. Please try again.",
        PLAN_UNAVAILABLE => {
            "We couldn't check your subscription with Shopify. Paid features stay locked until it can be checked."
        }
        _ => "The billing request failed. Please try again.",
    }
}

/// Build the pricing view for a shop's current plan.
///
/// `search` is the request's `?query` (or empty) and is appended to every
/// in-app link.
#[must_use]
pub fn pricing_view(
    plan: &PlanState,
    billing: &BillingSettings,
    search: &str,
    billing_error: Option<&str>,
) -> PricingView {
    let is_paid = plan.is_paid();
    let current_name = plan.name();

    let cards = CATALOG
        .iter()
        .map(|entry| {
            let is_current = entry.plan.subscription_name() == current_name;
            let badge = if is_current {
                Some("Current")
            } else if entry.highlight {
                Some("Popular")
            } else {
                None
            };
            let (cta_label, cta_href) = if is_current {
                ("Current plan", None)
            } else {
                (
                    entry.cta_label,
                    entry.cta_path.map(|path| format!("{path}{search}")),
                )
            };

            PlanCard {
                slug: entry.plan.slug(),
                title: entry.title,
                subtitle: entry.subtitle,
                price: billing.price_label(entry.plan),
                cadence: entry.cadence,
                features: entry.features.to_vec(),
                highlight: entry.highlight,
                is_current,
                badge,
                cta_label,
                cta_href,
                show_approval_note: !is_paid && entry.plan.is_paid(),
            }
        })
        .collect();

    PricingView {
        plan_name: current_name.to_string(),
        is_paid,
        cancel_href: is_paid.then(|| format!("/app/cancel{search}")),
        cards,
        features: GATED_FEATURES
            .iter()
            .map(|&name| FeatureAccess {
                name,
                enabled: is_paid,
            })
            .collect(),
        billing_error: billing_error.map(billing_error_message),
    }
}

/// Query parameters read by the pricing page.
#[derive(Debug, Deserialize)]
pub struct PricingQuery {
    pub billing_error: Option<String>,
}

/// Pricing page template.
#[derive(Template)]
#[template(path = "app/pricing.html")]
pub struct PricingTemplate {
    pub api_key: String,
    pub search: String,
    pub view: PricingView,
}

/// GET /app/pricing - Pricing page.
///
/// If billing cannot be reached the page still renders, as Free and with an
/// error banner.
#[instrument(skip(state, session, query), fields(shop = %session.shop))]
pub async fn index(
    State(state): State<AppState>,
    session: ShopSession,
    Query(query): Query<PricingQuery>,
) -> Html<String> {
    let config = state.config();
    let (plan, plan_error) = match Entitlements::new(&session.client, &Plan::PAID, config.billing.test)
        .resolve()
        .await
    {
        Ok(plan) => (plan, None),
        Err(e) => {
            tracing::warn!(error = %e, "Entitlement check failed on pricing page");
            (PlanState::Free, Some(PLAN_UNAVAILABLE))
        }
    };

    let search = session.search();
    let view = pricing_view(
        &plan,
        &config.billing,
        &search,
        plan_error.or(query.billing_error.as_deref()),
    );

    render(&PricingTemplate {
        api_key: config.shopify.api_key.clone(),
        search,
        view,
    })
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use metaplan_core::ActiveSubscription;

    use super::*;

    const SEARCH: &str = "?shop=store.myshopify.com&host=abc";

    fn subscribed(plan: Plan) -> PlanState {
        PlanState::Subscribed(ActiveSubscription {
            id: "gid://shopify/AppSubscription/7".to_string(),
            name: plan.subscription_name().to_string(),
            plan,
            test: true,
        })
    }

    #[test]
    fn test_free_view() {
        let view = pricing_view(&PlanState::Free, &BillingSettings::default(), SEARCH, None);

        assert_eq!(view.plan_name, "Free");
        assert!(!view.is_paid);
        assert_eq!(view.cancel_href, None);
        assert!(view.features.iter().all(|f| !f.enabled));

        let prices: Vec<_> = view.cards.iter().map(|c| c.price.as_str()).collect();
        assert_eq!(prices, ["₹0", "₹10", "₹100"]);

        let free = &view.cards[0];
        assert!(free.is_current);
        assert_eq!(free.badge, Some("Current"));
        assert_eq!(free.cta_href, None);
        assert!(!free.show_approval_note);

        let pro = &view.cards[1];
        assert_eq!(pro.badge, Some("Popular"));
        assert_eq!(pro.cta_label, "Upgrade to Pro");
        assert_eq!(
            pro.cta_href.as_deref(),
            Some("/app/upgrade?shop=store.myshopify.com&host=abc")
        );
        assert!(pro.show_approval_note);

        let annual = &view.cards[2];
        assert_eq!(annual.badge, None);
        assert_eq!(
            annual.cta_href.as_deref(),
            Some("/app/upgrade-annual?shop=store.myshopify.com&host=abc")
        );
    }

    #[test]
    fn test_annual_view() {
        let view = pricing_view(&subscribed(Plan::Annual), &BillingSettings::default(), SEARCH, None);

        assert_eq!(view.plan_name, "Annual subscription");
        assert!(view.is_paid);
        assert_eq!(
            view.cancel_href.as_deref(),
            Some("/app/cancel?shop=store.myshopify.com&host=abc")
        );
        assert!(view.features.iter().all(|f| f.enabled));

        let annual = &view.cards[2];
        assert!(annual.is_current);
        assert_eq!(annual.cta_label, "Current plan");
        assert_eq!(annual.cta_href, None);

        // Pro stays highlighted but is not current.
        assert_eq!(view.cards[1].badge, Some("Popular"));
        assert!(view.cards.iter().all(|c| !c.show_approval_note));
    }

    #[test]
    fn test_links_without_query() {
        let view = pricing_view(&subscribed(Plan::Monthly), &BillingSettings::default(), "", None);
        assert_eq!(view.cancel_href.as_deref(), Some("/app/cancel"));
        assert_eq!(view.cards[2].cta_href.as_deref(), Some("/app/upgrade-annual"));
    }

    #[test]
    fn test_billing_error_banner() {
        let view = pricing_view(
            &subscribed(Plan::Monthly),
            &BillingSettings::default(),
            "",
            Some("cancel_failed"),
        );
        assert_eq!(
            view.billing_error,
            Some("We couldn't cancel your subscription. Please try again.")
        );
    }

    #[test]
    fn test_plan_unavailable_banner() {
        let view = pricing_view(
            &PlanState::Free,
            &BillingSettings::default(),
            SEARCH,
            Some(PLAN_UNAVAILABLE),
        );
        assert_eq!(
            view.billing_error,
            Some(
                "We couldn't check your subscription with Shopify. Paid features stay locked until it can be checked."
            )
        );
        assert!(view.features.iter().all(|f| !f.enabled));
    }

    #[test]
    fn test_template_renders_free_state() {
        let template = PricingTemplate {
            api_key: "key-1".to_string(),
            search: SEARCH.to_string(),
            view: pricing_view(&PlanState::Free, &BillingSettings::default(), SEARCH, None),
        };
        let html = template.render().unwrap_or_default();

        assert!(html.contains("Upgrade to unlock premium features."));
        assert!(html.contains("Choose Pro to enable QR code tools and Metafield creation."));
        assert!(html.contains("approve the subscription inside Shopify."));
        assert!(html.contains("Locked"));
        assert!(!html.contains("href=\"/app/cancel"));
    }
}
