//! Billing plans and entitlement state.
//!
//! Shopify identifies an app subscription by the `name` it was created with,
//! so the paid plans here carry the exact subscription names used when the
//! merchant approves a charge. Everything else in the app compares [`Plan`]
//! values instead of those strings.

use core::fmt;

use serde::{Deserialize, Serialize};

/// A pricing plan offered by the app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    /// No active subscription.
    #[default]
    Free,
    /// Recurring charge every 30 days.
    Monthly,
    /// Recurring yearly charge.
    Annual,
}

impl Plan {
    /// The plans that require an active Shopify subscription.
    ///
    /// This is the plan set passed to every billing check.
    pub const PAID: [Self; 2] = [Self::Monthly, Self::Annual];

    /// All plans in display order.
    pub const ALL: [Self; 3] = [Self::Free, Self::Monthly, Self::Annual];

    /// The subscription name as registered with Shopify billing.
    #[must_use]
    pub const fn subscription_name(self) -> &'static str {
        match self {
            Self::Free => "Free",
            Self::Monthly => "Monthly subscription",
            Self::Annual => "Annual subscription",
        }
    }

    /// Map a Shopify subscription name back to a plan (exact match).
    #[must_use]
    pub fn from_subscription_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|plan| plan.subscription_name() == name)
    }

    /// URL/CSS friendly identifier.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Monthly => "monthly",
            Self::Annual => "annual",
        }
    }

    /// Whether this plan is backed by a paid subscription.
    #[must_use]
    pub const fn is_paid(self) -> bool {
        matches!(self, Self::Monthly | Self::Annual)
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl std::str::FromStr for Plan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Self::Free),
            "monthly" => Ok(Self::Monthly),
            "annual" => Ok(Self::Annual),
            _ => Err(format!("invalid plan: {s}")),
        }
    }
}

/// An active app subscription as reported by Shopify billing.
///
/// This is a transient mirror: the app never stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveSubscription {
    /// Shopify GID (e.g., `gid://shopify/AppSubscription/123`).
    pub id: String,
    /// Subscription name exactly as returned by Shopify.
    pub name: String,
    /// Plan the name maps to.
    pub plan: Plan,
    /// Whether this is a test charge.
    pub test: bool,
}

/// Entitlement of a shop: either the free sentinel or an active subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PlanState {
    /// No active subscription in the configured plan set.
    #[default]
    Free,
    /// An active paid subscription.
    Subscribed(ActiveSubscription),
}

impl PlanState {
    /// The plan the shop is on.
    #[must_use]
    pub const fn plan(&self) -> Plan {
        match self {
            Self::Free => Plan::Free,
            Self::Subscribed(sub) => sub.plan,
        }
    }

    /// Display name: `"Free"` or the subscription name unchanged.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Free => Plan::Free.subscription_name(),
            Self::Subscribed(sub) => &sub.name,
        }
    }

    /// Remote subscription ID, if subscribed.
    #[must_use]
    pub fn subscription_id(&self) -> Option<&str> {
        match self {
            Self::Free => None,
            Self::Subscribed(sub) => Some(&sub.id),
        }
    }

    /// The active subscription, if any.
    #[must_use]
    pub const fn subscription(&self) -> Option<&ActiveSubscription> {
        match self {
            Self::Free => None,
            Self::Subscribed(sub) => Some(sub),
        }
    }

    /// Whether the shop has an active paid subscription.
    #[must_use]
    pub const fn is_paid(&self) -> bool {
        matches!(self, Self::Subscribed(_))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_subscription_names() {
        assert_eq!(Plan::Free.subscription_name(), "Free");
        assert_eq!(Plan::Monthly.subscription_name(), "Monthly subscription");
        assert_eq!(Plan::Annual.subscription_name(), "Annual subscription");
    }

    #[test]
    fn test_from_subscription_name_is_exact() {
        assert_eq!(
            Plan::from_subscription_name("Monthly subscription"),
            Some(Plan::Monthly)
        );
        assert_eq!(
            Plan::from_subscription_name("Annual subscription"),
            Some(Plan::Annual)
        );
        assert_eq!(Plan::from_subscription_name("monthly subscription"), None);
        assert_eq!(Plan::from_subscription_name("Enterprise"), None);
    }

    #[test]
    fn test_paid_plans() {
        assert!(!Plan::Free.is_paid());
        assert!(Plan::Monthly.is_paid());
        assert!(Plan::Annual.is_paid());
        assert!(Plan::PAID.iter().all(|p| p.is_paid()));
    }

    #[test]
    fn test_from_str_and_display() {
        for plan in Plan::ALL {
            let parsed: Plan = plan.to_string().parse().unwrap();
            assert_eq!(parsed, plan);
        }
        assert!("gold".parse::<Plan>().is_err());
    }

    #[test]
    fn test_free_state() {
        let state = PlanState::Free;
        assert_eq!(state.plan(), Plan::Free);
        assert_eq!(state.name(), "Free");
        assert_eq!(state.subscription_id(), None);
        assert!(!state.is_paid());
    }

    #[test]
    fn test_subscribed_state_passes_remote_values_through() {
        let state = PlanState::Subscribed(ActiveSubscription {
            id: "gid://shopify/AppSubscription/9".to_string(),
            name: "Annual subscription".to_string(),
            plan: Plan::Annual,
            test: true,
        });
        assert_eq!(state.plan(), Plan::Annual);
        assert_eq!(state.name(), "Annual subscription");
        assert_eq!(
            state.subscription_id(),
            Some("gid://shopify/AppSubscription/9")
        );
        assert!(state.is_paid());
    }

    #[test]
    fn test_plan_state_serde_tag() {
        let json = serde_json::to_value(PlanState::Free).unwrap();
        assert_eq!(json, serde_json::json!({ "state": "free" }));
    }
}
