//! Integration tests for Metaplan.
//!
//! The services in `metaplan_app::services` are generic over the Shopify and
//! storage traits. This crate provides in-memory implementations of those
//! traits so the billing, entitlement and metafield flows can be exercised
//! end to end without Shopify or `PostgreSQL`.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p metaplan-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::Utc;
use metaplan_app::config::{AppConfig, BillingSettings, ShopifyAppConfig};
use metaplan_app::db::{
    MetafieldDefinition, MetafieldMirrorStore, NewMetafieldDefinition, RepositoryError,
};
use metaplan_app::shopify::{
    AppSubscription, BillingApi, MetafieldDefinitionApi, MetafieldDefinitionCreateResponse,
    MetafieldDefinitionInput, ShopifyError, SubscriptionRequest,
};
use metaplan_core::{MetafieldDefinitionId, ShopDomain};
use secrecy::SecretString;

/// Shop used by the tests.
#[must_use]
pub fn test_shop() -> ShopDomain {
    ShopDomain::parse("metaplan-test.myshopify.com").unwrap_or_else(|e| panic!("{e}"))
}

/// Configuration for an app that never touches the network.
#[must_use]
pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: SecretString::from("postgres://localhost/metaplan_test"),
        host: [127, 0, 0, 1].into(),
        port: 3000,
        app_url: "https://metaplan.example.com".to_string(),
        shopify: ShopifyAppConfig {
            api_key: "test-api-key".to_string(),
            api_secret: SecretString::from("test-api-secret"),
            api_version: "2025-10".to_string(),
            scopes: vec!["write_products".to_string()],
        },
        billing: BillingSettings::default(),
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
        tls: None,
    }
}

// =============================================================================
// Billing
// =============================================================================

/// Billing fake with a fixed list of active subscriptions.
#[derive(Debug, Default)]
pub struct FakeBilling {
    subscriptions: Vec<AppSubscription>,
    confirmation_url: String,
    fail: bool,
    /// `(subscription_id, prorate)` for every cancel call.
    pub cancelled: Mutex<Vec<(String, bool)>>,
    /// Every subscription create request.
    pub created: Mutex<Vec<SubscriptionRequest>>,
}

impl FakeBilling {
    /// A shop with the given active subscriptions.
    #[must_use]
    pub fn with_subscriptions(subscriptions: Vec<AppSubscription>) -> Self {
        Self {
            subscriptions,
            confirmation_url: "https://metaplan-test.myshopify.com/admin/charges/1/confirm"
                .to_string(),
            ..Self::default()
        }
    }

    /// A billing API whose every call fails.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Number of cancel calls made.
    #[must_use]
    pub fn cancel_calls(&self) -> usize {
        self.cancelled.lock().map_or(0, |c| c.len())
    }

    /// Number of create calls made.
    #[must_use]
    pub fn create_calls(&self) -> usize {
        self.created.lock().map_or(0, |c| c.len())
    }

    fn check(&self) -> Result<(), ShopifyError> {
        if self.fail {
            Err(ShopifyError::Unauthorized("token revoked".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Build an active subscription record.
#[must_use]
pub fn subscription(id: &str, name: &str, test: bool) -> AppSubscription {
    AppSubscription {
        id: id.to_string(),
        name: name.to_string(),
        test,
    }
}

impl BillingApi for FakeBilling {
    async fn active_subscriptions(&self) -> Result<Vec<AppSubscription>, ShopifyError> {
        self.check()?;
        Ok(self.subscriptions.clone())
    }

    async fn cancel_subscription(
        &self,
        subscription_id: &str,
        prorate: bool,
    ) -> Result<AppSubscription, ShopifyError> {
        self.check()?;
        if let Ok(mut cancelled) = self.cancelled.lock() {
            cancelled.push((subscription_id.to_string(), prorate));
        }
        self.subscriptions
            .iter()
            .find(|s| s.id == subscription_id)
            .cloned()
            .ok_or_else(|| ShopifyError::UserError("Subscription not found".to_string()))
    }

    async fn create_subscription(
        &self,
        request: &SubscriptionRequest,
    ) -> Result<String, ShopifyError> {
        self.check()?;
        if let Ok(mut created) = self.created.lock() {
            created.push(request.clone());
        }
        Ok(self.confirmation_url.clone())
    }
}

// =============================================================================
// Metafield definitions
// =============================================================================

/// Metafield API fake returning a scripted response.
#[derive(Debug)]
pub struct FakeMetafieldApi {
    response: Result<MetafieldDefinitionCreateResponse, String>,
    calls: AtomicUsize,
    /// Inputs received, in order.
    pub inputs: Mutex<Vec<MetafieldDefinitionInput>>,
}

impl FakeMetafieldApi {
    /// Answer every call with `response`.
    #[must_use]
    pub fn responding(response: MetafieldDefinitionCreateResponse) -> Self {
        Self {
            response: Ok(response),
            calls: AtomicUsize::new(0),
            inputs: Mutex::new(Vec::new()),
        }
    }

    /// Fail every call with a transport error.
    #[must_use]
    pub fn failing(message: &str) -> Self {
        Self {
            response: Err(message.to_string()),
            calls: AtomicUsize::new(0),
            inputs: Mutex::new(Vec::new()),
        }
    }

    /// Number of remote calls made.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl MetafieldDefinitionApi for FakeMetafieldApi {
    async fn create_metafield_definition(
        &self,
        input: &MetafieldDefinitionInput,
    ) -> Result<MetafieldDefinitionCreateResponse, ShopifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut inputs) = self.inputs.lock() {
            inputs.push(input.clone());
        }
        self.response
            .clone()
            .map_err(ShopifyError::UnexpectedResponse)
    }
}

/// Mirror store keeping rows in memory, upserting by remote id.
#[derive(Debug, Default)]
pub struct InMemoryMirrorStore {
    rows: Mutex<Vec<MetafieldDefinition>>,
    fail_writes: bool,
}

impl InMemoryMirrorStore {
    /// A store whose upserts always fail.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    /// Snapshot of all rows.
    #[must_use]
    pub fn rows(&self) -> Vec<MetafieldDefinition> {
        self.rows.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl MetafieldMirrorStore for InMemoryMirrorStore {
    async fn upsert_by_remote_id(
        &self,
        definition: &NewMetafieldDefinition,
    ) -> Result<MetafieldDefinition, RepositoryError> {
        if self.fail_writes {
            return Err(RepositoryError::Conflict("write refused".to_string()));
        }

        let mut rows = self
            .rows
            .lock()
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;
        let now = Utc::now();

        if let Some(row) = rows
            .iter_mut()
            .find(|r| r.shopify_def_id == definition.shopify_def_id)
        {
            row.shop = definition.shop.clone();
            row.name.clone_from(&definition.name);
            row.namespace.clone_from(&definition.namespace);
            row.key.clone_from(&definition.key);
            row.value_type = definition.value_type;
            row.owner_type = definition.owner_type;
            row.updated_at = now;
            return Ok(row.clone());
        }

        let next_id = i32::try_from(rows.len() + 1)
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;
        let row = MetafieldDefinition {
            id: MetafieldDefinitionId::new(next_id),
            shop: definition.shop.clone(),
            name: definition.name.clone(),
            namespace: definition.namespace.clone(),
            key: definition.key.clone(),
            value_type: definition.value_type,
            owner_type: definition.owner_type,
            shopify_def_id: definition.shopify_def_id.clone(),
            created_at: now,
            updated_at: now,
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn list_for_shop(
        &self,
        shop: &ShopDomain,
    ) -> Result<Vec<MetafieldDefinition>, RepositoryError> {
        let rows = self
            .rows
            .lock()
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;
        Ok(rows.iter().rev().filter(|r| &r.shop == shop).cloned().collect())
    }
}
