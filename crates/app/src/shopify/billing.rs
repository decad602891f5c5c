//! App subscription billing operations for the Admin API.

use tracing::instrument;

use super::{
    AdminClient, AppSubscription, BillingApi, BillingInterval, ShopifyError, SubscriptionRequest,
    UserError, join_user_errors,
    queries::{ActiveSubscriptions, AppSubscriptionCancel, AppSubscriptionCreate},
};

impl AdminClient {
    /// Get the active app subscriptions of the current installation.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(shop = %self.shop()))]
    pub async fn get_active_subscriptions(&self) -> Result<Vec<AppSubscription>, ShopifyError> {
        use super::queries::active_subscriptions::Variables;

        let response = self.execute::<ActiveSubscriptions>(Variables).await?;

        Ok(response
            .current_app_installation
            .active_subscriptions
            .into_iter()
            .map(|s| AppSubscription {
                id: s.id,
                name: s.name,
                test: s.test,
            })
            .collect())
    }

    /// Cancel an app subscription.
    ///
    /// # Arguments
    ///
    /// * `subscription_id` - Subscription GID
    /// * `prorate` - Whether to issue a prorated credit for the unused period
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::UserError` if Shopify rejects the cancellation.
    #[instrument(skip(self), fields(shop = %self.shop()))]
    pub async fn app_subscription_cancel(
        &self,
        subscription_id: &str,
        prorate: bool,
    ) -> Result<AppSubscription, ShopifyError> {
        use super::queries::app_subscription_cancel::Variables;

        let variables = Variables {
            id: subscription_id.to_string(),
            prorate: Some(prorate),
        };

        let response = self.execute::<AppSubscriptionCancel>(variables).await?;

        let payload = response.app_subscription_cancel.ok_or_else(|| {
            ShopifyError::UnexpectedResponse("appSubscriptionCancel returned no payload".to_string())
        })?;

        if !payload.user_errors.is_empty() {
            let errors: Vec<UserError> = payload
                .user_errors
                .into_iter()
                .map(|e| UserError {
                    field: e.field.unwrap_or_default(),
                    message: e.message,
                    code: None,
                })
                .collect();
            return Err(ShopifyError::UserError(join_user_errors(&errors)));
        }

        let cancelled = payload.app_subscription.ok_or_else(|| {
            ShopifyError::UnexpectedResponse("no subscription in cancel payload".to_string())
        })?;

        tracing::info!(subscription_id = %cancelled.id, "App subscription cancelled");

        Ok(AppSubscription {
            id: cancelled.id,
            name: cancelled.name,
            test: cancelled.test,
        })
    }

    /// Create a recurring app subscription with one line item.
    ///
    /// Returns the confirmation URL the merchant must visit to approve the
    /// charge.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::UserError` if Shopify rejects the request.
    #[instrument(skip(self, request), fields(shop = %self.shop(), name = %request.name))]
    pub async fn app_subscription_create(
        &self,
        request: &SubscriptionRequest,
    ) -> Result<String, ShopifyError> {
        use super::queries::app_subscription_create::{
            AppPlanInput, AppPricingInterval, AppRecurringPricingInput,
            AppSubscriptionLineItemInput, CurrencyCode, MoneyInput, Variables,
        };

        let currency_code = match request.currency.as_str() {
            "INR" => CurrencyCode::INR,
            "USD" => CurrencyCode::USD,
            "CAD" => CurrencyCode::CAD,
            "EUR" => CurrencyCode::EUR,
            "GBP" => CurrencyCode::GBP,
            "AUD" => CurrencyCode::AUD,
            "JPY" => CurrencyCode::JPY,
            other => CurrencyCode::Other(other.to_string()),
        };

        let interval = match request.interval {
            BillingInterval::Every30Days => AppPricingInterval::EVERY_30_DAYS,
            BillingInterval::Annual => AppPricingInterval::ANNUAL,
        };

        let variables = Variables {
            name: request.name.clone(),
            line_items: vec![AppSubscriptionLineItemInput {
                plan: AppPlanInput {
                    app_recurring_pricing_details: Some(AppRecurringPricingInput {
                        price: MoneyInput {
                            amount: request.price.to_string(),
                            currency_code,
                        },
                        interval: Some(interval),
                    }),
                },
            }],
            return_url: request.return_url.clone(),
            test: Some(request.test),
            trial_days: (request.trial_days > 0).then_some(i64::from(request.trial_days)),
        };

        let response = self.execute::<AppSubscriptionCreate>(variables).await?;

        let payload = response.app_subscription_create.ok_or_else(|| {
            ShopifyError::UnexpectedResponse("appSubscriptionCreate returned no payload".to_string())
        })?;

        if !payload.user_errors.is_empty() {
            let errors: Vec<UserError> = payload
                .user_errors
                .into_iter()
                .map(|e| UserError {
                    field: e.field.unwrap_or_default(),
                    message: e.message,
                    code: None,
                })
                .collect();
            return Err(ShopifyError::UserError(join_user_errors(&errors)));
        }

        payload.confirmation_url.ok_or_else(|| {
            ShopifyError::UnexpectedResponse("no confirmationUrl in create payload".to_string())
        })
    }
}

impl BillingApi for AdminClient {
    async fn active_subscriptions(&self) -> Result<Vec<AppSubscription>, ShopifyError> {
        self.get_active_subscriptions().await
    }

    async fn cancel_subscription(
        &self,
        subscription_id: &str,
        prorate: bool,
    ) -> Result<AppSubscription, ShopifyError> {
        self.app_subscription_cancel(subscription_id, prorate).await
    }

    async fn create_subscription(
        &self,
        request: &SubscriptionRequest,
    ) -> Result<String, ShopifyError> {
        self.app_subscription_create(request).await
    }
}
