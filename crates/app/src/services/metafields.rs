//! Metafield definition creation.
//!
//! A definition is created on Shopify first and mirrored locally only after
//! Shopify accepted it. There is no rollback of the remote definition when
//! the local write fails; that case is logged for manual reconciliation.

use metaplan_core::{MetafieldOwnerType, MetafieldType, ShopDomain};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::db::{MetafieldDefinition, MetafieldMirrorStore, NewMetafieldDefinition};
use crate::shopify::{
    MetafieldDefinitionApi, MetafieldDefinitionInput, RemoteMetafieldDefinition, UserError,
};

/// Description attached to every definition created from the form.
pub const DEFINITION_DESCRIPTION: &str = "Saved from app";

const MISSING_FIELDS_MESSAGE: &str = "Both key and namespace are required";

/// Submitted creation form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetafieldCreationForm {
    pub key: Option<String>,
    pub namespace: Option<String>,
}

/// Outcome of a creation attempt. Every variant is rendered to the merchant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MetafieldCreationResult {
    /// The form was incomplete; Shopify was not called.
    Invalid { message: String },
    /// Shopify answered with `userErrors`; nothing was stored.
    Rejected {
        user_errors: Vec<UserError>,
        raw: serde_json::Value,
    },
    /// The Shopify call itself failed.
    RemoteFailed { message: String },
    /// Shopify created the definition but the local mirror write failed.
    PersistFailed {
        remote: RemoteMetafieldDefinition,
        message: String,
    },
    /// Created remotely and mirrored locally.
    Created {
        saved: MetafieldDefinition,
        remote: RemoteMetafieldDefinition,
    },
}

impl MetafieldCreationResult {
    /// Only a fully mirrored definition counts as success.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Created { .. })
    }

    /// JSON body for API clients: the result plus an `ok` flag.
    #[must_use]
    pub const fn response(&self) -> MetafieldCreationResponse<'_> {
        MetafieldCreationResponse {
            ok: self.is_ok(),
            result: self,
        }
    }
}

/// Serialized form of [`MetafieldCreationResult`] with an `ok` flag.
#[derive(Debug, Serialize)]
pub struct MetafieldCreationResponse<'a> {
    pub ok: bool,
    #[serde(flatten)]
    pub result: &'a MetafieldCreationResult,
}

/// Trim a form field; blank counts as missing.
fn required(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Create a metafield definition on Shopify and mirror it locally.
#[instrument(skip(api, store, shop, form), fields(shop = %shop))]
pub async fn create_metafield_definition<A, S>(
    api: &A,
    store: &S,
    shop: &ShopDomain,
    form: MetafieldCreationForm,
) -> MetafieldCreationResult
where
    A: MetafieldDefinitionApi + Sync,
    S: MetafieldMirrorStore + Sync,
{
    let (Some(key), Some(namespace)) = (required(form.key.as_ref()), required(form.namespace.as_ref()))
    else {
        return MetafieldCreationResult::Invalid {
            message: MISSING_FIELDS_MESSAGE.to_string(),
        };
    };

    let input = MetafieldDefinitionInput {
        name: format!("{namespace}.{key}"),
        namespace,
        key,
        description: DEFINITION_DESCRIPTION.to_string(),
        value_type: MetafieldType::MultiLineTextField,
        owner_type: MetafieldOwnerType::Product,
    };

    let response = match api.create_metafield_definition(&input).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(error = %e, "metafieldDefinitionCreate failed");
            return MetafieldCreationResult::RemoteFailed {
                message: e.to_string(),
            };
        }
    };

    let remote = match response.created {
        Some(remote) if response.user_errors.is_empty() && !remote.id.is_empty() => remote,
        _ => {
            tracing::info!(
                user_errors = response.user_errors.len(),
                "Metafield definition rejected"
            );
            return MetafieldCreationResult::Rejected {
                user_errors: response.user_errors,
                raw: response.raw,
            };
        }
    };

    let row = NewMetafieldDefinition {
        shop: shop.clone(),
        name: remote.name.clone(),
        namespace: remote.namespace.clone(),
        key: remote.key.clone(),
        value_type: input.value_type,
        owner_type: input.owner_type,
        shopify_def_id: remote.id.clone(),
    };

    match store.upsert_by_remote_id(&row).await {
        Ok(saved) => {
            tracing::info!(shopify_def_id = %remote.id, "Metafield definition created");
            MetafieldCreationResult::Created { saved, remote }
        }
        Err(e) => {
            tracing::error!(
                shop = %shop,
                shopify_def_id = %remote.id,
                error = %e,
                "Metafield definition created on Shopify but not saved locally; reconcile manually"
            );
            MetafieldCreationResult::PersistFailed {
                remote,
                message: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_required_trims_and_rejects_blank() {
        assert_eq!(required(Some(&"  care ".to_string())), Some("care".to_string()));
        assert_eq!(required(Some(&"   ".to_string())), None);
        assert_eq!(required(None), None);
    }

    #[test]
    fn test_invalid_result_json() {
        let result = MetafieldCreationResult::Invalid {
            message: MISSING_FIELDS_MESSAGE.to_string(),
        };
        let json = serde_json::to_value(result.response()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "ok": false,
                "kind": "invalid",
                "message": "Both key and namespace are required"
            })
        );
    }

    #[test]
    fn test_rejected_result_json_keeps_raw() {
        let result = MetafieldCreationResult::Rejected {
            user_errors: vec![UserError {
                field: vec!["definition".to_string(), "key".to_string()],
                message: "Key is in use".to_string(),
                code: Some("TAKEN".to_string()),
            }],
            raw: serde_json::json!({ "data": {} }),
        };
        assert!(!result.is_ok());
        let json = serde_json::to_value(result.response()).unwrap();
        assert_eq!(json["kind"], "rejected");
        assert_eq!(json["user_errors"][0]["code"], "TAKEN");
        assert_eq!(json["raw"], serde_json::json!({ "data": {} }));
    }
}
