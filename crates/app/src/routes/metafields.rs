//! Metafield definition creation handlers (paid plans only).

use askama::Template;
use axum::{
    Form, Json,
    extract::State,
    http::{HeaderMap, header::ACCEPT},
    response::{Html, IntoResponse, Response},
};
use tracing::instrument;

use metaplan_core::ShopDomain;

use crate::db::{MetafieldDefinition, MetafieldDefinitionRepository, MetafieldMirrorStore};
use crate::middleware::RequirePaidPlan;
use crate::services::{MetafieldCreationForm, MetafieldCreationResult, create_metafield_definition};
use crate::state::AppState;

use super::render;

/// A saved definition row for the template.
#[derive(Debug, Clone)]
pub struct SavedDefinitionView {
    pub handle: String,
    pub value_type: String,
    pub shopify_def_id: String,
    pub created_at: String,
}

impl From<&MetafieldDefinition> for SavedDefinitionView {
    fn from(def: &MetafieldDefinition) -> Self {
        Self {
            handle: format!("{}.{}", def.namespace, def.key),
            value_type: def.value_type.to_string(),
            shopify_def_id: def.shopify_def_id.clone(),
            created_at: def.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Outcome banner for the template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeView {
    pub ok: bool,
    pub title: String,
    pub details: Vec<String>,
}

impl From<&MetafieldCreationResult> for OutcomeView {
    fn from(result: &MetafieldCreationResult) -> Self {
        match result {
            MetafieldCreationResult::Invalid { message } => Self {
                ok: false,
                title: message.clone(),
                details: vec![],
            },
            MetafieldCreationResult::Rejected { user_errors, .. } => Self {
                ok: false,
                title: "Shopify rejected the definition".to_string(),
                details: user_errors
                    .iter()
                    .map(|e| match &e.code {
                        Some(code) => format!("{code}: {}", e.message),
                        None => e.message.clone(),
                    })
                    .collect(),
            },
            MetafieldCreationResult::RemoteFailed { message } => Self {
                ok: false,
                title: "Could not reach Shopify".to_string(),
                details: vec![message.clone()],
            },
            MetafieldCreationResult::PersistFailed { remote, .. } => Self {
                ok: false,
                title: format!(
                    "Created {} on Shopify ({}) but it could not be saved in the app",
                    remote.name, remote.id
                ),
                details: vec![],
            },
            MetafieldCreationResult::Created { remote, .. } => Self {
                ok: true,
                title: format!("Created: {} ({})", remote.name, remote.id),
                details: vec![],
            },
        }
    }
}

/// Metafield creation page template.
#[derive(Template)]
#[template(path = "app/metafields.html")]
pub struct MetafieldsTemplate {
    pub api_key: String,
    pub search: String,
    pub outcome: Option<OutcomeView>,
    pub definitions: Vec<SavedDefinitionView>,
    /// The saved list could not be read.
    pub definitions_unavailable: bool,
}

impl MetafieldsTemplate {
    fn new(
        api_key: String,
        search: String,
        outcome: Option<OutcomeView>,
        definitions: Option<Vec<MetafieldDefinition>>,
    ) -> Self {
        let (definitions, definitions_unavailable) = match definitions {
            Some(rows) => (rows.iter().map(SavedDefinitionView::from).collect(), false),
            None => (vec![], true),
        };
        Self {
            api_key,
            search,
            outcome,
            definitions,
            definitions_unavailable,
        }
    }
}

/// Saved rows for the page. A failed read is logged and shown as a notice.
async fn saved_definitions<S: MetafieldMirrorStore + Sync>(
    store: &S,
    shop: &ShopDomain,
) -> Option<Vec<MetafieldDefinition>> {
    store
        .list_for_shop(shop)
        .await
        .inspect_err(|e| {
            tracing::error!(shop = %shop, error = %e, "Failed to list metafield definitions");
        })
        .ok()
}

fn wants_json(headers: &HeaderMap) -> bool {
    headers
        .get(ACCEPT)
        .and_then(|h| h.to_str().ok())
        .is_some_and(|accept| accept.contains("application/json"))
}

/// GET /app/metafieldcreation - Form and saved definitions.
#[instrument(skip(state, paid), fields(shop = %paid.session.shop))]
pub async fn index(State(state): State<AppState>, paid: RequirePaidPlan) -> Html<String> {
    let session = paid.session;
    let store = MetafieldDefinitionRepository::new(state.pool());
    let definitions = saved_definitions(&store, &session.shop).await;

    render(&MetafieldsTemplate::new(
        state.config().shopify.api_key.clone(),
        session.search(),
        None,
        definitions,
    ))
}

/// POST /app/metafieldcreation - Create a definition.
///
/// Answers with JSON when the client asks for it, otherwise re-renders the
/// page with the outcome.
#[instrument(skip(state, paid, headers, form), fields(shop = %paid.session.shop))]
pub async fn create(
    State(state): State<AppState>,
    paid: RequirePaidPlan,
    headers: HeaderMap,
    Form(form): Form<MetafieldCreationForm>,
) -> Response {
    let session = paid.session;
    let store = MetafieldDefinitionRepository::new(state.pool());

    let result = create_metafield_definition(&session.client, &store, &session.shop, form).await;

    if wants_json(&headers) {
        return Json(result.response()).into_response();
    }

    let definitions = saved_definitions(&store, &session.shop).await;

    render(&MetafieldsTemplate::new(
        state.config().shopify.api_key.clone(),
        session.search(),
        Some(OutcomeView::from(&result)),
        definitions,
    ))
    .into_response()
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;
    use crate::shopify::UserError;

    #[test]
    fn test_wants_json() {
        let mut headers = HeaderMap::new();
        assert!(!wants_json(&headers));
        headers.insert(ACCEPT, HeaderValue::from_static("text/html"));
        assert!(!wants_json(&headers));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, */*"));
        assert!(wants_json(&headers));
    }

    #[test]
    fn test_rejected_outcome_lists_codes() {
        let result = MetafieldCreationResult::Rejected {
            user_errors: vec![
                UserError {
                    field: vec!["definition".to_string(), "key".to_string()],
                    message: "Key is in use".to_string(),
                    code: Some("TAKEN".to_string()),
                },
                UserError {
                    field: vec![],
                    message: "Too many definitions".to_string(),
                    code: None,
                },
            ],
            raw: serde_json::Value::Null,
        };
        let view = OutcomeView::from(&result);
        assert!(!view.ok);
        assert_eq!(view.details, ["TAKEN: Key is in use", "Too many definitions"]);
    }

    #[test]
    fn test_unreadable_list_renders_notice() {
        let template = MetafieldsTemplate::new(
            "key-1".to_string(),
            "?shop=store.myshopify.com".to_string(),
            None,
            None,
        );
        assert!(template.definitions_unavailable);

        let html = template.render().unwrap_or_default();
        assert!(html.contains("Saved metafields could not be loaded"));
        assert!(html.contains("action=\"/app/metafieldcreation?shop=store.myshopify.com\""));
        assert!(!html.contains("No metafields saved yet."));
    }

    #[test]
    fn test_invalid_outcome() {
        let result = MetafieldCreationResult::Invalid {
            message: "Both key and namespace are required".to_string(),
        };
        assert_eq!(
            OutcomeView::from(&result),
            OutcomeView {
                ok: false,
                title: "Both key and namespace are required".to_string(),
                details: vec![],
            }
        );
    }
}
