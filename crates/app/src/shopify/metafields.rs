//! Metafield definition operations for the Admin API.

use metaplan_core::MetafieldOwnerType;
use serde::Serialize;
use tracing::instrument;

use super::{
    AdminClient, MetafieldDefinitionApi, MetafieldDefinitionCreateResponse,
    MetafieldDefinitionInput, RemoteMetafieldDefinition, ShopifyError, UserError,
    queries::CreateMetafieldDefinition,
};

impl AdminClient {
    /// Create a metafield definition.
    ///
    /// Mutation `userErrors` are returned in the response rather than as an
    /// error, together with the raw body, so callers can show them verbatim.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response carries
    /// top-level GraphQL errors.
    #[instrument(
        skip(self, input),
        fields(shop = %self.shop(), namespace = %input.namespace, key = %input.key)
    )]
    pub async fn metafield_definition_create(
        &self,
        input: &MetafieldDefinitionInput,
    ) -> Result<MetafieldDefinitionCreateResponse, ShopifyError> {
        use super::queries::create_metafield_definition::{
            MetafieldDefinitionInput as GqlInput, MetafieldOwnerType as GqlOwnerType, Variables,
        };

        let owner_type = match input.owner_type {
            MetafieldOwnerType::Product => GqlOwnerType::PRODUCT,
            MetafieldOwnerType::ProductVariant => GqlOwnerType::PRODUCTVARIANT,
            MetafieldOwnerType::Collection => GqlOwnerType::COLLECTION,
            MetafieldOwnerType::Customer => GqlOwnerType::CUSTOMER,
            MetafieldOwnerType::Order => GqlOwnerType::ORDER,
            MetafieldOwnerType::Shop => GqlOwnerType::SHOP,
        };

        let variables = Variables {
            definition: GqlInput {
                name: input.name.clone(),
                namespace: Some(input.namespace.clone()),
                key: input.key.clone(),
                description: Some(input.description.clone()),
                type_: input.value_type.as_str().to_string(),
                owner_type,
            },
        };

        let (response, raw) = self
            .execute_raw::<CreateMetafieldDefinition>(variables)
            .await?;

        let Some(payload) = response.metafield_definition_create else {
            return Err(ShopifyError::UnexpectedResponse(
                "metafieldDefinitionCreate returned no payload".to_string(),
            ));
        };

        let user_errors = payload
            .user_errors
            .into_iter()
            .map(|e| UserError {
                field: e.field.unwrap_or_default(),
                message: e.message,
                code: e.code.as_ref().map(wire_name),
            })
            .collect();

        let created = payload
            .created_definition
            .map(|d| RemoteMetafieldDefinition {
                id: d.id,
                name: d.name,
                namespace: d.namespace,
                key: d.key,
            });

        Ok(MetafieldDefinitionCreateResponse {
            created,
            user_errors,
            raw,
        })
    }
}

/// The GraphQL name of an enum value, including values added to the API
/// after the schema in `graphql/admin` was captured.
fn wire_name<T: Serialize + std::fmt::Debug>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(name)) => name,
        _ => format!("{value:?}"),
    }
}

impl MetafieldDefinitionApi for AdminClient {
    async fn create_metafield_definition(
        &self,
        input: &MetafieldDefinitionInput,
    ) -> Result<MetafieldDefinitionCreateResponse, ShopifyError> {
        self.metafield_definition_create(input).await
    }
}
