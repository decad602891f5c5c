//! Metafield definition mirror repository.
//!
//! Shopify is the source of truth for metafield definitions. This table keeps
//! a local copy of the definitions created through the app, keyed by the
//! remote definition GID. Rows are never deleted by the app.

use std::future::Future;

use chrono::{DateTime, Utc};
use metaplan_core::{MetafieldDefinitionId, MetafieldOwnerType, MetafieldType, ShopDomain};
use serde::Serialize;
use sqlx::PgPool;

use super::RepositoryError;

// =============================================================================
// Types
// =============================================================================

/// A persisted mirror of a remote metafield definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetafieldDefinition {
    /// Local row ID.
    pub id: MetafieldDefinitionId,
    /// Shop that owns the definition.
    pub shop: ShopDomain,
    /// Display name (`namespace.key` for definitions created by the app).
    pub name: String,
    pub namespace: String,
    pub key: String,
    /// Value type.
    #[serde(rename = "type")]
    pub value_type: MetafieldType,
    /// Resource the definition attaches to.
    pub owner_type: MetafieldOwnerType,
    /// Shopify GID of the definition (unique).
    pub shopify_def_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Values written by an upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMetafieldDefinition {
    pub shop: ShopDomain,
    pub name: String,
    pub namespace: String,
    pub key: String,
    pub value_type: MetafieldType,
    pub owner_type: MetafieldOwnerType,
    /// Shopify GID; the upsert key.
    pub shopify_def_id: String,
}

/// Internal row type for `PostgreSQL` queries.
#[derive(Debug, sqlx::FromRow)]
struct MetafieldDefinitionRow {
    id: i32,
    shop: String,
    name: String,
    namespace: String,
    key: String,
    #[sqlx(rename = "type")]
    value_type: String,
    owner_type: String,
    shopify_def_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<MetafieldDefinitionRow> for MetafieldDefinition {
    type Error = RepositoryError;

    fn try_from(row: MetafieldDefinitionRow) -> Result<Self, Self::Error> {
        let shop = ShopDomain::parse(&row.shop).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid shop '{}': {e}", row.shop))
        })?;
        let value_type = row
            .value_type
            .parse::<MetafieldType>()
            .map_err(RepositoryError::DataCorruption)?;
        let owner_type = row
            .owner_type
            .parse::<MetafieldOwnerType>()
            .map_err(RepositoryError::DataCorruption)?;

        Ok(Self {
            id: MetafieldDefinitionId::new(row.id),
            shop,
            name: row.name,
            namespace: row.namespace,
            key: row.key,
            value_type,
            owner_type,
            shopify_def_id: row.shopify_def_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// =============================================================================
// Store seam
// =============================================================================

/// Persistence for mirrored metafield definitions.
///
/// Implemented by [`MetafieldDefinitionRepository`] for `PostgreSQL`.
pub trait MetafieldMirrorStore {
    /// Insert a row, or update the existing row with the same `shopify_def_id`.
    fn upsert_by_remote_id(
        &self,
        definition: &NewMetafieldDefinition,
    ) -> impl Future<Output = Result<MetafieldDefinition, RepositoryError>> + Send;

    /// All rows for a shop, newest first.
    fn list_for_shop(
        &self,
        shop: &ShopDomain,
    ) -> impl Future<Output = Result<Vec<MetafieldDefinition>, RepositoryError>> + Send;
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for mirrored metafield definitions.
pub struct MetafieldDefinitionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> MetafieldDefinitionRepository<'a> {
    /// Create a new metafield definition repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

impl MetafieldMirrorStore for MetafieldDefinitionRepository<'_> {
    async fn upsert_by_remote_id(
        &self,
        definition: &NewMetafieldDefinition,
    ) -> Result<MetafieldDefinition, RepositoryError> {
        let row = sqlx::query_as::<_, MetafieldDefinitionRow>(
            r#"
            INSERT INTO metafield_definition
                (shop, name, namespace, key, "type", owner_type, shopify_def_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (shopify_def_id) DO UPDATE SET
                shop = EXCLUDED.shop,
                name = EXCLUDED.name,
                namespace = EXCLUDED.namespace,
                key = EXCLUDED.key,
                "type" = EXCLUDED."type",
                owner_type = EXCLUDED.owner_type,
                updated_at = NOW()
            RETURNING id, shop, name, namespace, key, "type", owner_type,
                      shopify_def_id, created_at, updated_at
            "#,
        )
        .bind(definition.shop.as_str())
        .bind(&definition.name)
        .bind(&definition.namespace)
        .bind(&definition.key)
        .bind(definition.value_type.as_str())
        .bind(definition.owner_type.as_str())
        .bind(&definition.shopify_def_id)
        .fetch_one(self.pool)
        .await?;

        MetafieldDefinition::try_from(row)
    }

    async fn list_for_shop(
        &self,
        shop: &ShopDomain,
    ) -> Result<Vec<MetafieldDefinition>, RepositoryError> {
        let rows = sqlx::query_as::<_, MetafieldDefinitionRow>(
            r#"
            SELECT id, shop, name, namespace, key, "type", owner_type,
                   shopify_def_id, created_at, updated_at
            FROM metafield_definition
            WHERE shop = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(shop.as_str())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(MetafieldDefinition::try_from).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn row() -> MetafieldDefinitionRow {
        MetafieldDefinitionRow {
            id: 3,
            shop: "store.myshopify.com".to_string(),
            name: "custom.care_guide".to_string(),
            namespace: "custom".to_string(),
            key: "care_guide".to_string(),
            value_type: "multi_line_text_field".to_string(),
            owner_type: "PRODUCT".to_string(),
            shopify_def_id: "gid://shopify/MetafieldDefinition/1".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_row_conversion() {
        let def = MetafieldDefinition::try_from(row()).unwrap();
        assert_eq!(def.id, MetafieldDefinitionId::new(3));
        assert_eq!(def.shop.as_str(), "store.myshopify.com");
        assert_eq!(def.value_type, MetafieldType::MultiLineTextField);
        assert_eq!(def.owner_type, MetafieldOwnerType::Product);
    }

    #[test]
    fn test_row_conversion_rejects_unknown_type() {
        let mut bad = row();
        bad.value_type = "rich_text_field".to_string();
        assert!(matches!(
            MetafieldDefinition::try_from(bad),
            Err(RepositoryError::DataCorruption(_))
        ));
    }

    #[test]
    fn test_serializes_type_field_name() {
        let def = MetafieldDefinition::try_from(row()).unwrap();
        let json = serde_json::to_value(&def).unwrap();
        assert_eq!(json["type"], "multi_line_text_field");
        assert_eq!(json["owner_type"], "PRODUCT");
        assert_eq!(json["shop"], "store.myshopify.com");
    }
}
