//! Installed shop management commands.
//!
//! # Usage
//!
//! ```bash
//! # List installed shops
//! metaplan-cli shops list
//!
//! # Forget a shop's offline token (forces a reinstall)
//! metaplan-cli shops remove --shop store.myshopify.com
//! ```

use metaplan_app::db::{ShopSessionRepository, create_pool};
use metaplan_core::ShopDomain;

use super::{CommandError, database_url};

/// Log every installed shop with its granted scopes.
///
/// # Errors
///
/// Returns an error if the database cannot be queried.
pub async fn list() -> Result<(), CommandError> {
    let pool = create_pool(&database_url()?).await?;
    let sessions = ShopSessionRepository::new(&pool).list().await?;

    if sessions.is_empty() {
        tracing::info!("No shops installed");
        return Ok(());
    }

    for session in &sessions {
        tracing::info!(
            shop = %session.shop,
            installed_at = %session.installed_at.format("%Y-%m-%d %H:%M"),
            scopes = %session.scopes.join(","),
            "Installed shop"
        );
    }

    tracing::info!(count = sessions.len(), "Listed installed shops");
    Ok(())
}

/// Delete a shop's stored session.
///
/// # Errors
///
/// Returns an error if the shop domain is invalid or the delete fails.
pub async fn remove(shop: &str) -> Result<(), CommandError> {
    let shop = ShopDomain::parse(shop)?;
    let pool = create_pool(&database_url()?).await?;

    if ShopSessionRepository::new(&pool).delete(&shop).await? {
        tracing::info!(shop = %shop, "Shop session removed");
    } else {
        tracing::warn!(shop = %shop, "No session stored for shop");
    }
    Ok(())
}
