//! Row identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Local primary key of a mirrored metafield definition row.
///
/// Distinct from the Shopify GID (`shopify_def_id`), which is the identity
/// used for upserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type), sqlx(transparent))]
#[serde(transparent)]
pub struct MetafieldDefinitionId(i32);

impl MetafieldDefinitionId {
    /// Wrap a raw row ID.
    #[must_use]
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    /// The raw row ID.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }
}

impl fmt::Display for MetafieldDefinitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for MetafieldDefinitionId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

impl From<MetafieldDefinitionId> for i32 {
    fn from(id: MetafieldDefinitionId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_conversions() {
        let id = MetafieldDefinitionId::new(42);
        assert_eq!(id.as_i32(), 42);
        assert_eq!(i32::from(id), 42);
        assert_eq!(MetafieldDefinitionId::from(42), id);
    }

    #[test]
    fn test_id_display_and_json() {
        let id = MetafieldDefinitionId::new(7);
        assert_eq!(id.to_string(), "7");
        assert_eq!(serde_json::to_string(&id).unwrap_or_default(), "7");
    }
}
