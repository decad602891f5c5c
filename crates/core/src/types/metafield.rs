//! Metafield definition enums.
//!
//! Wire names follow the Shopify Admin API.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Resource type a metafield definition is attached to.
///
/// Maps to Shopify's `MetafieldOwnerType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetafieldOwnerType {
    #[default]
    Product,
    #[serde(rename = "PRODUCTVARIANT")]
    ProductVariant,
    Collection,
    Customer,
    Order,
    Shop,
}

impl MetafieldOwnerType {
    /// Shopify wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Product => "PRODUCT",
            Self::ProductVariant => "PRODUCTVARIANT",
            Self::Collection => "COLLECTION",
            Self::Customer => "CUSTOMER",
            Self::Order => "ORDER",
            Self::Shop => "SHOP",
        }
    }
}

impl fmt::Display for MetafieldOwnerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MetafieldOwnerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PRODUCT" => Ok(Self::Product),
            "PRODUCTVARIANT" => Ok(Self::ProductVariant),
            "COLLECTION" => Ok(Self::Collection),
            "CUSTOMER" => Ok(Self::Customer),
            "ORDER" => Ok(Self::Order),
            "SHOP" => Ok(Self::Shop),
            _ => Err(format!("invalid metafield owner type: {s}")),
        }
    }
}

/// Value type of a metafield definition.
///
/// Only the types this app creates or displays are listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MetafieldType {
    #[default]
    MultiLineTextField,
    SingleLineTextField,
    Json,
    Boolean,
    NumberInteger,
}

impl MetafieldType {
    /// Shopify wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MultiLineTextField => "multi_line_text_field",
            Self::SingleLineTextField => "single_line_text_field",
            Self::Json => "json",
            Self::Boolean => "boolean",
            Self::NumberInteger => "number_integer",
        }
    }
}

impl fmt::Display for MetafieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MetafieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "multi_line_text_field" => Ok(Self::MultiLineTextField),
            "single_line_text_field" => Ok(Self::SingleLineTextField),
            "json" => Ok(Self::Json),
            "boolean" => Ok(Self::Boolean),
            "number_integer" => Ok(Self::NumberInteger),
            _ => Err(format!("invalid metafield type: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_type_wire_names_match_serde() {
        for owner in [
            MetafieldOwnerType::Product,
            MetafieldOwnerType::ProductVariant,
            MetafieldOwnerType::Collection,
            MetafieldOwnerType::Customer,
            MetafieldOwnerType::Order,
            MetafieldOwnerType::Shop,
        ] {
            let json = serde_json::to_value(owner).unwrap();
            assert_eq!(json.as_str(), Some(owner.as_str()));
            assert_eq!(owner.as_str().parse::<MetafieldOwnerType>().unwrap(), owner);
        }
    }

    #[test]
    fn test_type_wire_names_match_serde() {
        for ty in [
            MetafieldType::MultiLineTextField,
            MetafieldType::SingleLineTextField,
            MetafieldType::Json,
            MetafieldType::Boolean,
            MetafieldType::NumberInteger,
        ] {
            let json = serde_json::to_value(ty).unwrap();
            assert_eq!(json.as_str(), Some(ty.as_str()));
            assert_eq!(ty.as_str().parse::<MetafieldType>().unwrap(), ty);
        }
    }

    #[test]
    fn test_defaults_are_the_app_policy() {
        assert_eq!(MetafieldOwnerType::default().as_str(), "PRODUCT");
        assert_eq!(MetafieldType::default().as_str(), "multi_line_text_field");
    }

    #[test]
    fn test_invalid_values() {
        assert!("VARIANT".parse::<MetafieldOwnerType>().is_err());
        assert!("rich_text".parse::<MetafieldType>().is_err());
    }
}
