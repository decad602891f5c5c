//! Core types for Metaplan.
//!
//! This module provides type-safe wrappers for the app's domain concepts.

pub mod id;
pub mod metafield;
pub mod plan;
pub mod shop;

pub use id::MetafieldDefinitionId;
pub use metafield::{MetafieldOwnerType, MetafieldType};
pub use plan::{ActiveSubscription, Plan, PlanState};
pub use shop::{ShopDomain, ShopDomainError};
