//! Metaplan Core - Shared domain types.
//!
//! This crate provides the types shared by all Metaplan components:
//! - `app` - Embedded Shopify admin app (pricing, billing, metafield creation)
//! - `cli` - Command-line tools for migrations and shop management
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. Remote collaborators live in the `app` crate.
//!
//! # Modules
//!
//! - [`types`] - Plans, entitlement state, shop domains, metafield enums, IDs

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
