//! HTTP middleware and extractors.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, transaction naming)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (tag span and Sentry scope)
//! 4. Embedded headers (CSP `frame-ancestors`)
//!
//! Authentication is done per handler by the [`ShopSession`] and
//! [`RequirePaidPlan`] extractors.

pub mod embedded_headers;
pub mod request_id;
pub mod shop_session;

pub use embedded_headers::embedded_headers_middleware;
pub use request_id::request_id_middleware;
pub use shop_session::{
    PLAN_UNAVAILABLE, RequirePaidPlan, ShopSession, ShopSessionRejection, require_paid,
};
