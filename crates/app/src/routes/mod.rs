//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! # Install (OAuth)
//! GET  /auth                    - Start OAuth for ?shop=
//! GET  /auth/callback           - Finish OAuth, store offline token
//!
//! # Embedded app (session token or signed query)
//! GET  /app                     - Home
//! GET  /app/pricing             - Plans and current subscription
//! GET  /app/cancel              - Cancel the active subscription
//! GET  /app/upgrade             - Subscribe to the monthly plan
//! GET  /app/upgrade-annual      - Subscribe to the annual plan
//! GET  /app/metafieldcreation   - Metafield definition form (paid)
//! POST /app/metafieldcreation   - Create a metafield definition (paid)
//! ```

use askama::Template;
use axum::{
    Router,
    response::Html,
    routing::get,
};

use crate::state::AppState;

pub mod auth;
pub mod billing;
pub mod home;
pub mod metafields;
pub mod pricing;

/// Build the application router (without health checks and layers).
pub fn routes() -> Router<AppState> {
    Router::new()
        // Install
        .route("/auth", get(auth::begin))
        .route("/auth/callback", get(auth::callback))
        // Embedded app
        .route("/app", get(home::index))
        .route("/app/pricing", get(pricing::index))
        .route("/app/cancel", get(billing::cancel))
        .route("/app/upgrade", get(billing::upgrade_monthly))
        .route("/app/upgrade-annual", get(billing::upgrade_annual))
        .route(
            "/app/metafieldcreation",
            get(metafields::index).post(metafields::create),
        )
}

/// Render a template, falling back to a plain error body.
pub(crate) fn render<T: Template>(template: &T) -> Html<String> {
    Html(template.render().unwrap_or_else(|e| {
        tracing::error!("Template render error: {}", e);
        "Internal Server Error".to_string()
    }))
}

/// Page that navigates the top window out of the admin iframe.
#[derive(Template)]
#[template(path = "exit_iframe.html")]
pub struct ExitIframeTemplate {
    pub api_key: String,
    pub redirect_url: String,
}

/// Respond with a page that sends the top-level window to `url`.
pub(crate) fn top_level_redirect(api_key: &str, url: &str) -> Html<String> {
    render(&ExitIframeTemplate {
        api_key: api_key.to_string(),
        redirect_url: url.to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_top_level_redirect_embeds_target() {
        let Html(body) = top_level_redirect(
            "key-1",
            "https://store.myshopify.com/admin/charges/1/confirm?signature=a&b=c",
        );
        assert!(body.contains(r#"<meta name="shopify-api-key" content="key-1""#));
        assert!(body.contains("app-bridge.js"));
        assert!(body.contains("https://store.myshopify.com/admin/charges/1/confirm"));
        assert!(body.contains("_top"));
    }
}
