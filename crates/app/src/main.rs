//! Metaplan - Embedded Shopify admin app.
//!
//! Serves the app loaded inside the Shopify admin iframe: OAuth install,
//! the pricing page with subscription billing, and metafield definition
//! creation for paid plans.
//!
//! # Architecture
//!
//! - Axum web framework
//! - Askama templates rendered server-side, App Bridge loaded from Shopify's CDN
//! - Shopify Admin GraphQL API with a per-shop offline token
//! - `PostgreSQL` for installed shops and mirrored metafield definitions

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::time::Duration;

use axum::Router;
use axum_server::Handle;
use axum_server::tls_rustls::RustlsConfig;
use metaplan_app::config::{AppConfig, TlsConfig};
use metaplan_app::state::AppState;
use metaplan_app::{db, telemetry};
use secrecy::ExposeSecret;

#[tokio::main]
async fn main() {
    // Must happen before reqwest or axum-server touch TLS
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let config = AppConfig::from_env().expect("Failed to load configuration");

    // Sentry before tracing so the tracing layer finds the client
    let _sentry_guard = telemetry::init_sentry(&config);
    telemetry::init_tracing();

    tracing::info!(
        app_url = %config.app_url,
        api_version = %config.shopify.api_version,
        billing_test = config.billing.test,
        "Starting metaplan"
    );

    let pool = db::create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");

    // NOTE: Migrations are NOT run automatically on startup.
    // Run them explicitly via: cargo run -p metaplan-cli -- migrate

    let app = metaplan_app::app(AppState::new(config.clone(), pool))
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    match &config.tls {
        Some(tls) => serve_tls(&config, tls, app).await,
        None => serve_plain(&config, app).await,
    }
}

async fn serve_tls(config: &AppConfig, tls: &TlsConfig, app: Router) {
    let addr = config.socket_addr();
    let rustls_config = RustlsConfig::from_pem(
        tls.cert_pem.as_bytes().to_vec(),
        tls.key_pem.expose_secret().as_bytes().to_vec(),
    )
    .await
    .expect("Failed to load TLS certificates");

    let handle = Handle::new();
    let shutdown = handle.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.graceful_shutdown(Some(Duration::from_secs(30)));
    });

    tracing::info!("metaplan listening on https://{addr}");

    axum_server::bind_rustls(addr, rustls_config)
        .handle(handle)
        .serve(app.into_make_service())
        .await
        .expect("Server error");
}

/// Plain HTTP, for running behind a TLS-terminating proxy or tunnel.
async fn serve_plain(config: &AppConfig, app: Router) {
    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("metaplan listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
