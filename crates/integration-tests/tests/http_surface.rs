//! Requests through the full router that are answered before any database
//! or Shopify call.

#![allow(clippy::unwrap_used)]

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use metaplan_app::state::AppState;
use metaplan_integration_tests::test_config;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

fn router() -> axum::Router {
    let config = test_config();
    let pool = PgPoolOptions::new()
        .connect_lazy("postgres://localhost/metaplan_test")
        .unwrap();
    metaplan_app::app(AppState::new(config, pool))
}

async fn get(uri: &str) -> axum::response::Response {
    router()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_health_sets_embedded_headers() {
    let response = get("/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(
        headers[header::CONTENT_SECURITY_POLICY],
        "frame-ancestors https://admin.shopify.com;"
    );
    assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert!(headers.contains_key("x-request-id"));
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn test_stylesheet_served_from_any_working_directory() {
    let response = get("/static/app.css").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/css")
    );
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let response = router()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "req-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers()["x-request-id"], "req-123");
}

#[tokio::test]
async fn test_unsigned_app_request_asks_for_new_session() {
    let response = get("/app/pricing?shop=metaplan-test.myshopify.com").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers()["x-shopify-retry-invalid-session-request"],
        "1"
    );
    assert_eq!(
        response.headers()[header::CONTENT_SECURITY_POLICY],
        "frame-ancestors https://metaplan-test.myshopify.com https://admin.shopify.com;"
    );
}

#[tokio::test]
async fn test_invalid_bearer_token_is_rejected() {
    let response = router()
        .oneshot(
            Request::builder()
                .uri("/app/metafieldcreation")
                .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_requires_valid_shop() {
    assert_eq!(get("/auth").await.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        get("/auth?shop=example.com").await.status(),
        StatusCode::BAD_REQUEST
    );
}

#[tokio::test]
async fn test_auth_redirects_to_consent_screen() {
    let response = get("/auth?shop=metaplan-test.myshopify.com").await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert!(location.starts_with(
        "https://metaplan-test.myshopify.com/admin/oauth/authorize?client_id=test-api-key"
    ));
    assert!(location.contains("redirect_uri=https%3A%2F%2Fmetaplan.example.com%2Fauth%2Fcallback"));

    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("metaplan_oauth_state="));
    assert!(cookie.contains("HttpOnly"));
}

#[tokio::test]
async fn test_embedded_auth_breaks_out_of_iframe() {
    let response = get("/auth?shop=metaplan-test.myshopify.com&embedded=1").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(!response.headers().contains_key(header::SET_COOKIE));
    let body = body_text(response).await;
    assert!(body.contains("https://metaplan.example.com/auth?shop=metaplan-test.myshopify.com"));
    assert!(body.contains("_top"));
}

#[tokio::test]
async fn test_callback_rejects_bad_signature() {
    let response = get(
        "/auth/callback?code=abc&shop=metaplan-test.myshopify.com&state=n&timestamp=1&hmac=00",
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
