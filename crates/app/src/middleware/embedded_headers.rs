//! Security headers for pages rendered inside the Shopify admin.
//!
//! Embedded pages cannot use `X-Frame-Options: DENY`. Framing is instead
//! restricted with a CSP `frame-ancestors` list naming the shop's own admin
//! and `admin.shopify.com`.

use axum::{
    extract::Request,
    http::{
        HeaderValue,
        header::{CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS},
    },
    middleware::Next,
    response::Response,
};
use metaplan_core::ShopDomain;

const SHOPIFY_ADMIN_ORIGIN: &str = "https://admin.shopify.com";

/// Build the `Content-Security-Policy` value for an embedded response.
#[must_use]
pub fn frame_ancestors_policy(shop: Option<&ShopDomain>) -> String {
    match shop {
        Some(shop) => format!("frame-ancestors {} {SHOPIFY_ADMIN_ORIGIN};", shop.origin()),
        None => format!("frame-ancestors {SHOPIFY_ADMIN_ORIGIN};"),
    }
}

/// The `shop` query parameter, when it is a valid shop domain.
fn shop_from_query(query: &str) -> Option<ShopDomain> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == "shop")
        .and_then(|(_, v)| ShopDomain::parse(&v).ok())
}

/// Add embedded-app security headers to every response.
///
/// Headers applied:
/// - `Content-Security-Policy: frame-ancestors https://{shop} https://admin.shopify.com;`
/// - `X-Content-Type-Options: nosniff`
/// - `Referrer-Policy: strict-origin-when-cross-origin`
pub async fn embedded_headers_middleware(request: Request, next: Next) -> Response {
    let shop = request.uri().query().and_then(shop_from_query);

    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    if let Ok(value) = HeaderValue::from_str(&frame_ancestors_policy(shop.as_ref())) {
        headers.insert(CONTENT_SECURITY_POLICY, value);
    }
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(
        REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );

    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_names_shop_and_admin() {
        let shop = ShopDomain::parse("store.myshopify.com").unwrap();
        assert_eq!(
            frame_ancestors_policy(Some(&shop)),
            "frame-ancestors https://store.myshopify.com https://admin.shopify.com;"
        );
        assert_eq!(
            frame_ancestors_policy(None),
            "frame-ancestors https://admin.shopify.com;"
        );
    }

    #[test]
    fn test_shop_from_query() {
        assert_eq!(
            shop_from_query("host=abc&shop=store.myshopify.com")
                .unwrap()
                .as_str(),
            "store.myshopify.com"
        );
        assert!(shop_from_query("shop=evil.com").is_none());
        assert!(shop_from_query("host=abc").is_none());
    }
}
