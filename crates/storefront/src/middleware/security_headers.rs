//! Security headers middleware for XSS, clickjacking, and isolation protection.
//!
//! Adds restrictive security headers to all responses. The storefront is
//! mostly a JSON API; the few HTML pages it renders (payment results) load
//! nothing but the Midtrans Snap script.

use axum::{
    extract::Request,
    http::{
        HeaderName, HeaderValue,
        header::{
            CACHE_CONTROL, CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS,
            X_FRAME_OPTIONS,
        },
    },
    middleware::Next,
    response::Response,
};

/// Add security headers to all responses.
///
/// Headers applied:
/// - `X-Frame-Options: DENY` - Prevent clickjacking
/// - `X-Content-Type-Options: nosniff` - Prevent MIME sniffing
/// - `Referrer-Policy: strict-origin-when-cross-origin` - Midtrans checks the referrer origin
/// - `Content-Security-Policy` - Strict CSP (see below)
/// - `Permissions-Policy` - Deny sensitive features except `payment`
/// - `Cache-Control: no-store` - Unless the handler set its own policy
/// - `Cross-Origin-Opener-Policy: same-origin-allow-popups` - Snap opens popups
/// - `X-DNS-Prefetch-Control: off` - Prevent DNS prefetch leakage
///
/// # CSP Policy
///
/// ```text
/// default-src 'none';
/// script-src 'self' https://app.midtrans.com https://app.sandbox.midtrans.com;
/// style-src 'self' 'unsafe-inline';
/// img-src 'self' data: https:;
/// connect-src 'self' https://app.midtrans.com https://app.sandbox.midtrans.com;
/// frame-src https://app.midtrans.com https://app.sandbox.midtrans.com;
/// object-src 'none';
/// base-uri 'self';
/// form-action 'self';
/// frame-ancestors 'none'
/// ```
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(
        REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );

    headers.insert(
        CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(
            "default-src 'none'; \
             script-src 'self' https://app.midtrans.com https://app.sandbox.midtrans.com; \
             style-src 'self' 'unsafe-inline'; \
             img-src 'self' data: https:; \
             connect-src 'self' https://app.midtrans.com https://app.sandbox.midtrans.com; \
             frame-src https://app.midtrans.com https://app.sandbox.midtrans.com; \
             object-src 'none'; \
             base-uri 'self'; \
             form-action 'self'; \
             frame-ancestors 'none'",
        ),
    );

    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static(
            "accelerometer=(), \
             camera=(), \
             display-capture=(), \
             geolocation=(), \
             gyroscope=(), \
             interest-cohort=(), \
             magnetometer=(), \
             microphone=(), \
             payment=(self \"https://app.midtrans.com\" \"https://app.sandbox.midtrans.com\"), \
             usb=()",
        ),
    );

    // Catalog handlers set a public cache policy; everything else is private
    if !headers.contains_key(CACHE_CONTROL) {
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store, max-age=0"));
    }

    headers.insert(
        HeaderName::from_static("cross-origin-opener-policy"),
        HeaderValue::from_static("same-origin-allow-popups"),
    );

    headers.insert(
        HeaderName::from_static("x-dns-prefetch-control"),
        HeaderValue::from_static("off"),
    );

    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        Router,
        body::Body,
        http::{Request, header},
        middleware,
        response::IntoResponse,
        routing::get,
    };
    use tower::ServiceExt;

    use super::*;

    fn app() -> Router {
        Router::new()
            .route("/private", get(|| async { "cart" }))
            .route(
                "/public",
                get(|| async { ([(header::CACHE_CONTROL, "public, max-age=60")], "list").into_response() }),
            )
            .layer(middleware::from_fn(security_headers_middleware))
    }

    async fn headers_for(path: &str) -> axum::http::HeaderMap {
        app()
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .headers()
            .clone()
    }

    #[tokio::test]
    async fn test_default_headers() {
        let headers = headers_for("/private").await;
        assert_eq!(headers.get(X_FRAME_OPTIONS).unwrap(), "DENY");
        assert_eq!(headers.get(CACHE_CONTROL).unwrap(), "no-store, max-age=0");
        let csp = headers.get(CONTENT_SECURITY_POLICY).unwrap().to_str().unwrap();
        assert!(csp.contains("https://app.midtrans.com"));
        assert!(csp.contains("frame-ancestors 'none'"));
    }

    #[tokio::test]
    async fn test_handler_cache_policy_kept() {
        let headers = headers_for("/public").await;
        assert_eq!(headers.get(CACHE_CONTROL).unwrap(), "public, max-age=60");
    }
}
