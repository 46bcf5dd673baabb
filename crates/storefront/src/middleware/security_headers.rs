//! Security headers applied to every storefront response.
//!
//! Pages carry session state (cart, checkout token, flash messages), so they
//! are never cached. Photos are served from an external CDN over https and
//! the only off-site form target is the provider's hosted checkout.

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

/// Content Security Policy for server-rendered pages.
///
/// No inline scripts: the checkout hand-off page redirects with a meta
/// refresh and a plain link.
pub const CONTENT_SECURITY_POLICY: &str = "default-src 'none'; \
     script-src 'self'; \
     style-src 'self'; \
     font-src 'self'; \
     img-src 'self' https:; \
     connect-src 'self'; \
     frame-src 'none'; \
     object-src 'none'; \
     base-uri 'self'; \
     form-action 'self' https://checkout.stripe.com; \
     frame-ancestors 'none'; \
     upgrade-insecure-requests";

/// Browser features the shop never needs.
const PERMISSIONS_POLICY: &str = "camera=(), microphone=(), geolocation=(), \
     payment=(), usb=(), serial=(), hid=(), midi=(), \
     display-capture=(), screen-wake-lock=(), xr-spatial-tracking=(), \
     browsing-topics=(), interest-cohort=()";

/// Header name and value pairs, in the order they are set.
const HEADERS: [(&str, &str); 10] = [
    ("x-frame-options", "DENY"),
    ("x-content-type-options", "nosniff"),
    ("referrer-policy", "no-referrer"),
    ("content-security-policy", CONTENT_SECURITY_POLICY),
    ("permissions-policy", PERMISSIONS_POLICY),
    ("cache-control", "no-store, max-age=0"),
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-resource-policy", "same-origin"),
    // Photo CDNs do not send CORP headers, so require-corp would block previews
    ("cross-origin-embedder-policy", "credentialless"),
    ("x-dns-prefetch-control", "off"),
];

/// Add the security headers to the response, replacing any a handler set.
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    for (name, value) in HEADERS {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }

    response
}
