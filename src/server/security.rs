//! Response headers for the widget server.
//!
//! | Header                      | Value                                      |
//! |-----------------------------|--------------------------------------------|
//! | `Content-Security-Policy`   | self plus the font/style CDNs and the chat API |
//! | `X-Content-Type-Options`    | `nosniff`                                  |
//! | `X-Frame-Options`           | `SAMEORIGIN`                               |
//! | `Referrer-Policy`           | `no-referrer`                              |
//! | `Strict-Transport-Security` | `max-age=15552000; includeSubDomains`      |
//! | `Cache-Control`             | one year, immutable, for static asset extensions |

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};

static NO_SNIFF: HeaderValue = HeaderValue::from_static("nosniff");
static SAME_ORIGIN_FRAME: HeaderValue = HeaderValue::from_static("SAMEORIGIN");
static NO_REFERRER: HeaderValue = HeaderValue::from_static("no-referrer");
static HSTS: HeaderValue = HeaderValue::from_static("max-age=15552000; includeSubDomains");
static LONG_CACHE: HeaderValue = HeaderValue::from_static("public, max-age=31536000, immutable");

const CACHEABLE_EXTENSIONS: &[&str] = &[
    "css", "js", "jpg", "jpeg", "png", "gif", "ico", "svg", "woff", "woff2", "ttf", "eot",
];

/// Build the content security policy; `api_origin` is added to `connect-src`.
pub fn content_security_policy(api_origin: &str) -> String {
    [
        "default-src 'self'".to_string(),
        "style-src 'self' 'unsafe-inline' https://fonts.googleapis.com https://cdnjs.cloudflare.com"
            .to_string(),
        "font-src 'self' https://fonts.gstatic.com https://cdnjs.cloudflare.com".to_string(),
        "script-src 'self' 'unsafe-inline'".to_string(),
        "img-src 'self' data: https:".to_string(),
        format!("connect-src 'self' {}", api_origin),
    ]
    .join("; ")
}

/// Append security headers to every outgoing response.
pub async fn security_headers(
    State(csp): State<Arc<HeaderValue>>,
    req: Request,
    next: Next,
) -> Response {
    let mut resp = next.run(req).await;
    let h = resp.headers_mut();
    h.insert(header::CONTENT_SECURITY_POLICY, (*csp).clone());
    h.insert(header::X_CONTENT_TYPE_OPTIONS, NO_SNIFF.clone());
    h.insert(header::X_FRAME_OPTIONS, SAME_ORIGIN_FRAME.clone());
    h.insert(header::REFERRER_POLICY, NO_REFERRER.clone());
    h.insert(header::STRICT_TRANSPORT_SECURITY, HSTS.clone());
    resp
}

/// Long-lived caching for fingerprinted asset types. A missing asset answered
/// with the HTML entry document is not cached.
pub async fn asset_cache_control(req: Request, next: Next) -> Response {
    let cacheable = is_cacheable_path(req.uri().path());
    let mut resp = next.run(req).await;
    let is_html = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("text/html"))
        .unwrap_or(false);
    if cacheable && !is_html && resp.status().is_success() {
        resp.headers_mut()
            .insert(header::CACHE_CONTROL, LONG_CACHE.clone());
    }
    resp
}

fn is_cacheable_path(path: &str) -> bool {
    path.rsplit_once('.')
        .map(|(_, ext)| {
            !ext.contains('/')
                && CACHEABLE_EXTENSIONS
                    .iter()
                    .any(|e| e.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}
