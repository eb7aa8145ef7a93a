use std::fs;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use lingxi_chat::config::ServerConfig;
use lingxi_chat::server;
use tempfile::TempDir;
use tower::ServiceExt;

const INDEX: &str = "<!doctype html><title>chat</title>";

fn app() -> (TempDir, Router) {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("index.html"), INDEX).unwrap();
    fs::write(dir.path().join("script.js"), "console.log('hi');").unwrap();

    let config = ServerConfig {
        addr: "127.0.0.1:0".parse().unwrap(),
        root: dir.path().to_path_buf(),
        api_origin: "http://localhost:8888".to_string(),
    };
    let router = server::router(&config).unwrap();
    (dir, router)
}

async fn get(router: Router, uri: &str) -> axum::response::Response {
    router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_text(resp: axum::response::Response) -> String {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn serves_assets_with_long_cache() {
    let (_dir, router) = app();
    let resp = get(router, "/script.js").await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CACHE_CONTROL).unwrap(),
        "public, max-age=31536000, immutable"
    );
    assert_eq!(body_text(resp).await, "console.log('hi');");
}

#[tokio::test]
async fn unknown_routes_fall_back_to_index() {
    let (_dir, router) = app();
    let resp = get(router, "/some/client/route").await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().get(header::CACHE_CONTROL).is_none());
    assert_eq!(body_text(resp).await, INDEX);
}

#[tokio::test]
async fn root_serves_index() {
    let (_dir, router) = app();
    let resp = get(router, "/").await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_text(resp).await, INDEX);
}

#[tokio::test]
async fn every_response_has_security_headers() {
    let (_dir, router) = app();
    let resp = get(router, "/missing.png").await;

    let headers = resp.headers();
    assert!(headers.get(header::CACHE_CONTROL).is_none());
    let csp = headers
        .get(header::CONTENT_SECURITY_POLICY)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(csp.contains("script-src 'self'"));
    assert!(csp.contains("https://cdnjs.cloudflare.com"));
    assert!(csp.contains("connect-src 'self' http://localhost:8888"));
    assert_eq!(headers.get(header::X_CONTENT_TYPE_OPTIONS).unwrap(), "nosniff");
    assert_eq!(headers.get(header::X_FRAME_OPTIONS).unwrap(), "SAMEORIGIN");
    assert_eq!(headers.get(header::REFERRER_POLICY).unwrap(), "no-referrer");
}

#[tokio::test]
async fn bundled_entry_document_is_served() {
    let config = ServerConfig {
        addr: "127.0.0.1:0".parse().unwrap(),
        root: std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("web"),
        api_origin: "http://localhost:8888".to_string(),
    };
    let router = server::router(&config).unwrap();
    let resp = get(router, "/").await;

    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_text(resp).await;
    assert!(html.contains("<title>Lingxi Chat</title>"));
    assert!(!html.contains("<button"));
    assert!(!html.contains("disabled"));
}
