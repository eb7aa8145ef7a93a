//! Static asset server for the browser widget.
//!
//! Every path that does not name a file under the asset root is answered with
//! `index.html`, so client-side routes survive a reload.

pub mod security;

use std::any::Any;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, HeaderValue, Response, StatusCode},
    middleware, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::error::{ChatError, Result};

pub fn router(config: &ServerConfig) -> Result<Router> {
    let csp = HeaderValue::from_str(&security::content_security_policy(&config.api_origin))
        .map_err(|e| ChatError::Config(format!("invalid content security policy: {}", e)))?;

    if !config.index_file().is_file() {
        warn!("{} does not exist, unmatched routes will 404", config.index_file().display());
    }

    let assets = ServeDir::new(&config.root)
        .append_index_html_on_directories(true)
        .fallback(ServeFile::new(config.index_file()));

    Ok(Router::new()
        .fallback_service(assets)
        .layer(middleware::from_fn(security::asset_cache_control))
        .layer(middleware::from_fn_with_state(Arc::new(csp), security::security_headers))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic)))
}

pub async fn serve(config: ServerConfig) -> Result<()> {
    let app = router(&config)?;
    let listener = TcpListener::bind(config.addr).await?;
    let addr = listener.local_addr()?;

    info!("Serving {} on http://{}", config.root.display(), addr);
    info!("Started at {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let details = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!("Server error: {}", details);

    let body = json!({ "error": "internal server error" }).to_string();
    let mut resp = Response::new(Body::from(body));
    *resp.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    resp.headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    resp
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        if let Ok(mut stream) = signal(SignalKind::terminate()) {
            let _ = stream.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutting down server");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_is_reported_as_json_500() {
        let resp = handle_panic(Box::new("boom"));
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }
}
