use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use axum::http::StatusCode;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::api::{self, AppState};
use crate::config::PowerFetchConfig;

const MAX_BODY_BYTES: usize = 64 * 1024;

pub fn app(state: AppState, request_timeout: Duration) -> Router {
    with_layers(
        Router::new().nest("/api", api::router(state)),
        request_timeout,
    )
}

fn with_layers(router: Router, request_timeout: Duration) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

pub async fn run(config: &PowerFetchConfig) -> Result<()> {
    let state = AppState::from_config(config)?;
    let app = app(
        state,
        Duration::from_secs(config.server.request_timeout_seconds),
    );
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));

    if let (Some(cert), Some(key)) = (&config.server.tls_cert, &config.server.tls_key) {
        return serve_tls(app, addr, cert, key).await;
    }

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Web server running at http://localhost:{}", config.server.port);
    axum::serve(listener, app)
        .await
        .with_context(|| "Web server stopped")
}

#[cfg(feature = "tls")]
async fn serve_tls(
    app: Router,
    addr: SocketAddr,
    cert: &std::path::Path,
    key: &std::path::Path,
) -> Result<()> {
    use axum_server::tls_rustls::RustlsConfig;

    // Both ring and aws-lc-rs may be compiled in; pick one explicitly.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let tls = RustlsConfig::from_pem_file(cert, key)
        .await
        .with_context(|| format!("Failed to load TLS material from {}", cert.display()))?;
    tracing::info!("Web server running at https://localhost:{}", addr.port());
    axum_server::bind_rustls(addr, tls)
        .serve(app.into_make_service())
        .await
        .with_context(|| "Web server stopped")
}

#[cfg(not(feature = "tls"))]
async fn serve_tls(
    _app: Router,
    _addr: SocketAddr,
    _cert: &std::path::Path,
    _key: &std::path::Path,
) -> Result<()> {
    anyhow::bail!("TLS is configured but powerfetch was built without the `tls` feature")
}
