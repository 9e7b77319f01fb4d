use crate::server::shutdown::shutdown_signal;
use crate::config::Http;
use crate::server::state::AppState;
use anyhow::Context;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::get;
use std::net::ToSocketAddrs;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tower::Layer;
use tower_http::LatencyUnit;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::normalize_path::NormalizePathLayer;
use tower_http::request_id::{
    MakeRequestUuid, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::Level;

pub mod handler;
pub mod shutdown;
pub mod state;

pub async fn start_server(state: AppState) -> anyhow::Result<()> {
    let listeners = bind_listeners(&state.configuration.http).await?;
    let router = create_router(state);

    let mut servers = JoinSet::new();
    for listener in listeners {
        let router = router.clone();
        servers.spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await
        });
    }

    // The first listener to fail takes the whole exporter down
    while let Some(outcome) = servers.join_next().await {
        outcome
            .context("Server task panicked")?
            .context("Server failed")?;
    }

    Ok(())
}

/// Binds one listener per address the configured host resolves to.
async fn bind_listeners(http: &Http) -> anyhow::Result<Vec<TcpListener>> {
    let addresses = (http.address.as_str(), http.port)
        .to_socket_addrs()
        .with_context(|| format!("Could not resolve [{}:{}]", http.address, http.port))?;

    let mut listeners = Vec::new();
    for addr in addresses {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Could not bind to {}", addr))?;

        tracing::info!("Listening on {}", listener.local_addr()?);
        listeners.push(listener);
    }

    if listeners.is_empty() {
        anyhow::bail!(
            "The bind address [{}:{}] did not resolve to any IP addresses",
            http.address,
            http.port
        );
    }

    Ok(listeners)
}

fn request_span(request: &Request<Body>) -> tracing::Span {
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .and_then(|id| id.header_value().to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        request_id = %request_id,
        method = %request.method(),
        uri = %request.uri(),
    )
}

fn create_router(state: AppState) -> Router {
    let timeout = Duration::from_millis(state.configuration.http.timeout);

    let router = Router::new()
        .route("/metrics", get(handler::metrics))
        .route("/health", get(handler::health_check))
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::INTERNAL_SERVER_ERROR,
            timeout,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(request_span)
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .latency_unit(LatencyUnit::Millis),
                ),
        )
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state);

    Router::new().fallback_service(NormalizePathLayer::trim_trailing_slash().layer(router))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Configuration;
    use prometheus::Registry;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn empty_state() -> AppState {
        AppState {
            configuration: Arc::new(Configuration::default()),
            registry: Registry::new(),
            collectors: Arc::new(Vec::new()),
        }
    }

    async fn get_status(uri: &str) -> (StatusCode, Option<String>) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = create_router(empty_state()).oneshot(request).await.unwrap();

        let request_id = response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        (response.status(), request_id)
    }

    #[tokio::test]
    async fn test_routes() {
        let (status, request_id) = get_status("/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(request_id.is_some());

        assert_eq!(get_status("/metrics/").await.0, StatusCode::OK);
        assert_eq!(get_status("/health").await.0, StatusCode::OK);
        assert_eq!(get_status("/nope").await.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_bind_listeners_on_loopback() {
        let http = Http {
            address: "127.0.0.1".to_owned(),
            port: 0,
            ..Http::default()
        };

        let listeners = bind_listeners(&http).await.unwrap();
        assert_eq!(listeners.len(), 1);
        assert!(listeners[0].local_addr().unwrap().ip().is_loopback());
    }

    #[tokio::test]
    async fn test_bind_listeners_unresolvable() {
        let http = Http {
            address: "not a host name".to_owned(),
            ..Http::default()
        };

        assert!(bind_listeners(&http).await.is_err());
    }
}
