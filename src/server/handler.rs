use crate::server::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use futures::StreamExt;
use futures::stream::FuturesUnordered;

pub async fn health_check() -> &'static str {
    "OK"
}

/// Runs every collector, then serves whatever the registry holds. A failed
/// collector is logged and reported through its scrape metrics only.
pub async fn metrics(State(state): State<AppState>) -> Result<String, (StatusCode, String)> {
    let mut futures = FuturesUnordered::new();

    for collector in state.collectors.iter() {
        futures.push(collector.collect());
    }

    while let Some(result) = futures.next().await {
        if let Err(error) = result {
            tracing::error!(?error, "a metrics collector failed");
        }
    }

    let metric_families = state.registry.gather();
    let encoder = prometheus::TextEncoder::new();

    encoder.encode_to_string(&metric_families).map_err(|e| {
        tracing::error!(error = ?e, "Failed to encode the metrics");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })
}
