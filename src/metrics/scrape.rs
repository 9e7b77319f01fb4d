use crate::domain::Collector;
use prometheus::{GaugeVec, Opts, Registry};
use tokio::time::Instant;

/// Per-collector bookkeeping, labelled by the collector's key.
#[derive(Clone)]
pub struct ScrapeMetrics {
    duration: GaugeVec,
    success: GaugeVec,
}

impl ScrapeMetrics {
    pub fn register(registry: &Registry) -> anyhow::Result<Self> {
        let duration = GaugeVec::new(
            Opts::new(
                "node_scrape_collector_duration_seconds",
                "Duration of a collector scrape.",
            ),
            &["collector"],
        )?;
        registry.register(Box::new(duration.clone()))?;

        let success = GaugeVec::new(
            Opts::new(
                "node_scrape_collector_success",
                "Whether a collector succeeded.",
            ),
            &["collector"],
        )?;
        registry.register(Box::new(success.clone()))?;

        Ok(Self { duration, success })
    }
}

pub struct InstrumentedCollector {
    name: &'static str,
    inner: Box<dyn Collector>,
    metrics: ScrapeMetrics,
}

impl InstrumentedCollector {
    pub fn new(name: &'static str, inner: Box<dyn Collector>, metrics: ScrapeMetrics) -> Self {
        Self {
            name,
            inner,
            metrics,
        }
    }
}

#[async_trait::async_trait]
impl Collector for InstrumentedCollector {
    #[tracing::instrument(level = "debug", skip_all, fields(collector = self.name))]
    async fn collect(&self) -> anyhow::Result<()> {
        let started = Instant::now();
        let result = self.inner.collect().await;
        let elapsed = started.elapsed();

        self.metrics
            .duration
            .with_label_values(&[self.name])
            .set(elapsed.as_secs_f64());
        self.metrics
            .success
            .with_label_values(&[self.name])
            .set(if result.is_ok() { 1.0 } else { 0.0 });

        tracing::debug!(elapsed = ?elapsed, ok = result.is_ok(), "Collector finished");
        result
    }
}
