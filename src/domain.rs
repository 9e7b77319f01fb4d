use prometheus::Registry;

pub trait Metric {
    /// The key the collector is known under, e.g. in the scrape metrics.
    fn name(&self) -> &'static str;

    fn register(self, registry: &Registry) -> anyhow::Result<Box<dyn Collector>>;
}

#[async_trait::async_trait]
pub trait Collector: Send + Sync + 'static {
    async fn collect(&self) -> anyhow::Result<()>;
}
