use crate::config::Collectors;
use crate::datasource::TokioReader;
use crate::domain::{Collector, Metric};
use crate::metrics::scrape::{InstrumentedCollector, ScrapeMetrics};
use crate::{datasource, metrics};
use prometheus::Registry;

pub fn init_collectors(
    config: &Collectors,
    registry: &Registry,
) -> anyhow::Result<Vec<Box<dyn Collector>>> {
    let scrape_metrics = ScrapeMetrics::register(registry)?;
    let mut collectors = vec![];

    if config.hwmon.enabled {
        let root = config.hwmon.hwmon_root();
        tracing::info!(root = %root.display(), "Enabling the {} collector", metrics::hwmon::NAME);

        let data_source = datasource::hwmon::SysfsHwmon::new(TokioReader::new(), root);
        let hwmon = metrics::hwmon::Hwmon::new(data_source);
        collectors.push(instrument(hwmon, registry, &scrape_metrics)?);
    } else {
        tracing::info!("The {} collector is disabled", metrics::hwmon::NAME);
    }

    Ok(collectors)
}

fn instrument(
    metric: impl Metric,
    registry: &Registry,
    scrape_metrics: &ScrapeMetrics,
) -> anyhow::Result<Box<dyn Collector>> {
    let name = metric.name();
    let collector = metric.register(registry)?;

    Ok(Box::new(InstrumentedCollector::new(
        name,
        collector,
        scrape_metrics.clone(),
    )))
}
