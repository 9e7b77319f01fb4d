use crate::domain::{Collector, Metric};
use crate::metrics::util::{gauge, into_labels};
use prometheus::Registry;
use prometheus::core::Desc;
use prometheus::proto::MetricFamily;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::num::ParseIntError;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

pub const NAME: &str = "hwmon";

const LABEL_MONITOR_TYPE: &str = "monitorType";
const LABEL_MONITOR: &str = "monitor";
const LABEL_SENSOR: &str = "sensor";
const LABEL_LABEL: &str = "label";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub enabled: bool,
    /// Mount point of sysfs; monitors are discovered under `<sysfs_path>/class/hwmon`.
    pub sysfs_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: true,
            sysfs_path: "/sys".to_owned(),
        }
    }
}

impl Config {
    pub fn hwmon_root(&self) -> PathBuf {
        PathBuf::from(&self.sysfs_path).join("class").join("hwmon")
    }
}

/// One temperature reading of one sensor, as exported.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Trimmed content of the monitor's `name` file, e.g. `coretemp`.
    pub monitor_type: String,
    pub monitor: u32,
    pub sensor: u32,
    pub label: String,
    pub celsius: f64,
}

impl Sample {
    /// Label values in the order the gauge declares its labels.
    pub fn label_values(&self) -> [String; 4] {
        [
            self.monitor_type.clone(),
            self.monitor.to_string(),
            self.sensor.to_string(),
            self.label.clone(),
        ]
    }
}

/// Receives samples one at a time while a scrape is in progress. Anything
/// emitted stays emitted, even if the scrape fails later on.
pub trait Sink {
    fn emit(&mut self, sample: Sample);
}

impl Sink for Vec<Sample> {
    fn emit(&mut self, sample: Sample) {
        self.push(sample);
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HwmonError {
    #[error("failed to list directory [{}]: {source}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read file [{}]: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse the temperature in [{}]: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseIntError,
    },

    #[error("file [{}] holds no text to use as a label", path.display())]
    EmptyLabel { path: PathBuf },
}

impl HwmonError {
    pub fn is_not_found(&self) -> bool {
        match self {
            HwmonError::ReadDir { source, .. } | HwmonError::ReadFile { source, .. } => {
                source.kind() == std::io::ErrorKind::NotFound
            }
            _ => false,
        }
    }
}

pub trait DataSource {
    /// Walks every monitor and streams one sample per temperature sensor into
    /// `sink`. Stops at the first error.
    fn temperatures<S>(&self, sink: &mut S) -> impl Future<Output = Result<(), HwmonError>> + Send
    where
        S: Sink + Send;
}

#[derive(Clone)]
struct Metrics {
    state: Arc<Mutex<Vec<Sample>>>,
    temp: Desc,
}

impl Metrics {
    fn new(state: Arc<Mutex<Vec<Sample>>>) -> anyhow::Result<Self> {
        let labels = [LABEL_MONITOR_TYPE, LABEL_MONITOR, LABEL_SENSOR, LABEL_LABEL]
            .map(str::to_owned)
            .to_vec();

        Ok(Self {
            state,
            temp: Desc::new(
                "node_hwmon_temp".into(),
                "Hardware temperatures.".into(),
                labels,
                HashMap::new(),
            )?,
        })
    }

    fn register(&self, registry: &Registry) -> anyhow::Result<()> {
        registry.register(Box::new(self.clone()))?;
        Ok(())
    }
}

impl prometheus::core::Collector for Metrics {
    fn desc(&self) -> Vec<&Desc> {
        vec![&self.temp]
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let guard = self.state.lock().unwrap_or_else(|e| e.into_inner());

        guard
            .iter()
            .map(|sample| {
                let [monitor_type, monitor, sensor, label] = sample.label_values();
                let labels = into_labels(&[
                    (LABEL_MONITOR_TYPE, monitor_type.as_str()),
                    (LABEL_MONITOR, monitor.as_str()),
                    (LABEL_SENSOR, sensor.as_str()),
                    (LABEL_LABEL, label.as_str()),
                ]);

                gauge(&self.temp, labels, sample.celsius)
            })
            .collect()
    }
}

pub struct Hwmon<T> {
    data_source: T,
}

impl<T> Hwmon<T>
where
    T: DataSource,
{
    pub fn new(data_source: T) -> Self {
        Self { data_source }
    }
}

impl<T> Metric for Hwmon<T>
where
    T: DataSource + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        NAME
    }

    fn register(self, registry: &Registry) -> anyhow::Result<Box<dyn Collector>> {
        let collector = HwmonCollector::new(self.data_source);
        let metrics = Metrics::new(collector.measurements())?;
        metrics.register(registry)?;

        Ok(Box::new(collector))
    }
}

struct HwmonCollector<T> {
    measurement: Arc<Mutex<Vec<Sample>>>,
    data_source: T,
}

impl<T> HwmonCollector<T>
where
    T: DataSource,
{
    fn new(data_source: T) -> Self {
        Self {
            measurement: Arc::new(Mutex::new(Vec::new())),
            data_source,
        }
    }

    fn measurements(&self) -> Arc<Mutex<Vec<Sample>>> {
        Arc::clone(&self.measurement)
    }
}

#[async_trait::async_trait]
impl<T> Collector for HwmonCollector<T>
where
    T: DataSource + Send + Sync + 'static,
{
    #[tracing::instrument(level = "debug", skip_all)]
    async fn collect(&self) -> anyhow::Result<()> {
        let mut samples = Vec::new();
        let result = self.data_source.temperatures(&mut samples).await;

        tracing::debug!(samples = samples.len(), "Scraped hwmon temperatures");

        // A failed cycle still publishes what was emitted before the failure
        let mut guard = self.measurement.lock().unwrap_or_else(|e| e.into_inner());
        *guard = samples;
        drop(guard);

        // Logged by whoever drives the collection
        result?;
        Ok(())
    }
}
