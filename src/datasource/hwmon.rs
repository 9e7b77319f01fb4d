use crate::datasource::Reader;
use crate::metrics::hwmon::{DataSource, HwmonError, Sample, Sink};
use std::path::{Path, PathBuf};

const MONITOR_PREFIX: &str = "hwmon";
const SENSOR_PREFIX: &str = "temp";
const INPUT_SUFFIX: &str = "_input";
const LABEL_SUFFIX: &str = "_label";
const NAME_FILE: &str = "name";

/// Extracts `N` from `<prefix>N<suffix>`. `N` must be plain ASCII digits that
/// fit an `u32`; any other name does not match.
fn parse_index(name: &str, prefix: &str, suffix: &str) -> Option<u32> {
    let digits = name.strip_prefix(prefix)?.strip_suffix(suffix)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    digits.parse().ok()
}

fn monitor_index(name: &str) -> Option<u32> {
    parse_index(name, MONITOR_PREFIX, "")
}

fn sensor_index(name: &str) -> Option<u32> {
    parse_index(name, SENSOR_PREFIX, INPUT_SUFFIX)
}

/// Pairs every `hwmon<N>` entry with its path, keeping the listing order.
fn monitors<'a>(
    root: &'a Path,
    entries: &'a [String],
) -> impl Iterator<Item = (u32, PathBuf)> + 'a {
    entries.iter().filter_map(move |entry| match monitor_index(entry) {
        Some(monitor) => Some((monitor, root.join(entry))),
        None => {
            tracing::trace!(entry = %entry, "Skipping non-monitor hwmon entry");
            None
        }
    })
}

/// Parses a reading in millidegrees and converts it to degrees. Like a
/// `%d` scan, leading whitespace is skipped and only the leading
/// `[+-]?digits` run is used.
fn parse_celsius(content: &str) -> Result<f64, std::num::ParseIntError> {
    let content = content.trim_start();
    let sign = usize::from(content.starts_with(['+', '-']));
    let digits = content[sign..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();

    let millidegrees = content[..sign + digits].parse::<i64>()?;
    Ok(millidegrees as f64 / 1000.0)
}

fn non_empty(text: &str, path: PathBuf) -> Result<String, HwmonError> {
    if text.is_empty() {
        return Err(HwmonError::EmptyLabel { path });
    }

    Ok(text.to_owned())
}

pub struct SysfsHwmon<R> {
    reader: R,
    root: PathBuf,
}

impl<R> SysfsHwmon<R>
where
    R: Reader,
{
    pub fn new(reader: R, root: impl Into<PathBuf>) -> Self {
        Self {
            reader,
            root: root.into(),
        }
    }

    async fn list(&self, dir: &Path) -> Result<Vec<String>, HwmonError> {
        self.reader
            .read_dir(dir)
            .await
            .map_err(|source| HwmonError::ReadDir {
                path: dir.to_path_buf(),
                source,
            })
    }

    async fn read(&self, path: PathBuf) -> Result<String, HwmonError> {
        match self.reader.read_to_string(&path).await {
            Ok(content) => Ok(content),
            Err(source) => Err(HwmonError::ReadFile { path, source }),
        }
    }

    async fn read_label(&self, path: PathBuf) -> Result<String, HwmonError> {
        let content = self.read(path.clone()).await?;
        non_empty(content.trim(), path)
    }

    #[tracing::instrument(level = "debug", skip(self, sink))]
    async fn scrape_monitor<S>(
        &self,
        monitor: u32,
        dir: &Path,
        sink: &mut S,
    ) -> Result<(), HwmonError>
    where
        S: Sink + Send,
    {
        let name_path = dir.join(NAME_FILE);
        let name = match self.read(name_path.clone()).await {
            Ok(name) => name,
            Err(e) if e.is_not_found() => {
                tracing::debug!("Monitor has no name file, skipping it");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        for entry in self.list(dir).await? {
            let Some(sensor) = sensor_index(&entry) else {
                continue;
            };

            let input_path = dir.join(&entry);
            let input = self.read(input_path.clone()).await?;
            let label = self
                .read_label(dir.join(format!("{SENSOR_PREFIX}{sensor}{LABEL_SUFFIX}")))
                .await?;

            let celsius = parse_celsius(&input).map_err(|source| HwmonError::Parse {
                path: input_path,
                source,
            })?;

            // Checked per sample: monitors without temperature inputs may have a blank name
            let monitor_type = non_empty(name.trim(), name_path.clone())?;

            sink.emit(Sample {
                monitor_type,
                monitor,
                sensor,
                label,
                celsius,
            });
        }

        Ok(())
    }
}

impl<R> DataSource for SysfsHwmon<R>
where
    R: Reader,
{
    #[tracing::instrument(level = "debug", skip_all, fields(root = %self.root.display()))]
    async fn temperatures<S>(&self, sink: &mut S) -> Result<(), HwmonError>
    where
        S: Sink + Send,
    {
        let entries = self.list(&self.root).await?;

        for (monitor, dir) in monitors(&self.root, &entries) {
            self.scrape_monitor(monitor, &dir, sink).await?;
        }

        Ok(())
    }
}
