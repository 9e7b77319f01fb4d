use crate::config::Log;
use anyhow::Context;
use std::io::Write;
use std::str::FromStr;
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, registry};

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync>;

const LOG_FILE_PREFIX: &str = "hwmon-exporter";

/// Installs the global subscriber. Keep the returned guard alive for as long
/// as the file layer should be flushed.
pub fn setup_logging(cfg: &Log) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = construct_env_filter(cfg, std::io::stderr());
    let stdout_layer = construct_stdout_layer(cfg);
    let (file_layer, guard) = construct_log_file_layer(cfg)?;

    Registry::default()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    Ok(guard)
}

/// Invalid directives are reported to `diagnostics` and skipped, since no
/// subscriber exists yet to log them.
fn construct_env_filter(cfg: &Log, mut diagnostics: impl Write) -> EnvFilter {
    let default_level = LevelFilter::from_str(&cfg.level).unwrap_or(LevelFilter::INFO);
    let mut filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    for directive in &cfg.directives {
        match directive.parse() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(e) => {
                let _ = writeln!(
                    diagnostics,
                    "Skipping invalid log directive '{:?}': {}",
                    directive, e
                );
            }
        }
    }

    filter
}

fn compact_layer<S, W>(writer: W, ansi: bool) -> BoxedLayer<S>
where
    S: Subscriber + for<'a> registry::LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(true)
        .with_line_number(true)
        .with_level(true)
        .with_span_events(FmtSpan::NONE)
        .compact()
        .boxed()
}

fn construct_stdout_layer<S>(cfg: &Log) -> Option<BoxedLayer<S>>
where
    S: Subscriber + for<'a> registry::LookupSpan<'a>,
{
    cfg.enable_stdout.then(|| compact_layer(std::io::stdout, true))
}

fn construct_log_file_layer<S>(
    cfg: &Log,
) -> anyhow::Result<(Option<BoxedLayer<S>>, Option<WorkerGuard>)>
where
    S: Subscriber + for<'a> registry::LookupSpan<'a>,
{
    if !cfg.enable_log_file {
        return Ok((None, None));
    }

    let Some(directory) = &cfg.log_file_directory else {
        eprintln!("No log file directory specified. Skipping log file configuration.");
        return Ok((None, None));
    };

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .max_log_files(cfg.max_log_files)
        .build(directory)
        .with_context(|| {
            format!("Failed to create file appender for directory [{}]", directory)
        })?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    Ok((Some(compact_layer(non_blocking, false)), Some(guard)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_config(directives: &[&str]) -> Log {
        Log {
            enable_stdout: false,
            enable_log_file: false,
            directives: directives.iter().map(|d| d.to_string()).collect(),
            ..Log::default()
        }
    }

    #[test]
    fn test_invalid_directives_are_reported() {
        let cfg = log_config(&["hwmon_exporter=debug", "hwmon_exporter::server=loud"]);

        let mut diagnostics = Vec::new();
        let filter = construct_env_filter(&cfg, &mut diagnostics);

        let diagnostics = String::from_utf8(diagnostics).unwrap();
        assert!(diagnostics.contains("hwmon_exporter::server=loud"));
        assert!(!diagnostics.contains("hwmon_exporter=debug"));
        assert!(filter.to_string().contains("hwmon_exporter=debug"));
    }

    #[test]
    fn test_log_file_layer_disabled() {
        let (layer, guard) = construct_log_file_layer::<Registry>(&log_config(&[])).unwrap();
        assert!(layer.is_none());
        assert!(guard.is_none());
    }

    #[test]
    fn test_log_file_layer_without_directory() {
        let cfg = Log {
            enable_log_file: true,
            log_file_directory: None,
            ..log_config(&[])
        };

        let (layer, guard) = construct_log_file_layer::<Registry>(&cfg).unwrap();
        assert!(layer.is_none());
        assert!(guard.is_none());
    }

    #[test]
    fn test_log_file_layer_writes_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Log {
            enable_log_file: true,
            log_file_directory: Some(dir.path().to_string_lossy().into_owned()),
            ..log_config(&[])
        };

        let (layer, guard) = construct_log_file_layer::<Registry>(&cfg).unwrap();
        assert!(layer.is_some());
        assert!(guard.is_some());
    }
}
