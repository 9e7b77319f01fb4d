use crate::metrics::hwmon;
use anyhow::Context;
use config::{Config, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const FLAG_PRINT_CONFIG: &str = "--print-config";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Log {
    pub enable_stdout: bool,
    pub enable_log_file: bool,
    pub log_file_directory: Option<String>,
    pub level: String,
    pub directives: Vec<String>,
    pub max_log_files: usize,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            enable_stdout: true,
            enable_log_file: false,
            log_file_directory: Some("/tmp/var/log/hwmon-exporter/".to_owned()),
            level: "INFO".to_owned(),
            directives: vec![],
            max_log_files: 7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Http {
    pub address: String,
    pub port: u16,
    /// Request timeout in milliseconds
    pub timeout: u64,
}

impl Default for Http {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_owned(),
            port: 9100,
            timeout: Duration::from_secs(10).as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Collectors {
    #[serde(default = "hwmon::Config::default")]
    pub hwmon: hwmon::Config,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(default = "Log::default")]
    pub log: Log,

    #[serde(default = "Http::default")]
    pub http: Http,

    #[serde(default = "Collectors::default")]
    pub collectors: Collectors,
}

impl Configuration {
    /// Loads `config.toml` and `config.json` from `base_path` (both optional),
    /// then applies `CFG__<SECTION>__<KEY>` environment overrides.
    pub fn load(base_path: impl AsRef<Path>) -> Result<Self, config::ConfigError> {
        let base_path = base_path.as_ref();

        Config::builder()
            .add_source(
                config::File::from(base_path.join("config.toml"))
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                config::File::from(base_path.join("config.json"))
                    .format(FileFormat::Json)
                    .required(false),
            )
            .add_source(config::Environment::with_prefix("CFG").separator("__"))
            .build()?
            .try_deserialize()
    }
}

/// The first positional argument is the directory holding the configuration
/// files; defaults to the working directory.
pub fn get_config_base_path(args: impl IntoIterator<Item = String>) -> anyhow::Result<PathBuf> {
    let base_path = args
        .into_iter()
        .skip(1)
        .find(|arg| !arg.starts_with("--"))
        .unwrap_or_else(|| "./".to_owned());

    let base_path = PathBuf::from(base_path);
    if base_path.exists() && !base_path.is_dir() {
        anyhow::bail!(
            "The configuration path [{}] is not a directory",
            base_path.display()
        );
    }

    Ok(base_path)
}

pub fn should_print_config_and_exit(args: impl IntoIterator<Item = String>) -> bool {
    args.into_iter().skip(1).any(|arg| arg == FLAG_PRINT_CONFIG)
}

pub fn print_config(configuration: &Configuration) -> anyhow::Result<()> {
    let text = toml::to_string_pretty(configuration)
        .context("Failed to serialize the configuration")?;
    println!("{}", text);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_defaults_without_config_files() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Configuration::load(dir.path()).unwrap();

        assert!(cfg.collectors.hwmon.enabled);
        assert_eq!(cfg.collectors.hwmon.sysfs_path, "/sys");
        assert_eq!(cfg.http.port, 9100);
        assert_eq!(cfg.log.level, "INFO");
    }

    #[test]
    fn test_load_toml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            r#"
[http]
address = "127.0.0.1"
port = 9200
timeout = 2500

[collectors.hwmon]
sysfs_path = "/host/sys"
"#,
        )
        .unwrap();

        let cfg = Configuration::load(dir.path()).unwrap();

        assert_eq!(cfg.http.address, "127.0.0.1");
        assert_eq!(cfg.http.port, 9200);
        assert_eq!(cfg.http.timeout, 2500);
        assert!(cfg.collectors.hwmon.enabled);
        assert_eq!(cfg.collectors.hwmon.sysfs_path, "/host/sys");
    }

    #[test]
    fn test_load_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.json"),
            r#"{ "collectors": { "hwmon": { "enabled": false } } }"#,
        )
        .unwrap();

        let cfg = Configuration::load(dir.path()).unwrap();
        assert!(!cfg.collectors.hwmon.enabled);
        assert_eq!(cfg.collectors.hwmon.sysfs_path, "/sys");
    }

    #[test]
    fn test_config_base_path() {
        assert_eq!(
            get_config_base_path(args(&["bin"])).unwrap(),
            PathBuf::from("./")
        );
        assert_eq!(
            get_config_base_path(args(&["bin", "--print-config", "/nonexistent/etc"])).unwrap(),
            PathBuf::from("/nonexistent/etc")
        );

        let file = tempfile::NamedTempFile::new().unwrap();
        let arg = file.path().to_string_lossy().into_owned();
        assert!(get_config_base_path(vec!["bin".to_owned(), arg]).is_err());
    }

    #[test]
    fn test_print_config_flag() {
        assert!(should_print_config_and_exit(args(&["bin", "--print-config"])));
        assert!(should_print_config_and_exit(args(&["bin", "./", "--print-config"])));
        assert!(!should_print_config_and_exit(args(&["bin", "./"])));
        assert!(!should_print_config_and_exit(args(&["--print-config"])));
    }
}
