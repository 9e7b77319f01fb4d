use hwmon_exporter::bootstrap::init_collectors;
use hwmon_exporter::config::{
    Configuration, get_config_base_path, print_config, should_print_config_and_exit,
};
use hwmon_exporter::logging::setup_logging;
use hwmon_exporter::server::start_server;
use hwmon_exporter::server::state::AppState;
use std::sync::Arc;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let configuration = Configuration::load(get_config_base_path(std::env::args())?)?;
    if should_print_config_and_exit(std::env::args()) {
        print_config(&configuration)?;
        return Ok(());
    }

    let configuration = Arc::new(configuration);
    let _guard = setup_logging(&configuration.log)?;
    tracing::info!("Starting hwmon-exporter");

    let registry = prometheus::Registry::new();
    let collectors = Arc::new(init_collectors(&configuration.collectors, &registry)?);

    let state = AppState {
        configuration,
        registry,
        collectors,
    };

    start_server(state).await?;
    tracing::info!("Bye!");

    Ok(())
}
