use clap::Parser;
use live_metrics::configuration::config::Config;
use live_metrics::controller::controller_handler::Controller;
use log::{error, info};

#[tokio::main]
async fn main() {
    // RUST_LOG overrides the default level
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .init();

    println!(
        "
==============================================================================
   _     _               __  __      _        _
  | |   (_)_   _____    |  \\/  | ___| |_ _ __(_) ___ ___
  | |   | \\ \\ / / _ \\   | |\\/| |/ _ \\ __| '__| |/ __/ __|
  | |___| |\\ V /  __/   | |  | |  __/ |_| |  | | (__\\__ \\
  |_____|_| \\_/ \\___|   |_|  |_|\\___|\\__|_|  |_|\\___|___/
==============================================================================
            Real-time request metrics over WebSocket v{}
==============================================================================
",
        env!("CARGO_PKG_VERSION")
    );

    info!("Importing configuration");

    let config = match Config::parse().resolve() {
        Ok(config) => config,
        Err(e) => {
            error!("Unable to import configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Configuration imported successfully (environment: {})",
        config.environment
    );

    let controller = match Controller::new(config) {
        Ok(controller) => controller,
        Err(e) => {
            error!("Unable to create a controller instance: {}, exiting...", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = controller.run().await {
        error!("Error occurred in the controller process: {}, exiting...", e);
        std::process::exit(1);
    }

    info!("Live Metrics stopped");
}
