use std::sync::Arc;

use log::{error, info};

use super::context::AppContext;
use crate::configuration::config::Config;
use crate::error_handling::types::*;
use crate::web_interface::web_server::WebServer;

/// Owns the service lifecycle: builds the shared context, serves HTTP and
/// WebSocket traffic until the server fails or Ctrl-C arrives, then stops
/// the log source.
pub struct Controller {
    pub config: Config,
    context: Arc<AppContext>,
}

impl Controller {
    pub fn new(config: Config) -> Result<Self, ControllerError> {
        info!("[+] Creating controller");
        config.validate().map_err(|err| {
            error!("[!] Invalid configuration: {}", err);
            ControllerError::from(err)
        })?;

        let context = AppContext::new(config.clone());
        Ok(Self { config, context })
    }

    pub fn context(&self) -> &Arc<AppContext> {
        &self.context
    }

    pub async fn run(&self) -> Result<(), ControllerError> {
        info!("[+] Starting controller");

        let pump = self.context.spawn_ingest_pump().ok_or_else(|| {
            ControllerError::InitializationFailed("ingest pump already started".to_string())
        })?;
        let server = WebServer::new(Arc::clone(&self.context));

        let result = tokio::select! {
            served = server.start() => served.map_err(ControllerError::from),
            signal = tokio::signal::ctrl_c() => {
                match signal {
                    Ok(()) => info!("[+] Shutdown signal received"),
                    Err(err) => error!("[!] Unable to listen for shutdown signal: {}", err),
                }
                Ok(())
            }
        };

        self.shutdown();
        pump.abort();
        result
    }

    pub fn shutdown(&self) {
        info!("[+] Shutting down controller");
        self.context.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = Config {
            tick_interval_ms: 0,
            ..Config::default()
        };
        assert!(matches!(
            Controller::new(config),
            Err(ControllerError::ConfigurationError(ConfigError::NotInRange(_)))
        ));
    }

    #[tokio::test]
    async fn test_run_fails_on_unusable_address() {
        let config = Config {
            api_host: "not an address".to_string(),
            ..Config::default()
        };
        let controller = Controller::new(config).unwrap();

        assert!(matches!(
            controller.run().await,
            Err(ControllerError::WebError(WebError::InvalidAddress(_)))
        ));
        assert!(!controller.context().supervisor.is_running());
    }
}
