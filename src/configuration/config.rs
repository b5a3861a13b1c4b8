use super::types::*;
use crate::error_handling::types::ConfigError;
use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_ENVIRONMENT: &str = "development";
pub const DEFAULT_API_HOST: &str = "0.0.0.0";
pub const DEFAULT_API_PORT: u16 = 8000;
pub const DEFAULT_CONTAINER_APP_NAME: &str = "ca-sk-appinsights";
pub const DEFAULT_RESOURCE_GROUP: &str = "rg-sk-appinsights";
pub const DEFAULT_TAIL_PROGRAM: &str = "az";
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_WINDOW_SECS: u64 = 60;
pub const DEFAULT_SYNTHETIC_INTERVAL_MS: u64 = 1500;
pub const DEFAULT_SESSION_QUEUE_CAPACITY: usize = 256;
pub const DEFAULT_INGEST_QUEUE_CAPACITY: usize = 1024;
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";

/// Application configuration structure that defines all runtime parameters.
///
/// The same structure is filled either from the command line (every field has
/// a `--long` flag and an environment variable fallback, via `clap`) or from a
/// TOML file (via `serde`, every key optional). When `--config-file` is given
/// the file wins and the remaining flags are ignored.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use live_metrics::configuration::config::Config;
///
/// let config = Config::parse();
/// println!("Binding to {}:{}", config.api_host, config.api_port);
/// ```
#[derive(Parser, Deserialize, Debug, Clone, PartialEq)]
#[command(name = "live-metrics")]
#[command(about = "Real-time request metrics over WebSocket")]
#[serde(default)]
pub struct Config {
    /// Optional TOML configuration file
    ///
    /// # Command Line
    /// Use `--config-file <PATH>`
    #[arg(long)]
    #[serde(skip)]
    pub config_file: Option<PathBuf>,

    /// Deployment classification
    ///
    /// `production` disables synthetic log generation at startup, anything else
    /// enables it.
    #[arg(long, env = "ENVIRONMENT", default_value = DEFAULT_ENVIRONMENT)]
    pub environment: String,

    /// Address the HTTP server binds to
    #[arg(long, env = "API_HOST", default_value = DEFAULT_API_HOST)]
    pub api_host: String,

    /// Port the HTTP server listens on
    #[arg(long, env = "API_PORT", default_value_t = DEFAULT_API_PORT)]
    pub api_port: u16,

    /// Name of the container app whose logs are tailed in live mode
    #[arg(long, env = "CONTAINER_APP_NAME", default_value = DEFAULT_CONTAINER_APP_NAME)]
    pub container_app_name: String,

    /// Resource group of the container app
    #[arg(long, env = "RESOURCE_GROUP", default_value = DEFAULT_RESOURCE_GROUP)]
    pub resource_group: String,

    /// External log tailing tool
    ///
    /// Invoked as `<program> containerapp logs show --name <app> --resource-group <rg> --follow --tail 0`.
    /// When it cannot be found on the `PATH` the source falls back to synthetic data.
    #[arg(long, env = "LIVE_METRICS_TAIL_PROGRAM", default_value = DEFAULT_TAIL_PROGRAM)]
    pub tail_program: String,

    /// Seconds without a tailed line before falling back to synthetic data
    ///
    /// Setting this to '0' disables the timeout: a stalled tail process then
    /// just produces no records.
    #[arg(long, env = "LIVE_METRICS_TAIL_READ_TIMEOUT_SECS", default_value_t = 0)]
    pub tail_read_timeout_secs: u64,

    /// Interval between `traffic_update` broadcasts, in milliseconds
    #[arg(long, default_value_t = DEFAULT_TICK_INTERVAL_MS)]
    pub tick_interval_ms: u64,

    /// Length of the aggregation window, in seconds
    #[arg(long, default_value_t = DEFAULT_WINDOW_SECS)]
    pub window_secs: u64,

    /// Pause between synthetic batches, in milliseconds
    #[arg(long, default_value_t = DEFAULT_SYNTHETIC_INTERVAL_MS)]
    pub synthetic_interval_ms: u64,

    /// Outbound queue depth for each WebSocket subscriber
    #[arg(long, default_value_t = DEFAULT_SESSION_QUEUE_CAPACITY)]
    pub session_queue_capacity: usize,

    /// Depth of the channel between the log source and the broadcast loop
    #[arg(long, default_value_t = DEFAULT_INGEST_QUEUE_CAPACITY)]
    pub ingest_queue_capacity: usize,

    /// Origins allowed to call the API from a browser (comma separated)
    #[arg(long, env = "CORS_ORIGINS", value_delimiter = ',', default_value = DEFAULT_CORS_ORIGIN)]
    pub cors_origins: Vec<String>,

    /// Record requests served by this process into the live window
    #[arg(long, env = "LIVE_METRICS_RECORD_HTTP_TRAFFIC", default_value_t = true, action = clap::ArgAction::Set)]
    pub record_http_traffic: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_file: None,
            environment: DEFAULT_ENVIRONMENT.to_string(),
            api_host: DEFAULT_API_HOST.to_string(),
            api_port: DEFAULT_API_PORT,
            container_app_name: DEFAULT_CONTAINER_APP_NAME.to_string(),
            resource_group: DEFAULT_RESOURCE_GROUP.to_string(),
            tail_program: DEFAULT_TAIL_PROGRAM.to_string(),
            tail_read_timeout_secs: 0,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            window_secs: DEFAULT_WINDOW_SECS,
            synthetic_interval_ms: DEFAULT_SYNTHETIC_INTERVAL_MS,
            session_queue_capacity: DEFAULT_SESSION_QUEUE_CAPACITY,
            ingest_queue_capacity: DEFAULT_INGEST_QUEUE_CAPACITY,
            cors_origins: vec![DEFAULT_CORS_ORIGIN.to_string()],
            record_http_traffic: true,
        }
    }
}

impl Config {
    /// Loads and validates a configuration from a TOML file.
    ///
    /// Missing keys take their default value.
    pub fn from_file(path: &Path) -> Result<Config, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&raw)?;
        config.config_file = Some(path.to_path_buf());
        config.validate()?;
        Ok(config)
    }

    /// Resolves the effective configuration from already parsed arguments.
    pub fn resolve(self) -> Result<Config, ConfigError> {
        match &self.config_file {
            Some(path) => Config::from_file(path),
            None => {
                self.validate()?;
                Ok(self)
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_host.trim().is_empty() {
            return Err(ConfigError::MissingValue("api_host".to_string()));
        }
        if self.tail_program.trim().is_empty() {
            return Err(ConfigError::MissingValue("tail_program".to_string()));
        }
        let positive = [
            ("tick_interval_ms", self.tick_interval_ms),
            ("window_secs", self.window_secs),
            ("synthetic_interval_ms", self.synthetic_interval_ms),
            ("session_queue_capacity", self.session_queue_capacity as u64),
            ("ingest_queue_capacity", self.ingest_queue_capacity as u64),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ConfigError::NotInRange(format!(
                    "{} must be greater than 0",
                    name
                )));
            }
        }
        for origin in &self.cors_origins {
            let valid = origin == "*"
                || origin.starts_with("http://")
                || origin.starts_with("https://");
            if !valid {
                return Err(ConfigError::NotInRange(format!(
                    "cors origin '{}' must be '*' or an http(s) origin",
                    origin
                )));
            }
        }
        Ok(())
    }

    pub fn environment(&self) -> Environment {
        Environment::new(self.environment.clone())
    }

    pub fn tail_command(&self) -> TailCommand {
        TailCommand::follow(
            &self.tail_program,
            &self.container_app_name,
            &self.resource_group,
        )
    }

    pub fn tail_read_timeout(&self) -> Option<Duration> {
        match self.tail_read_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn synthetic_interval(&self) -> Duration {
        Duration::from_millis(self.synthetic_interval_ms)
    }
}
