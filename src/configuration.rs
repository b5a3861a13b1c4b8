//! Runtime configuration: command line, environment and TOML file loading.

pub mod config;
pub mod types;

pub use config::Config;
pub use types::{Environment, TailCommand};
