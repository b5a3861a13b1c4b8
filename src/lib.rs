pub mod configuration;
pub mod controller;
pub mod error_handling;
pub mod log_ingest;
pub mod metrics;
pub mod session_management;
pub mod web_interface;

pub use controller::Controller;
