use std::fmt;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    NotInRange(String),
    MissingValue(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::NotInRange(e) => write!(f, "Value out of range: {}", e),
            ConfigError::MissingValue(e) => write!(f, "Missing value: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::TomlError(err.to_string())
    }
}

/// Failures of the live log source. None of these reach subscribers: each one
/// makes the source fall back to synthetic generation.
#[derive(Debug)]
pub enum SourceError {
    ToolingUnavailable(String),
    SpawnFailed(std::io::Error),
    StdoutUnavailable,
    StreamClosed,
    ReadFailed(std::io::Error),
    ReadTimeout(u64),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::ToolingUnavailable(p) => write!(f, "Log tail tool not found: {}", p),
            SourceError::SpawnFailed(e) => write!(f, "Failed to spawn log tail process: {}", e),
            SourceError::StdoutUnavailable => write!(f, "Log tail process has no stdout"),
            SourceError::StreamClosed => write!(f, "Log tail stream closed"),
            SourceError::ReadFailed(e) => write!(f, "Log tail read error: {}", e),
            SourceError::ReadTimeout(secs) => {
                write!(f, "No log line received within {} seconds", secs)
            }
        }
    }
}

impl std::error::Error for SourceError {}

#[derive(Debug)]
pub enum BroadcastError {
    Serialization(serde_json::Error),
    SessionClosed,
    QueueFull,
    UnknownSession,
}

impl fmt::Display for BroadcastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BroadcastError::Serialization(e) => write!(f, "Envelope serialization error: {}", e),
            BroadcastError::SessionClosed => write!(f, "Subscriber session closed"),
            BroadcastError::QueueFull => write!(f, "Subscriber outbound queue full"),
            BroadcastError::UnknownSession => write!(f, "Subscriber session not registered"),
        }
    }
}

impl std::error::Error for BroadcastError {}

impl From<serde_json::Error> for BroadcastError {
    fn from(err: serde_json::Error) -> Self {
        BroadcastError::Serialization(err)
    }
}

#[derive(Debug)]
pub enum WebError {
    InvalidAddress(String),
    ServerFailed(String),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebError::InvalidAddress(e) => write!(f, "Invalid bind address: {}", e),
            WebError::ServerFailed(e) => write!(f, "Web server failed: {}", e),
        }
    }
}

impl std::error::Error for WebError {}

#[derive(Debug)]
pub enum ControllerError {
    ConfigurationError(ConfigError),
    WebError(WebError),
    InitializationFailed(String),
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::ConfigurationError(e) => write!(f, "Configuration error: {}", e),
            ControllerError::WebError(e) => write!(f, "Web error: {}", e),
            ControllerError::InitializationFailed(e) => write!(f, "Initialization failed: {}", e),
        }
    }
}

impl std::error::Error for ControllerError {}

impl From<ConfigError> for ControllerError {
    fn from(err: ConfigError) -> Self {
        ControllerError::ConfigurationError(err)
    }
}

impl From<WebError> for ControllerError {
    fn from(err: WebError) -> Self {
        ControllerError::WebError(err)
    }
}
