use serde::{Deserialize, Serialize};
use std::fmt;

/// Deployment classification read at startup.
///
/// Only `production` (case-insensitive) is special: it turns synthetic log
/// generation off by default. Any other value is reported back verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Environment(pub String);

impl Environment {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn is_production(&self) -> bool {
        self.0.eq_ignore_ascii_case("production")
    }

    /// Synthetic data is the default everywhere except production.
    pub fn default_synthetic(&self) -> bool {
        !self.is_production()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self("development".to_string())
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Environment {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

/// How the live tail subprocess is invoked.
#[derive(Debug, Clone, PartialEq)]
pub struct TailCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl TailCommand {
    /// `<program> containerapp logs show --name <app> --resource-group <rg> --follow --tail 0`
    pub fn follow(program: &str, app_name: &str, resource_group: &str) -> Self {
        let args = [
            "containerapp",
            "logs",
            "show",
            "--name",
            app_name,
            "--resource-group",
            resource_group,
            "--follow",
            "--tail",
            "0",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        Self {
            program: program.to_string(),
            args,
        }
    }
}
