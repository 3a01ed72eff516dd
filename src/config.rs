//! # Application Configuration
//!
//! YAML configuration for the `restdef` binary. Every section is optional:
//!
//! ```yaml
//! server:
//!   addr: "0.0.0.0:8080"
//!   style: resource        # resource | page
//! service:
//!   base_path: /addressbook
//!   action_base_path: /actions/addressbook
//!   form_params: [update]
//! log:
//!   level: info
//!   format: json           # json | pretty
//! ```
//!
//! `RESTDEF_ADDR` and `RESTDEF_STYLE` override the server section and the
//! `RESTDEF_LOG_*` variables override the log section.

use crate::generator::InstallStyle;
use crate::logging::LogConfig;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
    pub style: InstallStyle,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8080".to_string(),
            style: InstallStyle::Resource,
        }
    }
}

/// Where the address-book definitions are bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Entity-style definition
    pub base_path: String,
    /// Action-style definition; `None` skips it
    pub action_base_path: Option<String>,
    /// POST form fields declared by `updateAddressBook`
    pub form_params: Vec<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_path: "/addressbook".to_string(),
            action_base_path: Some("/actions/addressbook".to_string()),
            form_params: vec!["update".to_string()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub service: ServiceConfig,
    pub log: LogConfig,
}

impl AppConfig {
    /// Read `path` and apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = Self::from_yaml(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        config.with_env_overrides()
    }

    /// Defaults plus environment overrides, for running without a file.
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(addr) = env::var("RESTDEF_ADDR") {
            self.server.addr = addr;
        }
        if let Ok(style) = env::var("RESTDEF_STYLE") {
            self.server.style = style.parse().map_err(|e: String| anyhow!(e))?;
        }
        self.log = self.log.with_env_overrides();
        Ok(self)
    }
}
