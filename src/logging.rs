//! Structured logging setup.
//!
//! Every stage of binding and dispatch emits `tracing` events with
//! structured fields. This module installs the subscriber: an `EnvFilter`
//! plus a JSON (production) or pretty (development) fmt layer.
//!
//! Settings come from the `log` section of the config file and may be
//! overridden by environment variables:
//!
//! | variable                       | meaning                                  |
//! |--------------------------------|------------------------------------------|
//! | `RESTDEF_LOG_LEVEL`            | trace, debug, info, warn, error          |
//! | `RESTDEF_LOG_FORMAT`           | json or pretty                           |
//! | `RESTDEF_LOG_TARGET_FILTER`    | extra comma-separated filter directives  |
//! | `RESTDEF_LOG_INCLUDE_LOCATION` | include file and line (`true`/`false`)   |
//!
//! `RUST_LOG`, when set, replaces the level.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Log format: JSON for production, pretty-print for development
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl LogFormat {
    /// Anything but `pretty` is JSON.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// trace/debug/info/warn/error
    pub level: String,
    pub format: LogFormat,
    /// Extra filter directives, comma-separated (e.g. `restdef::router=debug`)
    pub target_filter: Option<String>,
    /// Include file:line location
    pub include_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
            target_filter: None,
            include_location: false,
        }
    }
}

impl LogConfig {
    /// Defaults overridden by the environment.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply any `RESTDEF_LOG_*` variables on top of `self`.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(level) = env::var("RESTDEF_LOG_LEVEL") {
            self.level = level;
        }
        if let Ok(format) = env::var("RESTDEF_LOG_FORMAT") {
            self.format = LogFormat::parse(&format);
        }
        if let Ok(filter) = env::var("RESTDEF_LOG_TARGET_FILTER") {
            self.target_filter = Some(filter);
        }
        if let Some(include) = env::var("RESTDEF_LOG_INCLUDE_LOCATION")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            self.include_location = include;
        }
        self
    }

    /// Level as a `tracing` level; unknown names fall back to INFO.
    pub fn level(&self) -> Level {
        match self.level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }

    /// Filter built from the level and target directives.
    pub fn env_filter(&self) -> EnvFilter {
        let mut env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level().as_str()));

        // client disconnects are logged by the server at info/debug
        if let Ok(directive) = "may_minihttp=warn".parse() {
            env_filter = env_filter.add_directive(directive);
        }

        if let Some(target_filter) = &self.target_filter {
            for filter in target_filter.split(',').map(str::trim).filter(|f| !f.is_empty()) {
                match filter.parse() {
                    Ok(directive) => env_filter = env_filter.add_directive(directive),
                    Err(_) => eprintln!("Warning: Invalid log filter directive: {filter}"),
                }
            }
        }
        env_filter
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_logging_with_config(config: &LogConfig) -> Result<()> {
    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_span_list(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(config.env_filter())
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize logging")
}

/// Install the subscriber at `level` with the remaining settings from the environment.
pub fn init_logging(level: &str) -> Result<()> {
    let mut config = LogConfig::from_env();
    config.level = level.to_string();
    init_logging_with_config(&config)
}
