//! Structured logging initialization
//!
//! Every diagnostic in this crate is a `tracing` event with structured fields.
//! Applications that do not install their own subscriber can call
//! [`init_logging`] once at startup.
//!
//! ## Environment Variables
//!
//! - `ROUTETREE_LOG_LEVEL` - base level, `info` by default. `RUST_LOG` wins when set.
//! - `ROUTETREE_LOG_FORMAT` - `json` (default) or `pretty`
//! - `ROUTETREE_LOG_TARGET_FILTER` - extra comma-separated directives, e.g.
//!   `routetree::adapter=debug,hyper=warn`
//! - `ROUTETREE_LOG_INCLUDE_LOCATION` - `true` to add file and line to each event

use std::env;

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Output encoding of log events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per line
    #[default]
    Json,
    /// Multi-line human readable output
    Pretty,
}

impl LogFormat {
    /// Anything but `pretty` selects JSON
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("pretty") {
            LogFormat::Pretty
        } else {
            LogFormat::Json
        }
    }
}

/// How [`init_logging`] builds the global subscriber
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
    /// Extra `EnvFilter` directives applied on top of `level`
    pub target_filter: Option<String>,
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
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read the `ROUTETREE_LOG_*` keys through `lookup`; missing or unparsable
    /// values keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            level: lookup("ROUTETREE_LOG_LEVEL").unwrap_or(defaults.level),
            format: lookup("ROUTETREE_LOG_FORMAT")
                .map(|v| LogFormat::parse(&v))
                .unwrap_or(defaults.format),
            target_filter: lookup("ROUTETREE_LOG_TARGET_FILTER").filter(|v| !v.trim().is_empty()),
            include_location: lookup("ROUTETREE_LOG_INCLUDE_LOCATION")
                .and_then(|v| v.to_ascii_lowercase().parse().ok())
                .unwrap_or(defaults.include_location),
        }
    }

    /// Verbose pretty output for local development
    #[must_use]
    pub fn default_dev() -> Self {
        Self {
            level: "debug".to_string(),
            format: LogFormat::Pretty,
            target_filter: None,
            include_location: true,
        }
    }

    fn filter(&self) -> EnvFilter {
        let mut filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level.to_lowercase()));
        let directives = self.target_filter.as_deref().unwrap_or_default();
        for directive in directives.split(',').map(str::trim).filter(|d| !d.is_empty()) {
            match directive.parse() {
                Ok(directive) => filter = filter.add_directive(directive),
                Err(_) => eprintln!("Warning: Invalid log filter directive: {directive}"),
            }
        }
        filter
    }
}

/// Install the global subscriber
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(config.filter()))
        .try_init()
        .context("Failed to initialize logging")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(LogFormat::parse("PRETTY"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("other"), LogFormat::Json);
    }

    #[test]
    fn test_config_from_lookup() {
        assert_eq!(LogConfig::from_lookup(lookup(&[])), LogConfig::default());

        let config = LogConfig::from_lookup(lookup(&[
            ("ROUTETREE_LOG_LEVEL", "warn"),
            ("ROUTETREE_LOG_FORMAT", "pretty"),
            ("ROUTETREE_LOG_TARGET_FILTER", " "),
            ("ROUTETREE_LOG_INCLUDE_LOCATION", "TRUE"),
        ]));
        assert_eq!(config.level, "warn");
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(config.target_filter, None);
        assert!(config.include_location);
    }

    #[test]
    fn test_second_init_is_an_error() {
        let config = LogConfig::default_dev();
        init_logging(&config).ok();
        assert!(init_logging(&config).is_err());
    }
}
