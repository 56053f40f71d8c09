//! # Runtime Configuration Module
//!
//! Environment variable-based configuration for the adapter and the parameter
//! pipeline.
//!
//! ## Environment Variables
//!
//! ### `ROUTETREE_SCHEMA_CACHE`
//!
//! `on` (default) or `off`. When off, parameter schemas are compiled on every
//! request instead of once.
//!
//! ### `ROUTETREE_COERCE_PARAMS`
//!
//! `true` or `false` (default). When true, path and query strings are converted
//! to the scalar types their schema declares before validation.
//!
//! ### `ROUTETREE_MAX_BODY_BYTES`
//!
//! Largest request body the axum adapter buffers. Accepts values in:
//! - Decimal: `1048576`
//! - Hexadecimal: `0x100000`
//!
//! Default: `0x200000` (2 MiB)
//!
//! ## Usage
//!
//! ```rust
//! use routetree::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! println!("Body limit: {} bytes", config.max_body_bytes);
//! ```
//!
//! Invalid values fall back to the defaults.

use std::env;

/// Default body limit (2 MiB)
pub const DEFAULT_MAX_BODY_BYTES: usize = 0x20_0000;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Cache compiled parameter schemas
    pub schema_cache: bool,
    /// Coerce path/query strings before validation
    pub coerce_params: bool,
    /// Body read limit in bytes
    pub max_body_bytes: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            schema_cache: true,
            coerce_params: false,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        RuntimeConfig {
            schema_cache: lookup("ROUTETREE_SCHEMA_CACHE")
                .map(|v| !matches!(v.to_ascii_lowercase().as_str(), "off" | "false" | "0"))
                .unwrap_or(defaults.schema_cache),
            coerce_params: lookup("ROUTETREE_COERCE_PARAMS")
                .and_then(|v| v.to_ascii_lowercase().parse().ok())
                .unwrap_or(defaults.coerce_params),
            max_body_bytes: lookup("ROUTETREE_MAX_BODY_BYTES")
                .and_then(|v| parse_size(&v))
                .unwrap_or(defaults.max_body_bytes),
        }
    }
}

fn parse_size(val: &str) -> Option<usize> {
    let val = val.trim();
    if let Some(hex) = val.strip_prefix("0x") {
        usize::from_str_radix(hex, 16).ok()
    } else {
        val.parse().ok()
    }
}
