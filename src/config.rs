//! # Configuration Module
//!
//! Where the module tree lives and how long parsed modules stay cached.
//!
//! ## Environment Variables
//!
//! ### `MODROUTE_WEBPATH`
//!
//! Base web directory. Default: `webapp`
//!
//! ### `MODROUTE_ENDPOINT_PATH`
//!
//! Module directory, resolved against the web path. Default: `.`
//!
//! ### `MODROUTE_PARSE_INTERVAL_MS`
//!
//! How long the module cache may stay idle before the next request rescans:
//!
//! - `0` - rescan on every request (development)
//! - `> 0` - rescan after that many idle milliseconds
//! - `< 0` - never rescan unless invalidated explicitly
//!
//! Default: `3000`
//!
//! ### `MODROUTE_TICK_MS`
//!
//! Period of the idle check. Default: `500`
//!
//! ## Files
//!
//! [`DispatchConfig::load`] reads the same settings from a `.toml`,
//! `.yaml`/`.yml` or `.json` file. Missing keys take their defaults.
//!
//! ```toml
//! web_path = "/srv/webapp"
//! endpoint_path = "restxq"
//! parse_interval_ms = -1
//! extensions = ["xqm"]
//! ```

use crate::store::CachePolicy;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default module file extensions
pub const DEFAULT_EXTENSIONS: [&str; 6] = ["xq", "xqm", "xqy", "xql", "xqu", "xquery"];

/// Dispatch configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Base web directory
    pub web_path: PathBuf,
    /// Module directory relative to `web_path` (or absolute)
    pub endpoint_path: PathBuf,
    /// Rescan interval in milliseconds; see [`CachePolicy::from_millis`]
    pub parse_interval_ms: i64,
    /// Recognized module file extensions, without the dot
    pub extensions: Vec<String>,
    /// Idle check period in milliseconds
    pub tick_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            web_path: PathBuf::from("webapp"),
            endpoint_path: PathBuf::from("."),
            parse_interval_ms: 3000,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            tick_ms: 500,
        }
    }
}

impl DispatchConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables keep their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Override fields with any `MODROUTE_*` variables that are set.
    pub fn apply_env(&mut self) {
        if let Ok(val) = env::var("MODROUTE_WEBPATH") {
            self.web_path = PathBuf::from(val);
        }
        if let Ok(val) = env::var("MODROUTE_ENDPOINT_PATH") {
            self.endpoint_path = PathBuf::from(val);
        }
        if let Some(ms) = env::var("MODROUTE_PARSE_INTERVAL_MS")
            .ok()
            .and_then(|v| v.trim().parse().ok())
        {
            self.parse_interval_ms = ms;
        }
        if let Some(ms) = env::var("MODROUTE_TICK_MS")
            .ok()
            .and_then(|v| v.trim().parse().ok())
        {
            self.tick_ms = ms;
        }
    }

    /// Load configuration from a file, choosing the format by extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let config = match ext.as_str() {
            "toml" => toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config {}", path.display()))?,
            "yaml" | "yml" => serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config {}", path.display()))?,
            "json" => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config {}", path.display()))?,
            other => bail!(
                "Unsupported config format '{}' for {} (expected toml, yaml or json)",
                other,
                path.display()
            ),
        };
        Ok(config)
    }

    /// Module root: `endpoint_path` resolved against `web_path`.
    #[must_use]
    pub fn root(&self) -> PathBuf {
        if self.endpoint_path.as_os_str().is_empty() || self.endpoint_path == Path::new(".") {
            self.web_path.clone()
        } else {
            self.web_path.join(&self.endpoint_path)
        }
    }

    #[must_use]
    pub fn policy(&self) -> CachePolicy {
        CachePolicy::from_millis(self.parse_interval_ms)
    }

    #[must_use]
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }
}
