//! Configuration loading and resolution
//!
//! Each setting is resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing TOML file is not an error; the service starts on defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

pub const ENV_BIND_ADDRESS: &str = "VISION_BIND_ADDRESS";
pub const ENV_API_KEY: &str = "VISION_API_KEY";
pub const ENV_ENDPOINT: &str = "VISION_ENDPOINT";
pub const ENV_LOG_LEVEL: &str = "VISION_LOG_LEVEL";

/// Compiled fallback values
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub bind_address: SocketAddr,
    pub endpoint: String,
    pub request_timeout_secs: u64,
    pub max_image_bytes: u64,
    pub max_concurrent_batches: usize,
    pub log_level: String,
}

impl Default for CompiledDefaults {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 5780)),
            endpoint: "https://vision.googleapis.com/v1".to_string(),
            request_timeout_secs: 30,
            max_image_bytes: 20 * 1024 * 1024,
            max_concurrent_batches: 4,
            log_level: "info".to_string(),
        }
    }
}

/// Logging section of the TOML file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// tracing filter level, e.g. "debug"
    #[serde(default)]
    pub level: Option<String>,
}

/// On-disk TOML configuration. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub bind_address: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub max_image_bytes: Option<u64>,
    #[serde(default)]
    pub max_concurrent_batches: Option<usize>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bind_address: Option<String>,
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    pub log_level: Option<String>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_address: SocketAddr,
    pub api_key: Option<String>,
    pub endpoint: String,
    pub request_timeout: Duration,
    pub max_image_bytes: u64,
    pub max_concurrent_batches: usize,
    pub log_level: String,
}

/// Default config file location: `<config dir>/vision-gateway/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("vision-gateway").join("config.toml"))
}

/// Load a TOML config file
///
/// Returns `Ok(None)` when the file does not exist. A file that exists but
/// cannot be read or parsed is an error.
pub fn load_toml_config(path: &Path) -> Result<Option<TomlConfig>> {
    if !path.exists() {
        warn!("Config file not found at {}, using defaults", path.display());
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))?;

    info!("Loaded config file: {}", path.display());
    Ok(Some(config))
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Merges CLI, environment, TOML and compiled defaults
pub struct ConfigResolver {
    overrides: ConfigOverrides,
    toml: TomlConfig,
    defaults: CompiledDefaults,
}

impl ConfigResolver {
    pub fn new(toml: Option<TomlConfig>) -> Self {
        Self {
            overrides: ConfigOverrides::default(),
            toml: toml.unwrap_or_default(),
            defaults: CompiledDefaults::default(),
        }
    }

    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn resolve(self) -> Result<ServiceConfig> {
        let bind_address = match pick(
            self.overrides.bind_address,
            ENV_BIND_ADDRESS,
            self.toml.bind_address,
        ) {
            Some(raw) => raw
                .parse::<SocketAddr>()
                .map_err(|e| Error::Config(format!("Invalid bind address '{}': {}", raw, e)))?,
            None => self.defaults.bind_address,
        };

        let api_key = pick(self.overrides.api_key, ENV_API_KEY, self.toml.api_key)
            .filter(|k| is_valid_key(k));

        let endpoint = pick(self.overrides.endpoint, ENV_ENDPOINT, self.toml.endpoint)
            .unwrap_or(self.defaults.endpoint)
            .trim_end_matches('/')
            .to_string();

        let log_level = pick(self.overrides.log_level, ENV_LOG_LEVEL, self.toml.logging.level)
            .unwrap_or(self.defaults.log_level);

        let max_concurrent_batches = self
            .toml
            .max_concurrent_batches
            .unwrap_or(self.defaults.max_concurrent_batches);
        if max_concurrent_batches == 0 {
            return Err(Error::Config(
                "max_concurrent_batches must be at least 1".to_string(),
            ));
        }

        let request_timeout_secs = self
            .toml
            .request_timeout_secs
            .unwrap_or(self.defaults.request_timeout_secs);
        if request_timeout_secs == 0 {
            return Err(Error::Config(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }

        Ok(ServiceConfig {
            bind_address,
            api_key,
            endpoint,
            request_timeout: Duration::from_secs(request_timeout_secs),
            max_image_bytes: self
                .toml
                .max_image_bytes
                .unwrap_or(self.defaults.max_image_bytes),
            max_concurrent_batches,
            log_level,
        })
    }
}

/// First non-blank value of CLI, then environment, then TOML
fn pick(cli: Option<String>, env_var: &str, toml: Option<String>) -> Option<String> {
    cli.filter(|v| !v.trim().is_empty())
        .or_else(|| std::env::var(env_var).ok().filter(|v| !v.trim().is_empty()))
        .or_else(|| toml.filter(|v| !v.trim().is_empty()))
}
