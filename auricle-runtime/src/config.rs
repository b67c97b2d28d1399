//! # Runtime Configuration
//!
//! Configuration for the plugin runtime: where plugins and scoped
//! storage live on disk, the token-bucket parameters for the two
//! rate-limited channels, the sweeper cadence and the outbound HTTP
//! budget.
//!
//! ## Sources
//!
//! Configuration is loaded from a TOML file, then environment-variable
//! overrides are applied, then the result is validated:
//!
//! ```toml
//! plugin_root = "plugins"
//! storage_dir = "plugin-storage"
//! sweep_interval = "30s"
//! http_timeout = "30s"
//!
//! [rate_limits]
//! api_capacity = 30
//! api_refill_per_sec = 10.0
//! storage_capacity = 10
//! storage_refill_per_sec = 2.0
//! ```
//!
//! ## Environment Overrides
//!
//! | Variable | Overrides |
//! |----------|-----------|
//! | `AURICLE_PLUGIN_ROOT` | `plugin_root` |
//! | `AURICLE_STORAGE_DIR` | `storage_dir` |
//! | `AURICLE_SWEEP_INTERVAL` | `sweep_interval` (duration string) |
//! | `AURICLE_HTTP_TIMEOUT` | `http_timeout` (duration string) |
//! | `AURICLE_LOG_LEVEL` | tracing env filter used by [`init_logging`] |
//!
//! Duration strings accept `ms`, `s`, `m` and `h` suffixes ("500ms",
//! "30s", "1m", "2h").

use crate::error::RuntimeError;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Token-bucket parameters for the per-plugin rate limiters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Burst capacity of the api-calls bucket
    pub api_capacity: u32,
    /// Steady-state refill of the api-calls bucket, tokens per second
    pub api_refill_per_sec: f64,
    /// Burst capacity of the storage-writes bucket
    pub storage_capacity: u32,
    /// Steady-state refill of the storage-writes bucket, tokens per second
    pub storage_refill_per_sec: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            api_capacity: 30,
            api_refill_per_sec: 10.0,
            storage_capacity: 10,
            storage_refill_per_sec: 2.0,
        }
    }
}

/// Complete runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Directory holding one subdirectory per plugin (`<safe_name>/`)
    pub plugin_root: PathBuf,
    /// Directory for the durable layer of scoped storage
    pub storage_dir: PathBuf,
    /// Token-bucket parameters
    #[serde(default)]
    pub rate_limits: RateLimitConfig,
    /// Cadence of the detached-resource sweeper
    #[serde(with = "duration_serde", default = "RuntimeConfig::default_sweep_interval")]
    pub sweep_interval: Duration,
    /// Per-request budget for proxied outbound HTTP
    #[serde(with = "duration_serde", default = "RuntimeConfig::default_http_timeout")]
    pub http_timeout: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            plugin_root: PathBuf::from("plugins"),
            storage_dir: PathBuf::from("plugin-storage"),
            rate_limits: RateLimitConfig::default(),
            sweep_interval: Self::default_sweep_interval(),
            http_timeout: Self::default_http_timeout(),
        }
    }
}

impl RuntimeConfig {
    fn default_sweep_interval() -> Duration {
        Duration::from_secs(30)
    }

    fn default_http_timeout() -> Duration {
        Duration::from_secs(30)
    }

    /// Load from a TOML file, apply environment overrides and validate.
    pub fn load(path: &str) -> Result<Self, RuntimeError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: RuntimeConfig = toml::from_str(&content)
            .map_err(|e| RuntimeError::config(format!("invalid config file {path}: {e}")))?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `AURICLE_*` environment overrides.
    pub fn apply_env_overrides(&mut self) -> Result<(), RuntimeError> {
        if let Ok(root) = env::var("AURICLE_PLUGIN_ROOT") {
            if !root.is_empty() {
                self.plugin_root = PathBuf::from(root);
            }
        }
        if let Ok(dir) = env::var("AURICLE_STORAGE_DIR") {
            if !dir.is_empty() {
                self.storage_dir = PathBuf::from(dir);
            }
        }
        if let Ok(interval) = env::var("AURICLE_SWEEP_INTERVAL") {
            self.sweep_interval = parse_duration(&interval)?;
        }
        if let Ok(timeout) = env::var("AURICLE_HTTP_TIMEOUT") {
            self.http_timeout = parse_duration(&timeout)?;
        }
        Ok(())
    }

    /// Validate configuration constraints.
    pub fn validate(&self) -> Result<(), RuntimeError> {
        if self.plugin_root.as_os_str().is_empty() {
            return Err(RuntimeError::config("plugin_root cannot be empty"));
        }
        if self.storage_dir.as_os_str().is_empty() {
            return Err(RuntimeError::config("storage_dir cannot be empty"));
        }
        if self.rate_limits.api_capacity == 0 {
            return Err(RuntimeError::config("api_capacity must be at least 1"));
        }
        if self.rate_limits.storage_capacity == 0 {
            return Err(RuntimeError::config("storage_capacity must be at least 1"));
        }
        if self.rate_limits.api_refill_per_sec < 0.0
            || self.rate_limits.storage_refill_per_sec < 0.0
        {
            return Err(RuntimeError::config("refill rates cannot be negative"));
        }
        if self.sweep_interval.is_zero() {
            return Err(RuntimeError::config("sweep_interval cannot be 0"));
        }
        Ok(())
    }
}

/// Parse a duration string with `ms`/`s`/`m`/`h` suffix.
pub fn parse_duration(s: &str) -> Result<Duration, RuntimeError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(RuntimeError::config("empty duration string"));
    }
    if let Some(stripped) = s.strip_suffix("ms") {
        let num: u64 = stripped
            .parse()
            .map_err(|_| RuntimeError::config(format!("invalid duration number: {stripped}")))?;
        return Ok(Duration::from_millis(num));
    }
    if let Some(stripped) = s.strip_suffix('s') {
        let num: f64 = stripped
            .parse()
            .map_err(|_| RuntimeError::config(format!("invalid duration number: {stripped}")))?;
        let secs = num.trunc() as u64;
        let nanos = (num.fract() * 1_000_000_000.0).round() as u32;
        return Ok(Duration::new(secs, nanos));
    }
    if let Some(stripped) = s.strip_suffix('m') {
        let num: u64 = stripped
            .parse()
            .map_err(|_| RuntimeError::config(format!("invalid duration number: {stripped}")))?;
        return Ok(Duration::from_secs(num * 60));
    }
    if let Some(stripped) = s.strip_suffix('h') {
        let num: u64 = stripped
            .parse()
            .map_err(|_| RuntimeError::config(format!("invalid duration number: {stripped}")))?;
        return Ok(Duration::from_secs(num * 3600));
    }
    Err(RuntimeError::config(format!("unknown duration unit: {s}")))
}

/// Duration fields serialize as suffix strings ("30s") and accept the
/// same forms [`parse_duration`] does.
pub mod duration_serde {
    use super::parse_duration;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() != 0 {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        } else {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(Error::custom)
    }
}

/// Install a global tracing subscriber honoring `AURICLE_LOG_LEVEL`
/// (falling back to `RUST_LOG`, then `info`). Safe to call once per
/// process; embedders that install their own subscriber skip this.
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = env::var("AURICLE_LOG_LEVEL")
        .or_else(|_| env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_parsing_accepts_all_suffixes() {
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("1m").unwrap(), Duration::from_secs(60));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert!(parse_duration("").is_err());
        assert!(parse_duration("30x").is_err());
        assert!(parse_duration("abc").is_err());
    }

    #[test]
    fn defaults_validate() {
        RuntimeConfig::default().validate().unwrap();
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let mut config = RuntimeConfig::default();
        config.rate_limits.api_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn toml_round_trip_with_duration_strings() {
        let toml_src = r#"
            plugin_root = "plugins"
            storage_dir = "plugin-storage"
            sweep_interval = "45s"
            http_timeout = "500ms"

            [rate_limits]
            api_capacity = 3
            api_refill_per_sec = 0.0
            storage_capacity = 1
            storage_refill_per_sec = 0.0
        "#;
        let config: RuntimeConfig = toml::from_str(toml_src).unwrap();
        assert_eq!(config.sweep_interval, Duration::from_secs(45));
        assert_eq!(config.http_timeout, Duration::from_millis(500));
        assert_eq!(config.rate_limits.api_capacity, 3);
        config.validate().unwrap();
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = RuntimeConfig::default();
        env::set_var("AURICLE_PLUGIN_ROOT", "/opt/auricle/plugins");
        env::set_var("AURICLE_SWEEP_INTERVAL", "5s");
        config.apply_env_overrides().unwrap();
        assert_eq!(config.plugin_root, PathBuf::from("/opt/auricle/plugins"));
        assert_eq!(config.sweep_interval, Duration::from_secs(5));
        env::remove_var("AURICLE_PLUGIN_ROOT");
        env::remove_var("AURICLE_SWEEP_INTERVAL");
    }
}
