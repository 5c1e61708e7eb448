//! Store configuration
//!
//! Configuration is resolved in layers: built-in defaults, then an optional
//! TOML properties file, then string overrides (environment variables or an
//! explicit map).

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
pub const DEFAULT_KEY_PREFIX: &str = "graph";
pub const DEFAULT_POOL_MAX_SIZE: usize = 16;
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 2_000;

/// Configuration for the store connection pool and key namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Redis connection URL.
    pub url: String,
    /// Namespace prefix for every key written by the cache.
    pub key_prefix: String,
    /// Maximum number of pooled connections.
    pub pool_max_size: usize,
    /// How long a caller waits for a free connection, in milliseconds.
    pub wait_timeout_ms: u64,
    /// How long opening a new connection may take, in milliseconds.
    pub connect_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_REDIS_URL.to_string(),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            pool_max_size: DEFAULT_POOL_MAX_SIZE,
            wait_timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
        }
    }
}

impl StoreConfig {
    /// Create StoreConfig from environment variables.
    ///
    /// Environment variables:
    /// - `GRAPHCACHE_REDIS_URL`: Redis URL (default: redis://127.0.0.1:6379)
    /// - `GRAPHCACHE_KEY_PREFIX`: Key namespace (default: graph)
    /// - `GRAPHCACHE_POOL_SIZE`: Max pooled connections (default: 16)
    /// - `GRAPHCACHE_POOL_WAIT_TIMEOUT_MS`: Wait for a free connection (default: 5000)
    /// - `GRAPHCACHE_CONNECT_TIMEOUT_MS`: Connection open timeout (default: 2000)
    ///
    /// Unparseable numeric values fall back to their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            url: lookup("GRAPHCACHE_REDIS_URL").unwrap_or(defaults.url),
            key_prefix: lookup("GRAPHCACHE_KEY_PREFIX").unwrap_or(defaults.key_prefix),
            pool_max_size: lookup("GRAPHCACHE_POOL_SIZE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.pool_max_size),
            wait_timeout_ms: lookup("GRAPHCACHE_POOL_WAIT_TIMEOUT_MS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.wait_timeout_ms),
            connect_timeout_ms: lookup("GRAPHCACHE_CONNECT_TIMEOUT_MS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.connect_timeout_ms),
        }
    }

    /// Parse a TOML properties document. Missing keys keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        toml::from_str(source).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })
    }

    /// Load a TOML properties file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Overlay string overrides keyed by field name.
    ///
    /// Unknown keys are ignored; known keys with unparseable values are
    /// rejected.
    pub fn merge_overrides(mut self, overrides: &HashMap<String, String>) -> Result<Self, ConfigError> {
        for (field, value) in overrides {
            match field.as_str() {
                "url" => self.url = value.clone(),
                "key_prefix" => self.key_prefix = value.clone(),
                "pool_max_size" => self.pool_max_size = parse_field(field, value)?,
                "wait_timeout_ms" => self.wait_timeout_ms = parse_field(field, value)?,
                "connect_timeout_ms" => self.connect_timeout_ms = parse_field(field, value)?,
                _ => {
                    tracing::debug!(field = %field, "Ignoring unknown store config override");
                }
            }
        }
        Ok(self)
    }

    /// Reject configurations the pool cannot be built from.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "url".to_string(),
            });
        }
        if self.key_prefix.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "key_prefix".to_string(),
            });
        }
        if self.pool_max_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "pool_max_size".to_string(),
                value: "0".to_string(),
                reason: "pool must hold at least one connection".to_string(),
            });
        }
        Ok(())
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Set the connection URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the key namespace prefix.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Set the max pool size.
    pub fn with_pool_size(mut self, max: usize) -> Self {
        self.pool_max_size = max;
        self
    }
}

fn parse_field<T: std::str::FromStr>(field: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}
