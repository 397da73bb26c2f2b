//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::cache::{compression::DEFAULT_MIN_COMPRESS_SIZE, DEFAULT_MAX_CACHE_SIZE};
use crate::policy::AccessPolicy;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum aggregate cache size in bytes
    pub max_cache_size: u64,
    /// Lifetime of cached entries in seconds
    pub default_ttl: u64,
    /// Background expiry sweep interval in seconds
    pub cleanup_interval: u64,
    /// Payloads below this size are never compressed
    pub min_compress_size: u64,
    /// HTTP server port
    pub server_port: u16,
    /// When false, the access-policy middleware lets everything through
    pub bucket_policies_enabled: bool,
    pub bucket_policies: AccessPolicy,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_CACHE_SIZE` - Maximum cache size in bytes (default: 100 MB)
    /// - `DEFAULT_TTL` - Entry lifetime in seconds (default: 300)
    /// - `CLEANUP_INTERVAL` - Expiry sweep frequency in seconds (default: 60, zero is rejected)
    /// - `MIN_COMPRESS_SIZE` - Compression threshold in bytes (default: 1024)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `BUCKET_POLICIES_ENABLED` - `true`/`false` (default: true)
    /// - `BUCKET_POLICIES` - e.g. `public:read,uploads:write,admin:all`
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            max_cache_size: env_or("MAX_CACHE_SIZE", defaults.max_cache_size),
            default_ttl: env_or("DEFAULT_TTL", defaults.default_ttl),
            cleanup_interval: positive_or("CLEANUP_INTERVAL", defaults.cleanup_interval),
            min_compress_size: env_or("MIN_COMPRESS_SIZE", defaults.min_compress_size),
            server_port: env_or("SERVER_PORT", defaults.server_port),
            bucket_policies_enabled: env_or(
                "BUCKET_POLICIES_ENABLED",
                defaults.bucket_policies_enabled,
            ),
            bucket_policies: env::var("BUCKET_POLICIES")
                .map(|raw| AccessPolicy::parse(&raw))
                .unwrap_or_default(),
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl)
    }

    pub fn cleanup_period(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval)
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Like [`env_or`], but a zero value falls back to `default`.
fn positive_or(name: &str, default: u64) -> u64 {
    match env_or(name, default) {
        0 => {
            warn!(name, default, "zero is not a valid value, using default");
            default
        }
        value => value,
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_cache_size: DEFAULT_MAX_CACHE_SIZE,
            default_ttl: 300,
            cleanup_interval: 60,
            min_compress_size: DEFAULT_MIN_COMPRESS_SIZE,
            server_port: 3000,
            bucket_policies_enabled: true,
            bucket_policies: AccessPolicy::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.max_cache_size, 100 * 1024 * 1024);
        assert_eq!(config.default_ttl, 300);
        assert_eq!(config.cleanup_interval, 60);
        assert_eq!(config.min_compress_size, 1024);
        assert_eq!(config.server_port, 3000);
        assert!(config.bucket_policies_enabled);
        assert!(config.bucket_policies.is_empty());
    }

    #[test]
    fn test_config_durations() {
        let config = Config::default();
        assert_eq!(config.ttl(), Duration::from_secs(300));
        assert_eq!(config.cleanup_period(), Duration::from_secs(60));
    }

    #[test]
    fn test_config_from_env() {
        // Single test touches the environment to avoid races between tests
        env::remove_var("MAX_CACHE_SIZE");
        env::remove_var("DEFAULT_TTL");
        env::remove_var("SERVER_PORT");
        env::set_var("CLEANUP_INTERVAL", "0");
        env::remove_var("MIN_COMPRESS_SIZE");
        env::set_var("BUCKET_POLICIES_ENABLED", "false");
        env::set_var("BUCKET_POLICIES", "public:read,uploads:write");

        let config = Config::from_env();
        assert_eq!(config.max_cache_size, 100 * 1024 * 1024);
        assert_eq!(config.default_ttl, 300);
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.cleanup_interval, 60, "zero interval must fall back");
        assert!(!config.bucket_policies_enabled);
        assert_eq!(config.bucket_policies.len(), 2);

        env::set_var("CLEANUP_INTERVAL", "15");
        assert_eq!(Config::from_env().cleanup_interval, 15);

        env::remove_var("CLEANUP_INTERVAL");
        env::remove_var("BUCKET_POLICIES_ENABLED");
        env::remove_var("BUCKET_POLICIES");
    }
}
