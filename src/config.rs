//! Configuration Module
//!
//! Handles loading and managing cache and server configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Cache and server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Default TTL in seconds for summaries
    pub default_ttl: u64,
    /// Background sweep interval in seconds
    pub sweep_interval: u64,
    /// Maximum expired entries reclaimed per lock acquisition during a sweep
    pub sweep_batch_size: usize,
    /// Upper bound on waiting for the cache lock, in milliseconds
    pub lock_timeout_ms: u64,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 60)
    /// - `SWEEP_INTERVAL` - Sweep frequency in seconds (default: 300)
    /// - `SWEEP_BATCH_SIZE` - Entries reclaimed per batch (default: 1024)
    /// - `LOCK_TIMEOUT_MS` - Cache lock wait bound (default: 5000)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    ///
    /// Unparseable or zero values fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_ttl: positive_var("DEFAULT_TTL").unwrap_or(defaults.default_ttl),
            sweep_interval: positive_var("SWEEP_INTERVAL").unwrap_or(defaults.sweep_interval),
            sweep_batch_size: positive_var("SWEEP_BATCH_SIZE")
                .unwrap_or(defaults.sweep_batch_size),
            lock_timeout_ms: positive_var("LOCK_TIMEOUT_MS").unwrap_or(defaults.lock_timeout_ms),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
        }
    }

    /// Default TTL as a Duration.
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl)
    }

    /// Sweep interval as a Duration.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval)
    }

    /// Lock timeout as a Duration.
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_ttl: 60,
            sweep_interval: 300,
            sweep_batch_size: 1024,
            lock_timeout_ms: 5000,
            server_port: 3000,
        }
    }
}

fn positive_var<T>(name: &str) -> Option<T>
where
    T: FromStr + PartialOrd + Default,
{
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .filter(|v| *v > T::default())
}
