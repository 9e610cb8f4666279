//! Configuration management for the Pulse MCP server

use pulse_core::AnalyticsConfig;
use serde::Deserialize;

use crate::error::PulseMcpError;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Regime tables, stablecoin list and badge thresholds
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Dashboard cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Maximum cache entries
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
    /// Cache TTL in seconds
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: default_max_capacity(),
            ttl_seconds: default_ttl(),
        }
    }
}

fn default_max_capacity() -> u64 {
    256
}

fn default_ttl() -> u64 {
    60
}

impl AppConfig {
    /// Load configuration from `pulse-mcp.toml` and `PULSE_` environment variables.
    ///
    /// Nested keys use a double underscore, e.g. `PULSE_CACHE__TTL_SECONDS=30`
    /// or `PULSE_ANALYTICS__STABLECOINS=USDC,USDT,DAI`.
    pub fn load() -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .set_default("cache.max_capacity", default_max_capacity() as i64)?
            .set_default("cache.ttl_seconds", default_ttl() as i64)?
            .add_source(config::File::with_name("pulse-mcp").required(false))
            .add_source(
                config::Environment::with_prefix("PULSE")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("analytics.stablecoins")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PulseMcpError> {
        self.analytics.validate()?;
        if self.cache.max_capacity == 0 {
            return Err(PulseMcpError::Config(
                "cache.max_capacity must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
