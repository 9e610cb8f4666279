//! Error types for the Pulse MCP server

use chrono::{DateTime, Utc};
use pulse_core::{parse_timestamp, PulseError, RegimeId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PulseMcpError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Analytics error: {0}")]
    Analytics(#[from] PulseError),
}

pub type Result<T> = std::result::Result<T, PulseMcpError>;

/// Validate a numeric argument. Any real value is accepted; NaN and infinities are not.
pub fn validate_finite(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(PulseMcpError::InvalidParameter(format!(
            "{} must be a finite number",
            name
        )));
    }
    Ok(())
}

/// Parse a regime id argument (`ef`, `fear`, `Extreme Greed`, ...)
pub fn parse_regime(raw: &str) -> Result<RegimeId> {
    if raw.trim().is_empty() {
        return Err(PulseMcpError::InvalidParameter("Regime id cannot be empty".into()));
    }
    Ok(raw.parse()?)
}

/// Parse an optional `now` override, defaulting to the current time
pub fn parse_now(raw: Option<&str>) -> Result<DateTime<Utc>> {
    match raw {
        None => Ok(Utc::now()),
        Some(raw) => parse_timestamp(raw).ok_or_else(|| {
            PulseMcpError::InvalidParameter(format!("Invalid timestamp '{}'", raw))
        }),
    }
}
