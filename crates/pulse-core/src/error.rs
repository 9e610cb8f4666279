//! Error types for Pulse Core
//!
//! The analytics functions degrade instead of failing on missing data, so the
//! only errors here are configuration mistakes and explicit parse requests.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PulseError {
    #[error("Invalid analytics configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown regime id: {0}")]
    UnknownRegime(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type PulseResult<T> = Result<T, PulseError>;
