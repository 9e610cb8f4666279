//! # Pulse Core
//!
//! Portfolio analytics for the Folio Pulse dashboard.
//!
//! This crate turns raw sentiment, regime history, portfolio and yield payloads
//! into the values a DeFi dashboard renders: market regime and target
//! allocation, current crypto/stable split and drift, the most representative
//! yield window, and ranked ROI windows. Everything here is pure and
//! synchronous; fetching and rendering belong to the caller.

pub mod allocation;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod models;
pub mod payload;
pub mod regime;
pub mod roi;
pub mod sentiment;
pub mod window_key;
pub mod yield_window;

pub use allocation::*;
pub use config::*;
pub use dashboard::*;
pub use error::*;
pub use models::*;
pub use payload::*;
pub use regime::*;
pub use roi::*;
pub use sentiment::*;
pub use window_key::*;
pub use yield_window::*;
