//! Derived view models for the portfolio dashboard
//!
//! Every structure here is recomputed from freshly fetched payloads on each
//! call. Nothing is persisted or mutated in place.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PulseError;

// =============================================================================
// Market Regime
// =============================================================================

/// Discrete market regime, ordered along the sentiment axis from fear to greed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RegimeId {
    #[serde(rename = "ef", alias = "extreme_fear")]
    ExtremeFear,
    #[serde(rename = "f", alias = "fear")]
    Fear,
    #[serde(rename = "n", alias = "neutral")]
    Neutral,
    #[serde(rename = "g", alias = "greed")]
    Greed,
    #[serde(rename = "eg", alias = "extreme_greed")]
    ExtremeGreed,
}

impl RegimeId {
    pub const ALL: [RegimeId; 5] = [
        RegimeId::ExtremeFear,
        RegimeId::Fear,
        RegimeId::Neutral,
        RegimeId::Greed,
        RegimeId::ExtremeGreed,
    ];

    /// Position along the fear -> greed axis (0 = extreme fear).
    pub fn ordinal(self) -> usize {
        match self {
            RegimeId::ExtremeFear => 0,
            RegimeId::Fear => 1,
            RegimeId::Neutral => 2,
            RegimeId::Greed => 3,
            RegimeId::ExtremeGreed => 4,
        }
    }

    /// Short id used by the regime API (`ef`, `f`, `n`, `g`, `eg`).
    pub fn as_id(self) -> &'static str {
        match self {
            RegimeId::ExtremeFear => "ef",
            RegimeId::Fear => "f",
            RegimeId::Neutral => "n",
            RegimeId::Greed => "g",
            RegimeId::ExtremeGreed => "eg",
        }
    }

    pub fn label(self) -> &'static str {
        self.status().label()
    }

    /// Sentiment status shown alongside a reading that falls in this regime.
    pub fn status(self) -> SentimentStatus {
        match self {
            RegimeId::ExtremeFear => SentimentStatus::ExtremeFear,
            RegimeId::Fear => SentimentStatus::Fear,
            RegimeId::Neutral => SentimentStatus::Neutral,
            RegimeId::Greed => SentimentStatus::Greed,
            RegimeId::ExtremeGreed => SentimentStatus::ExtremeGreed,
        }
    }
}

impl fmt::Display for RegimeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_id())
    }
}

impl FromStr for RegimeId {
    type Err = PulseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "ef" | "extreme_fear" => Ok(RegimeId::ExtremeFear),
            "f" | "fear" => Ok(RegimeId::Fear),
            "n" | "neutral" => Ok(RegimeId::Neutral),
            "g" | "greed" => Ok(RegimeId::Greed),
            "eg" | "extreme_greed" => Ok(RegimeId::ExtremeGreed),
            _ => Err(PulseError::UnknownRegime(s.to_string())),
        }
    }
}

/// A single regime transition, as recorded by the regime history API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeHistoryEntry {
    pub regime_id: RegimeId,
    pub entered_at: DateTime<Utc>,
}

/// Which side of the sentiment axis the portfolio is arriving from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StrategyDirection {
    /// Previous regime sat further toward fear
    FromLeft,
    /// Previous regime sat further toward greed
    FromRight,
    /// No usable history, or no regime change
    Default,
}

/// Time spent in the current regime, bucketed for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationInfo {
    pub hours: i64,
    pub days: i64,
    pub human_readable: String,
}

impl DurationInfo {
    pub fn zero() -> Self {
        Self::from_elapsed(Duration::zero())
    }

    /// Bucket an elapsed duration. Negative durations (clock skew, future
    /// timestamps) count as zero.
    pub fn from_elapsed(elapsed: Duration) -> Self {
        let hours = elapsed.num_hours().max(0);
        let days = hours / 24;

        let human_readable = if days >= 1 {
            pluralize(days, "day")
        } else {
            pluralize(hours, "hour")
        };

        Self {
            hours,
            days,
            human_readable,
        }
    }
}

fn pluralize(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", count, unit)
    }
}

/// Transition context derived from the regime history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeStrategyInfo {
    pub current_regime: Option<RegimeId>,
    pub previous_regime: Option<RegimeId>,
    pub strategy_direction: StrategyDirection,
    pub regime_duration: DurationInfo,
}

/// Target crypto/stable split for a regime.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetAllocation {
    pub crypto_pct: f64,
    pub stable_pct: f64,
}

// =============================================================================
// Sentiment
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SentimentStatus {
    #[serde(rename = "Extreme Fear")]
    ExtremeFear,
    #[serde(rename = "Fear")]
    Fear,
    #[serde(rename = "Neutral")]
    Neutral,
    #[serde(rename = "Greed")]
    Greed,
    #[serde(rename = "Extreme Greed")]
    ExtremeGreed,
}

impl SentimentStatus {
    pub fn label(self) -> &'static str {
        match self {
            SentimentStatus::ExtremeFear => "Extreme Fear",
            SentimentStatus::Fear => "Fear",
            SentimentStatus::Neutral => "Neutral",
            SentimentStatus::Greed => "Greed",
            SentimentStatus::ExtremeGreed => "Extreme Greed",
        }
    }
}

impl fmt::Display for SentimentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Normalized sentiment reading (value 0-100).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentReading {
    pub value: f64,
    pub status: SentimentStatus,
    pub quote: String,
}

// =============================================================================
// Positions & Allocation
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionCategory {
    Asset,
    Debt,
}

/// A protocol position as reported by the portfolio API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub protocol_id: String,
    pub protocol_name: String,
    pub chain: String,
    pub usd_value: f64,
    pub category: PositionCategory,
    pub symbol: String,
}

/// Allocation bucket a symbol is classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetBucket {
    Crypto,
    Stable,
}

/// One symbol's share of its bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constituent {
    pub symbol: String,
    pub value_usd: f64,
    pub weight_pct: f64,
    pub chain: String,
    pub protocol: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllocationConstituents {
    pub crypto: Vec<Constituent>,
    pub stable: Vec<Constituent>,
}

/// Crypto/stable split of a portfolio.
///
/// `crypto_pct + stable_pct` is 100 whenever `total_value_usd > 0`, and both
/// are 0 otherwise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllocationSnapshot {
    pub crypto_value_usd: f64,
    pub stable_value_usd: f64,
    pub total_value_usd: f64,
    pub crypto_pct: f64,
    pub stable_pct: f64,
    pub constituents: AllocationConstituents,
    pub simplified_crypto: Vec<Constituent>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionCounts {
    pub total: usize,
    pub assets: usize,
    pub debts: usize,
    pub protocols: usize,
    pub chains: usize,
}

// =============================================================================
// Yield
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct YieldStatistics {
    pub filtered_days: u32,
    pub positive_days: u32,
    pub negative_days: u32,
    pub outliers_removed: u32,
}

impl YieldStatistics {
    /// Outliers can never exceed the days they were removed from.
    pub fn is_consistent(&self) -> bool {
        self.outliers_removed <= self.filtered_days
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProtocolYield {
    pub protocol: String,
    pub chain: String,
    pub total_yield_usd: f64,
    pub average_daily_yield_usd: f64,
    pub days_with_data: u32,
}

/// Yield statistics over one look-back window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YieldWindow {
    pub key: String,
    pub average_daily_yield_usd: f64,
    pub median_daily_yield_usd: f64,
    pub total_yield_usd: f64,
    pub statistics: YieldStatistics,
    pub protocol_breakdown: Vec<ProtocolYield>,
}

/// Data-sufficiency badge for a yield window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceBadge {
    Preliminary,
    Improving,
    /// Enough data, no badge shown
    Established,
}

impl ConfidenceBadge {
    pub fn badge_label(self) -> Option<&'static str> {
        match self {
            ConfidenceBadge::Preliminary => Some("preliminary"),
            ConfidenceBadge::Improving => Some("improving"),
            ConfidenceBadge::Established => None,
        }
    }
}

// =============================================================================
// ROI
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoiWindow {
    pub key: String,
    pub value: f64,
    pub data_points: u32,
}

/// ROI window with its display label, in presentation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedRoiWindow {
    pub key: String,
    pub label: String,
    pub value: f64,
    pub data_points: u32,
}
