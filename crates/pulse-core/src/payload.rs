//! Raw API payloads
//!
//! Shapes owned by the portfolio, yield, sentiment and regime services. Every
//! field is optional; the `to_*` conversions apply the documented defaults so
//! the engines never see a missing value.

use std::fmt;
use std::marker::PhantomData;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;

use crate::models::{
    Position, PositionCategory, ProtocolYield, RegimeHistoryEntry, RegimeId, RoiWindow,
    YieldStatistics, YieldWindow,
};

// =============================================================================
// Ordered Map
// =============================================================================

/// A JSON object kept in document order.
///
/// Window maps are keyed by period (`"7d"`, `"30d"`, ...) and tie-breaks
/// depend on the order the service sent them in. Duplicate keys keep the
/// position of the first occurrence and the value of the last.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<V>(pub Vec<(String, V)>);

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<V> OrderedMap<V> {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<V> FromIterator<(String, V)> for OrderedMap<V> {
    fn from_iter<I: IntoIterator<Item = (String, V)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedMapVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
            type Value = OrderedMap<V>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map keyed by window")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries: Vec<(String, V)> =
                    Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, value)) = access.next_entry::<String, V>()? {
                    match entries.iter_mut().find(|(k, _)| *k == key) {
                        Some(existing) => existing.1 = value,
                        None => entries.push((key, value)),
                    }
                }
                Ok(OrderedMap(entries))
            }
        }

        deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
    }
}

// =============================================================================
// Sentiment
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SentimentQuotePayload {
    #[serde(default)]
    pub quote: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
}

/// Sentiment service response. The whole payload may be absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SentimentPayload {
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub quote: Option<SentimentQuotePayload>,
}

impl SentimentPayload {
    /// Non-blank quote text, if the service sent one.
    pub fn quote_text(&self) -> Option<&str> {
        self.quote
            .as_ref()
            .and_then(|q| q.quote.as_deref())
            .map(str::trim)
            .filter(|q| !q.is_empty())
    }
}

// =============================================================================
// Regime History
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegimeHistoryEntryPayload {
    #[serde(default)]
    pub regime_id: Option<String>,
    #[serde(default)]
    pub entered_at: Option<String>,
}

impl RegimeHistoryEntryPayload {
    /// `None` when the regime id is unknown or the timestamp is unreadable.
    pub fn to_entry(&self) -> Option<RegimeHistoryEntry> {
        let regime_id: RegimeId = self.regime_id.as_deref()?.parse().ok()?;
        let entered_at = parse_timestamp(self.entered_at.as_deref()?)?;
        Some(RegimeHistoryEntry {
            regime_id,
            entered_at,
        })
    }
}

/// Convert a regime history payload, skipping unusable entries.
pub fn parse_regime_history(entries: &[RegimeHistoryEntryPayload]) -> Vec<RegimeHistoryEntry> {
    entries
        .iter()
        .filter_map(|payload| {
            let entry = payload.to_entry();
            if entry.is_none() {
                tracing::debug!(
                    regime_id = ?payload.regime_id,
                    entered_at = ?payload.entered_at,
                    "Skipping unusable regime history entry"
                );
            }
            entry
        })
        .collect()
}

/// RFC 3339, or a naive ISO timestamp read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

// =============================================================================
// Portfolio
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PositionPayload {
    #[serde(default)]
    pub protocol_id: Option<String>,
    #[serde(default)]
    pub protocol_name: Option<String>,
    #[serde(default)]
    pub chain: Option<String>,
    #[serde(default)]
    pub total_usd_value: Option<f64>,
    #[serde(default)]
    pub protocol_type: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
}

impl PositionPayload {
    /// Debt is flagged either by protocol type or by a negative value.
    pub fn category(&self) -> PositionCategory {
        let debt_type = self
            .protocol_type
            .as_deref()
            .map(|t| {
                matches!(
                    t.trim().to_lowercase().as_str(),
                    "debt" | "borrow" | "borrowing" | "lending_borrow" | "loan"
                )
            })
            .unwrap_or(false);

        if debt_type || self.total_usd_value.unwrap_or(0.0) < 0.0 {
            PositionCategory::Debt
        } else {
            PositionCategory::Asset
        }
    }

    pub fn to_position(&self) -> Position {
        let protocol_id = non_blank(self.protocol_id.as_deref()).unwrap_or("unknown");
        Position {
            protocol_id: protocol_id.to_string(),
            protocol_name: non_blank(self.protocol_name.as_deref())
                .unwrap_or(protocol_id)
                .to_string(),
            chain: non_blank(self.chain.as_deref()).unwrap_or("unknown").to_string(),
            usd_value: self.total_usd_value.filter(|v| v.is_finite()).unwrap_or(0.0),
            category: self.category(),
            symbol: non_blank(self.symbol.as_deref())
                .unwrap_or("UNKNOWN")
                .to_uppercase(),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoiWindowPayload {
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub data_points: Option<u32>,
}

/// Portfolio ROI block: a `windows` map, or the legacy flat fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoiPayload {
    #[serde(default)]
    pub windows: Option<OrderedMap<RoiWindowPayload>>,
    #[serde(default)]
    pub roi_7d: Option<f64>,
    #[serde(default)]
    pub roi_30d: Option<f64>,
    #[serde(default)]
    pub roi_90d: Option<f64>,
    #[serde(default)]
    pub roi_180d: Option<f64>,
    #[serde(default)]
    pub roi_365d: Option<f64>,
    #[serde(default)]
    pub recommended_period: Option<String>,
    #[serde(default)]
    pub recommended_roi_period: Option<String>,
    #[serde(default)]
    pub recommended_roi: Option<f64>,
    #[serde(default)]
    pub estimated_yearly_pnl_usd: Option<f64>,
}

impl RoiPayload {
    /// Windows in payload order. The `windows` map wins when it has entries;
    /// otherwise the legacy flat fields are used.
    pub fn windows(&self) -> Vec<RoiWindow> {
        if let Some(windows) = self.windows.as_ref().filter(|w| !w.is_empty()) {
            return windows
                .iter()
                .map(|(key, window)| RoiWindow {
                    key: key.to_string(),
                    value: window.value.filter(|v| v.is_finite()).unwrap_or(0.0),
                    data_points: window.data_points.unwrap_or(0),
                })
                .collect();
        }

        [
            ("roi_7d", self.roi_7d),
            ("roi_30d", self.roi_30d),
            ("roi_90d", self.roi_90d),
            ("roi_180d", self.roi_180d),
            ("roi_365d", self.roi_365d),
        ]
        .into_iter()
        .filter_map(|(key, value)| {
            value.filter(|v| v.is_finite()).map(|value| RoiWindow {
                key: key.to_string(),
                value,
                data_points: 0,
            })
        })
        .collect()
    }

    pub fn has_window(&self, key: &str) -> bool {
        self.windows().iter().any(|w| w.key == key)
    }
}

/// Portfolio service response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PortfolioPayload {
    #[serde(default)]
    pub positions: Vec<PositionPayload>,
    #[serde(default, alias = "portfolio_roi")]
    pub roi: Option<RoiPayload>,
    #[serde(default)]
    pub estimated_yearly_pnl_usd: Option<f64>,
}

impl PortfolioPayload {
    pub fn to_positions(&self) -> Vec<Position> {
        self.positions.iter().map(PositionPayload::to_position).collect()
    }

    /// Yearly PnL estimate from the ROI block, or the portfolio-level field.
    pub fn estimated_yearly_pnl_usd(&self) -> f64 {
        self.roi
            .as_ref()
            .and_then(|roi| roi.estimated_yearly_pnl_usd)
            .or(self.estimated_yearly_pnl_usd)
            .filter(|v| v.is_finite())
            .unwrap_or(0.0)
    }
}

// =============================================================================
// Yield Summary
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct YieldStatisticsPayload {
    #[serde(default)]
    pub filtered_days: Option<u32>,
    #[serde(default)]
    pub positive_days: Option<u32>,
    #[serde(default)]
    pub negative_days: Option<u32>,
    #[serde(default)]
    pub outliers_removed: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProtocolYieldPayload {
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub chain: Option<String>,
    #[serde(default)]
    pub total_yield_usd: Option<f64>,
    #[serde(default)]
    pub average_daily_yield_usd: Option<f64>,
    #[serde(default)]
    pub days_with_data: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct YieldWindowPayload {
    #[serde(default)]
    pub average_daily_yield_usd: Option<f64>,
    #[serde(default)]
    pub median_daily_yield_usd: Option<f64>,
    #[serde(default)]
    pub total_yield_usd: Option<f64>,
    #[serde(default)]
    pub statistics: Option<YieldStatisticsPayload>,
    #[serde(default)]
    pub protocol_breakdown: Vec<ProtocolYieldPayload>,
}

impl YieldWindowPayload {
    pub fn to_window(&self, key: &str) -> YieldWindow {
        let stats = self.statistics.clone().unwrap_or_default();
        YieldWindow {
            key: key.to_string(),
            average_daily_yield_usd: finite_or_zero(self.average_daily_yield_usd),
            median_daily_yield_usd: finite_or_zero(self.median_daily_yield_usd),
            total_yield_usd: finite_or_zero(self.total_yield_usd),
            statistics: YieldStatistics {
                filtered_days: stats.filtered_days.unwrap_or(0),
                positive_days: stats.positive_days.unwrap_or(0),
                negative_days: stats.negative_days.unwrap_or(0),
                outliers_removed: stats.outliers_removed.unwrap_or(0),
            },
            protocol_breakdown: self
                .protocol_breakdown
                .iter()
                .map(|p| ProtocolYield {
                    protocol: non_blank(p.protocol.as_deref()).unwrap_or("unknown").to_string(),
                    chain: non_blank(p.chain.as_deref()).unwrap_or("unknown").to_string(),
                    total_yield_usd: finite_or_zero(p.total_yield_usd),
                    average_daily_yield_usd: finite_or_zero(p.average_daily_yield_usd),
                    days_with_data: p.days_with_data.unwrap_or(0),
                })
                .collect(),
        }
    }
}

fn finite_or_zero(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Yield summary service response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct YieldSummaryPayload {
    #[serde(default)]
    pub windows: OrderedMap<YieldWindowPayload>,
}

impl YieldSummaryPayload {
    /// Windows in payload order.
    pub fn to_windows(&self) -> Vec<YieldWindow> {
        self.windows
            .iter()
            .map(|(key, window)| window.to_window(key))
            .collect()
    }
}
