//! Dashboard assembly
//!
//! Runs every engine over one set of payloads and produces the record the
//! presentation layer renders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::allocation::{calculate_allocation, calculate_delta, count_positions, net_balance_usd};
use crate::config::AnalyticsConfig;
use crate::models::{
    AllocationSnapshot, ConfidenceBadge, DurationInfo, PositionCounts, RankedRoiWindow, RegimeId,
    SentimentReading, StrategyDirection, TargetAllocation,
};
use crate::payload::{
    parse_regime_history, PortfolioPayload, RegimeHistoryEntryPayload, RoiPayload,
    SentimentPayload, YieldSummaryPayload,
};
use crate::regime::{align_strategy_info, regime_from_sentiment, regime_strategy_info_at};
use crate::roi::{rank_roi_windows, recommended_roi_window, resolve_recommended_period_label};
use crate::sentiment::process_sentiment_data;
use crate::window_key::format_window_label;
use crate::yield_window::{classify_confidence, select_best_yield_window};

/// Raw payloads for one dashboard render. Any of them may be missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardPayloads {
    #[serde(default)]
    pub portfolio: Option<PortfolioPayload>,
    #[serde(default)]
    pub yield_summary: Option<YieldSummaryPayload>,
    #[serde(default)]
    pub sentiment: Option<SentimentPayload>,
    #[serde(default)]
    pub regime_history: Option<Vec<RegimeHistoryEntryPayload>>,
    /// Whether a wallet is connected (visitors get default periods)
    #[serde(default)]
    pub is_connected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoiSummary {
    pub windows: Vec<RankedRoiWindow>,
    pub recommended_period: Option<String>,
    pub recommended_label: Option<String>,
    pub recommended_value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YieldSummary {
    pub key: String,
    pub label: String,
    pub average_daily_yield_usd: f64,
    pub median_daily_yield_usd: f64,
    pub total_yield_usd: f64,
    pub filtered_days: u32,
    pub outliers_removed: u32,
    pub confidence: ConfidenceBadge,
    pub badge: Option<String>,
}

/// Everything the dashboard displays, derived from one set of payloads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub net_balance_usd: f64,
    pub roi: RoiSummary,
    pub estimated_yearly_pnl_usd: f64,
    #[serde(rename = "yield")]
    pub yield_summary: Option<YieldSummary>,
    pub sentiment: SentimentReading,
    pub current_regime: RegimeId,
    pub previous_regime: Option<RegimeId>,
    pub strategy_direction: StrategyDirection,
    pub regime_duration: DurationInfo,
    pub allocation: AllocationSnapshot,
    pub target_allocation: TargetAllocation,
    pub delta: f64,
    pub position_counts: PositionCounts,
    pub generated_at: DateTime<Utc>,
}

/// Ranked ROI windows plus the headline period and its value.
pub fn summarize_roi(roi: Option<&RoiPayload>, is_connected: bool) -> RoiSummary {
    let windows = roi.map(|r| rank_roi_windows(&r.windows())).unwrap_or_default();
    let recommended_period = resolve_recommended_period_label(roi, is_connected);

    let recommended_value = recommended_period
        .as_deref()
        .and_then(|period| recommended_roi_window(&windows, period))
        .map(|window| window.value)
        .or_else(|| roi.and_then(|r| r.recommended_roi).filter(|v| v.is_finite()));

    RoiSummary {
        recommended_label: recommended_period.as_deref().map(format_window_label),
        recommended_period,
        recommended_value,
        windows,
    }
}

/// The selected yield window with its confidence badge.
pub fn summarize_yield(
    yield_summary: Option<&YieldSummaryPayload>,
    config: &AnalyticsConfig,
) -> Option<YieldSummary> {
    let windows = yield_summary.map(YieldSummaryPayload::to_windows).unwrap_or_default();
    let selected = select_best_yield_window(&windows)?;
    let stats = &selected.window.statistics;
    let confidence = classify_confidence(stats.filtered_days, &config.badges);

    Some(YieldSummary {
        key: selected.key.to_string(),
        label: selected.label,
        average_daily_yield_usd: selected.window.average_daily_yield_usd,
        median_daily_yield_usd: selected.window.median_daily_yield_usd,
        total_yield_usd: selected.window.total_yield_usd,
        filtered_days: stats.filtered_days,
        outliers_removed: stats.outliers_removed,
        confidence,
        badge: confidence.badge_label().map(String::from),
    })
}

/// Assemble the dashboard record at `now`.
///
/// The current regime follows the sentiment reading. When the recorded history
/// has not caught up with it, the latest recorded regime is reported as the
/// previous one and the time in regime starts at zero.
pub fn assemble_dashboard(
    payloads: &DashboardPayloads,
    config: &AnalyticsConfig,
    now: DateTime<Utc>,
) -> DashboardSnapshot {
    let portfolio = payloads.portfolio.as_ref();
    let positions = portfolio.map(PortfolioPayload::to_positions).unwrap_or_default();

    let sentiment = process_sentiment_data(payloads.sentiment.as_ref(), config);
    let current_regime = regime_from_sentiment(sentiment.value, &config.regime_thresholds);
    let target_allocation = *config.target_allocation(current_regime);

    let history = payloads
        .regime_history
        .as_deref()
        .map(parse_regime_history)
        .unwrap_or_default();
    let strategy = align_strategy_info(
        regime_strategy_info_at(Some(history.as_slice()), now),
        current_regime,
    );

    let allocation = calculate_allocation(&positions, config);
    let delta = calculate_delta(allocation.crypto_pct, target_allocation.crypto_pct);

    let snapshot = DashboardSnapshot {
        net_balance_usd: net_balance_usd(&positions),
        roi: summarize_roi(portfolio.and_then(|p| p.roi.as_ref()), payloads.is_connected),
        estimated_yearly_pnl_usd: portfolio
            .map(PortfolioPayload::estimated_yearly_pnl_usd)
            .unwrap_or(0.0),
        yield_summary: summarize_yield(payloads.yield_summary.as_ref(), config),
        sentiment,
        current_regime,
        previous_regime: strategy.previous_regime,
        strategy_direction: strategy.strategy_direction,
        regime_duration: strategy.regime_duration,
        allocation,
        target_allocation,
        delta,
        position_counts: count_positions(&positions),
        generated_at: now,
    };

    tracing::debug!(
        regime = %snapshot.current_regime,
        crypto_pct = snapshot.allocation.crypto_pct,
        delta = snapshot.delta,
        positions = snapshot.position_counts.total,
        "Assembled dashboard"
    );

    snapshot
}
