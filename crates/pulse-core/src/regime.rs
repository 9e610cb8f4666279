//! Regime engine
//!
//! Maps sentiment onto the discrete regime axis, resolves each regime's target
//! allocation, and reads transition context out of the regime history.

use chrono::{DateTime, Utc};

use crate::config::{AnalyticsConfig, RegimeThreshold};
use crate::models::{
    DurationInfo, RegimeHistoryEntry, RegimeId, RegimeStrategyInfo, StrategyDirection,
    TargetAllocation,
};

/// Sentiment used when a reading is missing or not a number.
pub const NEUTRAL_SENTIMENT: f64 = 50.0;

/// Classify a sentiment value (0-100) into a regime.
///
/// Walks the ordered threshold table and returns the first regime whose upper
/// bound covers the value. Values past the last bound land in the last regime,
/// so the function is total and monotonic for any ordered table.
pub fn regime_from_sentiment(value: f64, thresholds: &[RegimeThreshold]) -> RegimeId {
    let value = if value.is_nan() { NEUTRAL_SENTIMENT } else { value };

    thresholds
        .iter()
        .find(|threshold| value <= threshold.max_value)
        .or_else(|| thresholds.last())
        .map(|threshold| threshold.regime)
        .unwrap_or(RegimeId::Neutral)
}

/// Target allocation for a regime.
pub fn target_allocation(regime: RegimeId, config: &AnalyticsConfig) -> &TargetAllocation {
    config.target_allocation(regime)
}

/// Direction of travel between two regimes on the fear -> greed axis.
pub fn strategy_direction(previous: RegimeId, current: RegimeId) -> StrategyDirection {
    match previous.ordinal().cmp(&current.ordinal()) {
        std::cmp::Ordering::Less => StrategyDirection::FromLeft,
        std::cmp::Ordering::Greater => StrategyDirection::FromRight,
        std::cmp::Ordering::Equal => StrategyDirection::Default,
    }
}

/// Transition context from a chronological regime history, measured at `now`.
pub fn regime_strategy_info_at(
    history: Option<&[RegimeHistoryEntry]>,
    now: DateTime<Utc>,
) -> RegimeStrategyInfo {
    let mut entries: Vec<&RegimeHistoryEntry> = history.unwrap_or_default().iter().collect();
    // Stable sort keeps payload order for identical timestamps
    entries.sort_by_key(|entry| entry.entered_at);

    let current = entries.last().copied();
    let regime_duration = current
        .map(|entry| DurationInfo::from_elapsed(now - entry.entered_at))
        .unwrap_or_else(DurationInfo::zero);

    let (previous_regime, strategy_direction) = match entries.as_slice() {
        [.., previous, latest] => (
            Some(previous.regime_id),
            strategy_direction(previous.regime_id, latest.regime_id),
        ),
        _ => (None, StrategyDirection::Default),
    };

    if previous_regime.is_none() {
        tracing::debug!(
            entries = entries.len(),
            "Regime history too short for transition context"
        );
    }

    RegimeStrategyInfo {
        current_regime: current.map(|entry| entry.regime_id),
        previous_regime,
        strategy_direction,
        regime_duration,
    }
}

/// Transition context measured against the wall clock.
pub fn regime_strategy_info(history: Option<&[RegimeHistoryEntry]>) -> RegimeStrategyInfo {
    regime_strategy_info_at(history, Utc::now())
}

/// Align transition context with the regime the live sentiment reads.
///
/// When the live regime differs from the latest recorded entry, that entry
/// becomes the previous regime and the live regime has only just begun.
pub fn align_strategy_info(info: RegimeStrategyInfo, live: RegimeId) -> RegimeStrategyInfo {
    match info.current_regime {
        Some(recorded) if recorded != live => {
            tracing::debug!(
                recorded = %recorded,
                live = %live,
                "Live regime is ahead of the recorded history"
            );
            RegimeStrategyInfo {
                current_regime: Some(live),
                previous_regime: Some(recorded),
                strategy_direction: strategy_direction(recorded, live),
                regime_duration: DurationInfo::zero(),
            }
        }
        _ => RegimeStrategyInfo {
            current_regime: Some(live),
            ..info
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn entry(regime_id: RegimeId, hours_ago: i64) -> RegimeHistoryEntry {
        RegimeHistoryEntry {
            regime_id,
            entered_at: now() - Duration::hours(hours_ago),
        }
    }

    #[test]
    fn test_regime_bands() {
        let thresholds = AnalyticsConfig::default().regime_thresholds;
        assert_eq!(regime_from_sentiment(0.0, &thresholds), RegimeId::ExtremeFear);
        assert_eq!(regime_from_sentiment(25.0, &thresholds), RegimeId::ExtremeFear);
        assert_eq!(regime_from_sentiment(25.5, &thresholds), RegimeId::Fear);
        assert_eq!(regime_from_sentiment(50.0, &thresholds), RegimeId::Neutral);
        assert_eq!(regime_from_sentiment(60.0, &thresholds), RegimeId::Greed);
        assert_eq!(regime_from_sentiment(100.0, &thresholds), RegimeId::ExtremeGreed);
    }

    #[test]
    fn test_regime_out_of_domain_values() {
        let thresholds = AnalyticsConfig::default().regime_thresholds;
        assert_eq!(regime_from_sentiment(-10.0, &thresholds), RegimeId::ExtremeFear);
        assert_eq!(regime_from_sentiment(140.0, &thresholds), RegimeId::ExtremeGreed);
        assert_eq!(regime_from_sentiment(f64::NAN, &thresholds), RegimeId::Neutral);
        assert_eq!(regime_from_sentiment(42.0, &[]), RegimeId::Neutral);
    }

    #[test]
    fn test_regime_is_monotonic_over_domain() {
        let thresholds = AnalyticsConfig::default().regime_thresholds;
        let mut last = regime_from_sentiment(0.0, &thresholds).ordinal();
        for step in 1..=1000 {
            let value = step as f64 / 10.0;
            let ordinal = regime_from_sentiment(value, &thresholds).ordinal();
            assert!(ordinal >= last, "regime went backwards at {}", value);
            last = ordinal;
        }
    }

    #[test]
    fn test_custom_threshold_table() {
        let thresholds = vec![
            RegimeThreshold { regime: RegimeId::Fear, max_value: 40.0 },
            RegimeThreshold { regime: RegimeId::Greed, max_value: 100.0 },
        ];
        assert_eq!(regime_from_sentiment(40.0, &thresholds), RegimeId::Fear);
        assert_eq!(regime_from_sentiment(41.0, &thresholds), RegimeId::Greed);
    }

    #[test]
    fn test_target_allocation_lookup() {
        let config = AnalyticsConfig::default();
        let target = target_allocation(RegimeId::ExtremeFear, &config);
        assert_eq!(target.crypto_pct, 70.0);
        assert_eq!(target.stable_pct, 30.0);
        assert_eq!(target, target_allocation(RegimeId::ExtremeFear, &config));
    }

    #[test]
    fn test_empty_history() {
        let info = regime_strategy_info_at(Some(&[][..]), now());
        assert_eq!(info.current_regime, None);
        assert_eq!(info.previous_regime, None);
        assert_eq!(info.strategy_direction, StrategyDirection::Default);
        assert_eq!(info.regime_duration, DurationInfo::zero());

        assert_eq!(regime_strategy_info_at(None, now()), info);
    }

    #[test]
    fn test_single_entry_history() {
        let history = vec![entry(RegimeId::Greed, 50)];
        let info = regime_strategy_info_at(Some(history.as_slice()), now());
        assert_eq!(info.current_regime, Some(RegimeId::Greed));
        assert_eq!(info.previous_regime, None);
        assert_eq!(info.strategy_direction, StrategyDirection::Default);
        assert_eq!(info.regime_duration.days, 2);
        assert_eq!(info.regime_duration.human_readable, "2 days");
    }

    #[test]
    fn test_transition_from_fear_side() {
        let history = vec![
            entry(RegimeId::ExtremeFear, 400),
            entry(RegimeId::Fear, 200),
            entry(RegimeId::Neutral, 5),
        ];
        let info = regime_strategy_info_at(Some(history.as_slice()), now());
        assert_eq!(info.current_regime, Some(RegimeId::Neutral));
        assert_eq!(info.previous_regime, Some(RegimeId::Fear));
        assert_eq!(info.strategy_direction, StrategyDirection::FromLeft);
        assert_eq!(info.regime_duration.human_readable, "5 hours");
    }

    #[test]
    fn test_transition_from_greed_side() {
        let history = vec![entry(RegimeId::ExtremeGreed, 30), entry(RegimeId::Greed, 1)];
        let info = regime_strategy_info_at(Some(history.as_slice()), now());
        assert_eq!(info.previous_regime, Some(RegimeId::ExtremeGreed));
        assert_eq!(info.strategy_direction, StrategyDirection::FromRight);
    }

    #[test]
    fn test_align_keeps_matching_history() {
        let history = vec![entry(RegimeId::Fear, 200), entry(RegimeId::Neutral, 5)];
        let info = regime_strategy_info_at(Some(history.as_slice()), now());
        let aligned = align_strategy_info(info.clone(), RegimeId::Neutral);
        assert_eq!(aligned, info);
    }

    #[test]
    fn test_align_live_regime_ahead_of_history() {
        let history = vec![entry(RegimeId::Greed, 200), entry(RegimeId::ExtremeFear, 72)];
        let info = regime_strategy_info_at(Some(history.as_slice()), now());
        let aligned = align_strategy_info(info, RegimeId::ExtremeGreed);
        assert_eq!(aligned.current_regime, Some(RegimeId::ExtremeGreed));
        assert_eq!(aligned.previous_regime, Some(RegimeId::ExtremeFear));
        assert_eq!(aligned.strategy_direction, StrategyDirection::FromLeft);
        assert_eq!(aligned.regime_duration, DurationInfo::zero());
    }

    #[test]
    fn test_align_without_history() {
        let aligned = align_strategy_info(regime_strategy_info_at(None, now()), RegimeId::Greed);
        assert_eq!(aligned.current_regime, Some(RegimeId::Greed));
        assert_eq!(aligned.previous_regime, None);
        assert_eq!(aligned.strategy_direction, StrategyDirection::Default);
        assert_eq!(aligned.regime_duration, DurationInfo::zero());
    }

    #[test]
    fn test_history_is_read_chronologically() {
        let history = vec![entry(RegimeId::Neutral, 2), entry(RegimeId::Greed, 48)];
        let info = regime_strategy_info_at(Some(history.as_slice()), now());
        assert_eq!(info.current_regime, Some(RegimeId::Neutral));
        assert_eq!(info.previous_regime, Some(RegimeId::Greed));
        assert_eq!(info.strategy_direction, StrategyDirection::FromRight);
    }

    #[test]
    fn test_repeated_regime_has_default_direction() {
        let history = vec![entry(RegimeId::Fear, 10), entry(RegimeId::Fear, 3)];
        let info = regime_strategy_info_at(Some(history.as_slice()), now());
        assert_eq!(info.previous_regime, Some(RegimeId::Fear));
        assert_eq!(info.strategy_direction, StrategyDirection::Default);
    }

    #[test]
    fn test_future_entry_has_zero_duration() {
        let history = vec![entry(RegimeId::Neutral, -3)];
        let info = regime_strategy_info_at(Some(history.as_slice()), now());
        assert_eq!(info.regime_duration, DurationInfo::zero());
    }
}
