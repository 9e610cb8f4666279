//! Yield window selection
//!
//! Picks the window that best represents the portfolio's yield and classifies
//! how much data stands behind it.

use serde::Serialize;

use crate::config::BadgeThresholds;
use crate::models::{ConfidenceBadge, YieldWindow};
use crate::window_key::format_window_label;

/// The window chosen for display, borrowed from the input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedYieldWindow<'a> {
    pub key: &'a str,
    pub window: &'a YieldWindow,
    pub label: String,
}

/// Select the most representative yield window.
///
/// Windows with positive average daily yield are preferred; if none are
/// positive the whole set is considered. Within the candidates the window with
/// the most filtered days wins, and ties go to the window that comes first in
/// `windows` (payload order).
pub fn select_best_yield_window(windows: &[YieldWindow]) -> Option<SelectedYieldWindow<'_>> {
    if windows.is_empty() {
        return None;
    }

    let positive: Vec<&YieldWindow> = windows
        .iter()
        .filter(|w| w.average_daily_yield_usd > 0.0)
        .collect();

    let candidates: Vec<&YieldWindow> = if positive.is_empty() {
        tracing::debug!(
            windows = windows.len(),
            "No window with positive yield, selecting from all windows"
        );
        windows.iter().collect()
    } else {
        positive
    };

    let mut best: Option<&YieldWindow> = None;
    for window in candidates {
        if !window.statistics.is_consistent() {
            tracing::debug!(
                key = %window.key,
                filtered_days = window.statistics.filtered_days,
                outliers_removed = window.statistics.outliers_removed,
                "Yield window reports more outliers than filtered days"
            );
        }
        // Strictly greater keeps the earliest window on ties
        let better = best
            .map(|current| window.statistics.filtered_days > current.statistics.filtered_days)
            .unwrap_or(true);
        if better {
            best = Some(window);
        }
    }

    best.map(|window| SelectedYieldWindow {
        key: &window.key,
        window,
        label: format_window_label(&window.key),
    })
}

/// Badge for a window backed by `filtered_days` of data.
pub fn classify_confidence(filtered_days: u32, thresholds: &BadgeThresholds) -> ConfidenceBadge {
    if filtered_days < thresholds.min_preliminary_days {
        ConfidenceBadge::Preliminary
    } else if filtered_days < thresholds.min_confidence_days {
        ConfidenceBadge::Improving
    } else {
        ConfidenceBadge::Established
    }
}
