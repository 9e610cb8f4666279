//! ROI window ranking
//!
//! Orders ROI windows from shortest to longest, labels them, and decides which
//! one is the headline "recommended" period.

use crate::models::{RankedRoiWindow, RoiWindow};
use crate::payload::RoiPayload;
use crate::window_key::{format_window_label, parse_window_key};

/// Window key shown when nothing else picks a period.
pub const DEFAULT_ROI_PERIOD: &str = "30d";

/// Sort score of a window key, in days.
///
/// Unrecognized keys score `f64::INFINITY` so they sort after every recognized
/// key; a stable sort keeps their relative order.
pub fn derive_roi_window_sort_score(key: &str) -> f64 {
    parse_window_key(key)
        .map(|span| span.days())
        .unwrap_or(f64::INFINITY)
}

/// Display label for a window key (`"30d"` -> `"30 days"`).
pub fn format_roi_window_label(key: &str) -> String {
    format_window_label(key)
}

/// Windows sorted by span with their labels attached.
pub fn rank_roi_windows(windows: &[RoiWindow]) -> Vec<RankedRoiWindow> {
    let mut ranked: Vec<&RoiWindow> = windows.iter().collect();
    ranked.sort_by(|a, b| {
        derive_roi_window_sort_score(&a.key).total_cmp(&derive_roi_window_sort_score(&b.key))
    });

    ranked
        .into_iter()
        .map(|window| RankedRoiWindow {
            key: window.key.clone(),
            label: format_roi_window_label(&window.key),
            value: window.value,
            data_points: window.data_points,
        })
        .collect()
}

fn explicit_period(value: Option<&str>) -> Option<String> {
    let value = value.map(str::trim).filter(|v| !v.is_empty())?;
    Some(value.strip_prefix("roi_").unwrap_or(value).to_string())
}

/// Resolve the period label to headline.
///
/// Preference: `recommended_period`, then legacy `recommended_roi_period`,
/// then an available `roi_30d` window, then `"30d"` for visitors. Connected
/// wallets with nothing to go on get `None`.
pub fn resolve_recommended_period_label(
    roi: Option<&RoiPayload>,
    is_connected: bool,
) -> Option<String> {
    if let Some(roi) = roi {
        if let Some(period) = explicit_period(roi.recommended_period.as_deref()) {
            return Some(period);
        }
        if let Some(period) = explicit_period(roi.recommended_roi_period.as_deref()) {
            return Some(period);
        }
        if roi.has_window("roi_30d") {
            return Some(DEFAULT_ROI_PERIOD.to_string());
        }
    }

    if !is_connected {
        return Some(DEFAULT_ROI_PERIOD.to_string());
    }

    None
}

/// The window matching a resolved period label, if the payload has one.
pub fn recommended_roi_window<'a>(
    windows: &'a [RankedRoiWindow],
    period_label: &str,
) -> Option<&'a RankedRoiWindow> {
    let wanted = parse_window_key(period_label);
    windows.iter().find(|window| {
        let key = window.key.strip_prefix("roi_").unwrap_or(&window.key);
        key == period_label || (wanted.is_some() && parse_window_key(&window.key) == wanted)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{OrderedMap, RoiWindowPayload};

    fn roi_window(key: &str, value: f64) -> RoiWindow {
        RoiWindow {
            key: key.to_string(),
            value,
            data_points: 10,
        }
    }

    #[test]
    fn test_sort_score_ordering() {
        assert!(derive_roi_window_sort_score("7d") < derive_roi_window_sort_score("30d"));
        assert!(derive_roi_window_sort_score("30d") < derive_roi_window_sort_score("365d"));
        assert_eq!(derive_roi_window_sort_score("roi_90d"), 90.0);
        assert!(derive_roi_window_sort_score("all_time") > derive_roi_window_sort_score("5y"));
    }

    #[test]
    fn test_format_label() {
        assert_eq!(format_roi_window_label("30d"), "30 days");
        assert_eq!(format_roi_window_label("roi_7d"), "7 days");
        assert_eq!(format_roi_window_label("mystery"), "mystery");
    }

    #[test]
    fn test_rank_windows_places_unknown_last_in_original_order() {
        let windows = vec![
            roi_window("zeta", 0.1),
            roi_window("roi_365d", 12.0),
            roi_window("alpha", 0.2),
            roi_window("roi_7d", 1.0),
            roi_window("roi_30d", 4.0),
        ];
        let keys: Vec<String> = rank_roi_windows(&windows).into_iter().map(|w| w.key).collect();
        assert_eq!(keys, vec!["roi_7d", "roi_30d", "roi_365d", "zeta", "alpha"]);
    }

    #[test]
    fn test_recommended_period_preference_order() {
        let mut roi = RoiPayload {
            recommended_period: Some("roi_90d".to_string()),
            recommended_roi_period: Some("roi_7d".to_string()),
            roi_30d: Some(2.0),
            ..Default::default()
        };
        assert_eq!(resolve_recommended_period_label(Some(&roi), true), Some("90d".to_string()));

        roi.recommended_period = Some("  ".to_string());
        assert_eq!(resolve_recommended_period_label(Some(&roi), true), Some("7d".to_string()));

        roi.recommended_roi_period = None;
        assert_eq!(resolve_recommended_period_label(Some(&roi), true), Some("30d".to_string()));

        roi.roi_30d = None;
        assert_eq!(resolve_recommended_period_label(Some(&roi), true), None);
        assert_eq!(resolve_recommended_period_label(Some(&roi), false), Some("30d".to_string()));
    }

    #[test]
    fn test_recommended_period_from_windows_map() {
        let roi = RoiPayload {
            windows: Some(OrderedMap(vec![(
                "roi_30d".to_string(),
                RoiWindowPayload {
                    value: Some(3.0),
                    data_points: Some(30),
                },
            )])),
            ..Default::default()
        };
        assert_eq!(resolve_recommended_period_label(Some(&roi), true), Some("30d".to_string()));
    }

    #[test]
    fn test_recommended_period_without_payload() {
        assert_eq!(resolve_recommended_period_label(None, false), Some("30d".to_string()));
        assert_eq!(resolve_recommended_period_label(None, true), None);
    }

    #[test]
    fn test_recommended_window_lookup() {
        let ranked = rank_roi_windows(&[roi_window("roi_7d", 1.0), roi_window("roi_30d", 4.0)]);
        assert_eq!(recommended_roi_window(&ranked, "30d").map(|w| w.value), Some(4.0));
        assert_eq!(recommended_roi_window(&ranked, "roi_7d").map(|w| w.value), Some(1.0));
        assert!(recommended_roi_window(&ranked, "90d").is_none());
    }
}
