//! Lookup tables driving the analytics engines
//!
//! Regime cut points, per-regime targets and quotes, badge day thresholds and
//! the stablecoin table are all passed in through [`AnalyticsConfig`] so the
//! engines carry no hidden constants.

use serde::{Deserialize, Serialize};

use crate::error::{PulseError, PulseResult};
use crate::models::{RegimeId, TargetAllocation};

/// Tolerance for percentage tables that must add up to 100.
pub const PCT_EPSILON: f64 = 1e-6;

/// Upper bound (inclusive) of the sentiment band belonging to a regime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeThreshold {
    pub regime: RegimeId,
    pub max_value: f64,
}

/// Target allocation and fallback quote for one regime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeProfile {
    pub target: TargetAllocation,
    pub quote: String,
}

/// One profile per regime. Fixed fields keep the lookup total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeProfiles {
    pub extreme_fear: RegimeProfile,
    pub fear: RegimeProfile,
    pub neutral: RegimeProfile,
    pub greed: RegimeProfile,
    pub extreme_greed: RegimeProfile,
}

impl RegimeProfiles {
    pub fn get(&self, regime: RegimeId) -> &RegimeProfile {
        match regime {
            RegimeId::ExtremeFear => &self.extreme_fear,
            RegimeId::Fear => &self.fear,
            RegimeId::Neutral => &self.neutral,
            RegimeId::Greed => &self.greed,
            RegimeId::ExtremeGreed => &self.extreme_greed,
        }
    }
}

impl Default for RegimeProfiles {
    fn default() -> Self {
        Self {
            extreme_fear: profile(
                70.0,
                "Be greedy when others are fearful. Extreme fear has historically marked accumulation zones.",
            ),
            fear: profile(
                60.0,
                "Fear is on the table. Lean into crypto gradually while keeping dry powder.",
            ),
            neutral: profile(
                50.0,
                "Markets are balanced. Hold the line and let the portfolio compound.",
            ),
            greed: profile(
                40.0,
                "Greed is building. Start taking profits into stables.",
            ),
            extreme_greed: profile(
                30.0,
                "Be fearful when others are greedy. Protect gains before the crowd turns.",
            ),
        }
    }
}

fn profile(crypto_pct: f64, quote: &str) -> RegimeProfile {
    RegimeProfile {
        target: TargetAllocation {
            crypto_pct,
            stable_pct: 100.0 - crypto_pct,
        },
        quote: quote.to_string(),
    }
}

/// Day counts separating preliminary, improving and established yield data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeThresholds {
    pub min_preliminary_days: u32,
    pub min_confidence_days: u32,
}

impl Default for BadgeThresholds {
    fn default() -> Self {
        Self {
            min_preliminary_days: 7,
            min_confidence_days: 14,
        }
    }
}

/// All tables used by the analytics engines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Ordered sentiment bands, lowest first
    #[serde(default = "default_regime_thresholds")]
    pub regime_thresholds: Vec<RegimeThreshold>,

    #[serde(default)]
    pub regime_profiles: RegimeProfiles,

    #[serde(default)]
    pub badges: BadgeThresholds,

    /// Symbols classified into the stable bucket (case-insensitive)
    #[serde(default = "default_stablecoins")]
    pub stablecoins: Vec<String>,

    /// Crypto constituents shown before rolling the rest into "Other"
    #[serde(default = "default_simplified_top_n")]
    pub simplified_top_n: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            regime_thresholds: default_regime_thresholds(),
            regime_profiles: RegimeProfiles::default(),
            badges: BadgeThresholds::default(),
            stablecoins: default_stablecoins(),
            simplified_top_n: default_simplified_top_n(),
        }
    }
}

fn default_regime_thresholds() -> Vec<RegimeThreshold> {
    [
        (RegimeId::ExtremeFear, 25.0),
        (RegimeId::Fear, 45.0),
        (RegimeId::Neutral, 54.0),
        (RegimeId::Greed, 75.0),
        (RegimeId::ExtremeGreed, 100.0),
    ]
    .into_iter()
    .map(|(regime, max_value)| RegimeThreshold { regime, max_value })
    .collect()
}

fn default_stablecoins() -> Vec<String> {
    [
        "USDC", "USDT", "DAI", "USDE", "SUSDE", "FRAX", "LUSD", "TUSD", "USDBC", "USDC.E",
        "PYUSD", "GHO", "CRVUSD", "FDUSD", "USDS", "SDAI", "USD+",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_simplified_top_n() -> usize {
    3
}

impl AnalyticsConfig {
    /// Target allocation for a regime. Always the same record for the same id.
    pub fn target_allocation(&self, regime: RegimeId) -> &TargetAllocation {
        &self.regime_profiles.get(regime).target
    }

    pub fn default_quote(&self, regime: RegimeId) -> &str {
        &self.regime_profiles.get(regime).quote
    }

    pub fn is_stablecoin(&self, symbol: &str) -> bool {
        let symbol = symbol.trim();
        self.stablecoins
            .iter()
            .any(|stable| stable.eq_ignore_ascii_case(symbol))
    }

    /// Reject tables that would break the engines' invariants.
    pub fn validate(&self) -> PulseResult<()> {
        if self.regime_thresholds.is_empty() {
            return Err(PulseError::InvalidConfig(
                "regime_thresholds cannot be empty".into(),
            ));
        }

        for pair in self.regime_thresholds.windows(2) {
            let (lower, upper) = (&pair[0], &pair[1]);
            if upper.max_value <= lower.max_value {
                return Err(PulseError::InvalidConfig(format!(
                    "regime thresholds must be strictly increasing ({} then {})",
                    lower.max_value, upper.max_value
                )));
            }
            if upper.regime.ordinal() < lower.regime.ordinal() {
                return Err(PulseError::InvalidConfig(format!(
                    "regime '{}' cannot follow '{}' on the sentiment axis",
                    upper.regime, lower.regime
                )));
            }
        }

        if let Some(bad) = self.regime_thresholds.iter().find(|t| !t.max_value.is_finite()) {
            return Err(PulseError::InvalidConfig(format!(
                "threshold for '{}' is not a finite number",
                bad.regime
            )));
        }

        let last = &self.regime_thresholds[self.regime_thresholds.len() - 1];
        if last.max_value < 100.0 {
            return Err(PulseError::InvalidConfig(format!(
                "regime thresholds must cover sentiment up to 100 (last bound {})",
                last.max_value
            )));
        }

        for regime in RegimeId::ALL {
            let target = self.target_allocation(regime);
            let in_range = (0.0..=100.0).contains(&target.crypto_pct)
                && (0.0..=100.0).contains(&target.stable_pct);
            if !in_range || (target.crypto_pct + target.stable_pct - 100.0).abs() > PCT_EPSILON {
                return Err(PulseError::InvalidConfig(format!(
                    "target allocation for '{}' must split 100% ({} / {})",
                    regime, target.crypto_pct, target.stable_pct
                )));
            }
        }

        if self.badges.min_preliminary_days > self.badges.min_confidence_days {
            return Err(PulseError::InvalidConfig(format!(
                "min_preliminary_days ({}) exceeds min_confidence_days ({})",
                self.badges.min_preliminary_days, self.badges.min_confidence_days
            )));
        }

        if self.simplified_top_n == 0 {
            return Err(PulseError::InvalidConfig(
                "simplified_top_n must be at least 1".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(AnalyticsConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_target_allocation_is_referentially_stable() {
        let config = AnalyticsConfig::default();
        let first = config.target_allocation(RegimeId::Greed);
        let second = config.target_allocation(RegimeId::Greed);
        assert!(std::ptr::eq(first, second));
        assert_eq!(first, second);
        assert_eq!(first.crypto_pct, 40.0);
    }

    #[test]
    fn test_stablecoin_lookup_is_case_insensitive() {
        let config = AnalyticsConfig::default();
        assert!(config.is_stablecoin("usdc"));
        assert!(config.is_stablecoin(" DAI "));
        assert!(!config.is_stablecoin("BTC"));
    }

    #[test]
    fn test_rejects_unordered_thresholds() {
        let mut config = AnalyticsConfig::default();
        config.regime_thresholds.swap(0, 1);
        assert!(matches!(config.validate(), Err(PulseError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_thresholds_not_reaching_100() {
        let mut config = AnalyticsConfig::default();
        config.regime_thresholds.last_mut().unwrap().max_value = 90.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_target_not_summing_to_100() {
        let mut config = AnalyticsConfig::default();
        config.regime_profiles.neutral.target.stable_pct = 60.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_inverted_badge_thresholds() {
        let mut config = AnalyticsConfig::default();
        config.badges.min_preliminary_days = 30;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: AnalyticsConfig =
            serde_json::from_str(r#"{ "simplified_top_n": 5 }"#).unwrap();
        assert_eq!(config.simplified_top_n, 5);
        assert_eq!(config.regime_thresholds.len(), 5);
        assert_eq!(config.badges.min_confidence_days, 14);
    }
}
