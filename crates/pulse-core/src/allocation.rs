//! Allocation engine
//!
//! Splits a portfolio into crypto and stable buckets, breaks each bucket down
//! by symbol, and measures drift against the regime target.

use std::collections::{HashMap, HashSet};

use crate::config::AnalyticsConfig;
use crate::models::{
    AllocationConstituents, AllocationSnapshot, AssetBucket, Constituent, Position,
    PositionCategory, PositionCounts,
};

/// Symbol of the synthetic constituent holding the long tail.
pub const OTHER_SYMBOL: &str = "Other";

const MULTIPLE: &str = "multiple";

/// Bucket a symbol belongs to.
pub fn classify_symbol(symbol: &str, config: &AnalyticsConfig) -> AssetBucket {
    if config.is_stablecoin(symbol) {
        AssetBucket::Stable
    } else {
        AssetBucket::Crypto
    }
}

fn counts_toward_allocation(position: &Position) -> bool {
    position.category == PositionCategory::Asset
        && position.usd_value.is_finite()
        && position.usd_value > 0.0
}

fn pct(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        100.0 * part / whole
    } else {
        0.0
    }
}

/// Per-symbol accumulator; keeps the largest contributor for chain/protocol.
struct SymbolTotal<'a> {
    symbol: String,
    value_usd: f64,
    largest: &'a Position,
}

fn group_by_symbol<'a>(positions: &[&'a Position]) -> Vec<SymbolTotal<'a>> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut totals: Vec<SymbolTotal<'a>> = Vec::new();

    for &position in positions {
        let symbol = position.symbol.trim().to_uppercase();
        match index.get(&symbol) {
            Some(&i) => {
                let total = &mut totals[i];
                total.value_usd += position.usd_value;
                if position.usd_value > total.largest.usd_value {
                    total.largest = position;
                }
            }
            None => {
                index.insert(symbol.clone(), totals.len());
                totals.push(SymbolTotal {
                    symbol,
                    value_usd: position.usd_value,
                    largest: position,
                });
            }
        }
    }

    totals
}

fn build_constituents(positions: &[&Position], bucket_total: f64) -> Vec<Constituent> {
    let mut constituents: Vec<Constituent> = group_by_symbol(positions)
        .into_iter()
        .map(|total| Constituent {
            weight_pct: pct(total.value_usd, bucket_total),
            value_usd: total.value_usd,
            chain: total.largest.chain.clone(),
            protocol: total.largest.protocol_name.clone(),
            symbol: total.symbol,
        })
        .collect();

    constituents.sort_by(|a, b| {
        b.value_usd
            .total_cmp(&a.value_usd)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
    constituents
}

/// Top `top_n` constituents, with anything past that rolled into "Other".
pub fn simplify_constituents(constituents: &[Constituent], top_n: usize) -> Vec<Constituent> {
    if constituents.len() <= top_n {
        return constituents.to_vec();
    }

    let (head, tail) = constituents.split_at(top_n);
    let mut simplified = head.to_vec();
    simplified.push(Constituent {
        symbol: OTHER_SYMBOL.to_string(),
        value_usd: tail.iter().map(|c| c.value_usd).sum(),
        weight_pct: tail.iter().map(|c| c.weight_pct).sum(),
        chain: MULTIPLE.to_string(),
        protocol: MULTIPLE.to_string(),
    });
    simplified
}

/// Aggregate positions into a crypto/stable allocation snapshot.
///
/// Debt and non-positive positions are left out of the ratio. Percentages are
/// 0 when nothing is left to divide by.
pub fn calculate_allocation(positions: &[Position], config: &AnalyticsConfig) -> AllocationSnapshot {
    let mut crypto: Vec<&Position> = Vec::new();
    let mut stable: Vec<&Position> = Vec::new();

    for position in positions.iter().filter(|p| counts_toward_allocation(p)) {
        match classify_symbol(&position.symbol, config) {
            AssetBucket::Crypto => crypto.push(position),
            AssetBucket::Stable => stable.push(position),
        }
    }

    let crypto_value_usd: f64 = crypto.iter().map(|p| p.usd_value).sum();
    let stable_value_usd: f64 = stable.iter().map(|p| p.usd_value).sum();
    let total_value_usd = crypto_value_usd + stable_value_usd;

    let crypto_constituents = build_constituents(&crypto, crypto_value_usd);
    let stable_constituents = build_constituents(&stable, stable_value_usd);
    let simplified_crypto = simplify_constituents(&crypto_constituents, config.simplified_top_n);

    tracing::debug!(
        positions = positions.len(),
        crypto_positions = crypto.len(),
        stable_positions = stable.len(),
        total_value_usd,
        "Calculated allocation"
    );

    AllocationSnapshot {
        crypto_value_usd,
        stable_value_usd,
        total_value_usd,
        crypto_pct: pct(crypto_value_usd, total_value_usd),
        stable_pct: pct(stable_value_usd, total_value_usd),
        constituents: AllocationConstituents {
            crypto: crypto_constituents,
            stable: stable_constituents,
        },
        simplified_crypto,
    }
}

/// Drift of the current crypto share from the target. Positive means
/// over-allocated to crypto.
pub fn calculate_delta(current_crypto_pct: f64, target_crypto_pct: f64) -> f64 {
    current_crypto_pct - target_crypto_pct
}

/// Assets minus outstanding debt.
pub fn net_balance_usd(positions: &[Position]) -> f64 {
    positions
        .iter()
        .filter(|p| p.usd_value.is_finite())
        .map(|p| match p.category {
            PositionCategory::Asset => p.usd_value,
            PositionCategory::Debt => -p.usd_value.abs(),
        })
        .sum()
}

pub fn count_positions(positions: &[Position]) -> PositionCounts {
    let debts = positions
        .iter()
        .filter(|p| p.category == PositionCategory::Debt)
        .count();
    let protocols: HashSet<&str> = positions.iter().map(|p| p.protocol_id.as_str()).collect();
    let chains: HashSet<&str> = positions.iter().map(|p| p.chain.as_str()).collect();

    PositionCounts {
        total: positions.len(),
        assets: positions.len() - debts,
        debts,
        protocols: protocols.len(),
        chains: chains.len(),
    }
}
