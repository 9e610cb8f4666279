//! Sentiment processing

use crate::config::AnalyticsConfig;
use crate::models::SentimentReading;
use crate::payload::SentimentPayload;
use crate::regime::{regime_from_sentiment, NEUTRAL_SENTIMENT};

/// Normalize a raw sentiment payload into value, status and quote.
///
/// The value is taken as-is. Status always comes from the configured bands,
/// and the quote falls back to the regime's default when the service sent none.
pub fn process_sentiment_data(
    raw: Option<&SentimentPayload>,
    config: &AnalyticsConfig,
) -> SentimentReading {
    let value = raw
        .and_then(|payload| payload.value)
        .filter(|v| v.is_finite())
        .unwrap_or(NEUTRAL_SENTIMENT);

    let regime = regime_from_sentiment(value, &config.regime_thresholds);

    let quote = raw
        .and_then(SentimentPayload::quote_text)
        .unwrap_or_else(|| config.default_quote(regime))
        .to_string();

    if raw.is_none() {
        tracing::debug!("No sentiment payload, using neutral reading");
    }

    SentimentReading {
        value,
        status: regime.status(),
        quote,
    }
}
