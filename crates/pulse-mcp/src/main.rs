//! Pulse MCP Server
//!
//! Model Context Protocol server exposing the Folio Pulse analytics engines to
//! AI agents over stdio. Callers supply the portfolio, yield, sentiment and
//! regime history payloads; the server classifies the market regime, compares
//! the portfolio's crypto/stable split against the regime target, selects the
//! representative yield window and ranks ROI windows.

mod cache;
mod config;
mod error;
mod tools;

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cache::DashboardCache;
use crate::config::AppConfig;
use crate::tools::{handle_request, JsonRpcRequest, PulseTools};

fn main() -> anyhow::Result<()> {
    // stdout carries the protocol, logs go to stderr
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pulse_mcp=info,pulse_core=warn")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting Pulse MCP Server");

    let rt = Runtime::new()?;

    let config = AppConfig::load()
        .map_err(|e| {
            tracing::warn!(error = %e, "Invalid or unreadable configuration, using defaults");
            e
        })
        .unwrap_or_default();

    tracing::info!(
        regimes = config.analytics.regime_thresholds.len(),
        stablecoins = config.analytics.stablecoins.len(),
        cache_ttl_seconds = config.cache.ttl_seconds,
        "Configuration loaded"
    );

    let cache = DashboardCache::new(&config.cache);
    let tools = Arc::new(PulseTools::new(Arc::new(config.analytics), cache));

    tracing::info!("MCP server ready, listening on stdio");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                tracing::error!(error = %e, "Error reading stdin");
                continue;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let request: JsonRpcRequest = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(error = %e, "Error parsing request");
                continue;
            }
        };

        tracing::debug!(method = %request.method, "Received request");

        let tools_clone = Arc::clone(&tools);
        let response = rt.block_on(async move { handle_request(&tools_clone, request).await });

        // Notifications get no response
        if let Some(response) = response {
            let response_str = serde_json::to_string(&response)?;
            if let Err(e) = writeln!(stdout, "{}", response_str) {
                tracing::error!(error = %e, "Error writing response");
            }
            if let Err(e) = stdout.flush() {
                tracing::error!(error = %e, "Error flushing stdout");
            }
        }
    }

    tracing::info!("MCP server shutting down");
    Ok(())
}
