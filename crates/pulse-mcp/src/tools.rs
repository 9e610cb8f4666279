//! MCP tool definitions and request handling
//!
//! Every tool works on payloads supplied by the caller; the server never
//! fetches anything itself.

use std::sync::Arc;

use pulse_core::{
    assemble_dashboard, calculate_allocation, calculate_delta, count_positions,
    net_balance_usd, parse_regime_history, process_sentiment_data, regime_from_sentiment,
    regime_strategy_info_at, summarize_roi, summarize_yield, AnalyticsConfig, DashboardPayloads,
    PositionPayload, RegimeHistoryEntryPayload, RegimeId, RoiPayload, SentimentPayload,
    YieldSummaryPayload,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::cache::{CacheKey, DashboardCache};
use crate::error::{parse_now, parse_regime, validate_finite, PulseMcpError, Result};

// =============================================================================
// MCP Protocol Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

// =============================================================================
// Argument Helpers
// =============================================================================

/// Optional argument; absent and `null` both read as `None`.
fn optional_arg<T: DeserializeOwned>(args: &Value, name: &str) -> Result<Option<T>> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
    }
}

fn required_f64(args: &Value, name: &str) -> Result<f64> {
    args.get(name)
        .and_then(Value::as_f64)
        .ok_or_else(|| PulseMcpError::InvalidParameter(format!("Missing {} parameter", name)))
}

fn required_str<'a>(args: &'a Value, name: &str) -> Result<&'a str> {
    args.get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| PulseMcpError::InvalidParameter(format!("Missing {} parameter", name)))
}

/// The whole argument object as a payload; missing arguments give the default.
fn payload_args<T: DeserializeOwned + Default>(args: &Value) -> Result<T> {
    if args.is_null() {
        return Ok(T::default());
    }
    Ok(serde_json::from_value(args.clone())?)
}

fn object_schema(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required
    })
}

// =============================================================================
// Pulse Tools
// =============================================================================

pub struct PulseTools {
    analytics: Arc<AnalyticsConfig>,
    cache: DashboardCache,
}

impl PulseTools {
    pub fn new(analytics: Arc<AnalyticsConfig>, cache: DashboardCache) -> Self {
        Self { analytics, cache }
    }

    /// Get all available tools
    pub fn get_tools(&self) -> Vec<Tool> {
        let positions_schema = json!({
            "type": "array",
            "description": "Portfolio positions (protocol_id, protocol_name, chain, total_usd_value, protocol_type, symbol)",
            "items": { "type": "object" }
        });
        let history_schema = json!({
            "type": "array",
            "description": "Regime history entries ({ regime_id, entered_at })",
            "items": { "type": "object" }
        });
        let now_schema = json!({
            "type": "string",
            "description": "Evaluation time (RFC 3339). Defaults to the current time."
        });

        vec![
            Tool {
                name: "pulse_health".to_string(),
                description: "Check the health of the Pulse analytics server and report its regime table and cache usage.".to_string(),
                input_schema: object_schema(json!({}), &[]),
            },
            Tool {
                name: "pulse_process_sentiment".to_string(),
                description: "Normalize a Fear & Greed payload into value, status and quote. Missing or malformed payloads read as neutral (50).".to_string(),
                input_schema: object_schema(
                    json!({
                        "sentiment": {
                            "type": ["object", "null"],
                            "description": "Sentiment payload { value, status, quote: { quote } }"
                        }
                    }),
                    &[],
                ),
            },
            Tool {
                name: "pulse_regime_from_sentiment".to_string(),
                description: "Classify a sentiment value (0-100) into a market regime and return its target allocation.".to_string(),
                input_schema: object_schema(
                    json!({
                        "value": { "type": "number", "description": "Sentiment index value" }
                    }),
                    &["value"],
                ),
            },
            Tool {
                name: "pulse_target_allocation".to_string(),
                description: "Get the target crypto/stable split for a regime.".to_string(),
                input_schema: object_schema(
                    json!({
                        "regime_id": {
                            "type": "string",
                            "description": "Regime id (ef, f, n, g, eg) or name"
                        }
                    }),
                    &["regime_id"],
                ),
            },
            Tool {
                name: "pulse_regime_strategy".to_string(),
                description: "Derive previous regime, strategy direction and time in the current regime from a regime history.".to_string(),
                input_schema: object_schema(
                    json!({ "history": history_schema, "now": now_schema }),
                    &[],
                ),
            },
            Tool {
                name: "pulse_calculate_allocation".to_string(),
                description: "Split portfolio positions into crypto and stable buckets with per-symbol constituents. Debt is excluded from the ratio.".to_string(),
                input_schema: object_schema(json!({ "positions": positions_schema }), &[]),
            },
            Tool {
                name: "pulse_calculate_delta".to_string(),
                description: "Drift of the current crypto percentage from a target, given either a target percentage or a regime.".to_string(),
                input_schema: object_schema(
                    json!({
                        "current_crypto_pct": { "type": "number", "description": "Current crypto share in percent" },
                        "target_crypto_pct": { "type": "number", "description": "Target crypto share in percent" },
                        "regime_id": { "type": "string", "description": "Regime whose target to use when no target is given" }
                    }),
                    &["current_crypto_pct"],
                ),
            },
            Tool {
                name: "pulse_select_yield_window".to_string(),
                description: "Select the most representative yield window and classify its data confidence.".to_string(),
                input_schema: object_schema(
                    json!({
                        "windows": {
                            "type": "object",
                            "description": "Yield windows keyed by period (7d, 30d, ...), in display order"
                        }
                    }),
                    &[],
                ),
            },
            Tool {
                name: "pulse_rank_roi_windows".to_string(),
                description: "Order ROI windows from shortest to longest and resolve the recommended headline period.".to_string(),
                input_schema: object_schema(
                    json!({
                        "roi": {
                            "type": ["object", "null"],
                            "description": "ROI block ({ windows } or legacy roi_7d..roi_365d fields, recommended_period)"
                        },
                        "is_connected": {
                            "type": "boolean",
                            "description": "Whether a wallet is connected (default: false)"
                        }
                    }),
                    &[],
                ),
            },
            Tool {
                name: "pulse_assemble_dashboard".to_string(),
                description: "Run every analytics engine over portfolio, yield, sentiment and regime history payloads and return the full dashboard record.".to_string(),
                input_schema: object_schema(
                    json!({
                        "portfolio": { "type": ["object", "null"], "description": "Portfolio payload { positions, roi, estimated_yearly_pnl_usd }" },
                        "yield_summary": { "type": ["object", "null"], "description": "Yield summary payload { windows }" },
                        "sentiment": { "type": ["object", "null"], "description": "Sentiment payload" },
                        "regime_history": history_schema,
                        "is_connected": { "type": "boolean", "description": "Whether a wallet is connected (default: false)" },
                        "now": now_schema
                    }),
                    &[],
                ),
            },
        ]
    }

    /// Execute a tool by name
    pub async fn execute(&self, name: &str, args: &Value) -> Result<Value> {
        let config = self.analytics.as_ref();

        match name {
            "pulse_health" => Ok(json!({
                "status": "healthy",
                "version": env!("CARGO_PKG_VERSION"),
                "regime_thresholds": config.regime_thresholds,
                "cache": self.cache.stats()
            })),

            "pulse_process_sentiment" => {
                let payload: Option<SentimentPayload> = optional_arg(args, "sentiment")?;
                let reading = process_sentiment_data(payload.as_ref(), config);
                let regime = regime_from_sentiment(reading.value, &config.regime_thresholds);
                Ok(json!({
                    "sentiment": reading,
                    "regime_id": regime
                }))
            }

            "pulse_regime_from_sentiment" => {
                let value = required_f64(args, "value")?;
                validate_finite("value", value)?;
                let regime = regime_from_sentiment(value, &config.regime_thresholds);
                Ok(regime_view(regime, config))
            }

            "pulse_target_allocation" => {
                let regime = parse_regime(required_str(args, "regime_id")?)?;
                Ok(regime_view(regime, config))
            }

            "pulse_regime_strategy" => {
                let history: Option<Vec<RegimeHistoryEntryPayload>> = optional_arg(args, "history")?;
                let now = parse_now(args.get("now").and_then(Value::as_str))?;
                let entries = history.as_deref().map(parse_regime_history);
                let info = regime_strategy_info_at(entries.as_deref(), now);
                Ok(serde_json::to_value(info)?)
            }

            "pulse_calculate_allocation" => {
                let payloads: Vec<PositionPayload> =
                    optional_arg(args, "positions")?.unwrap_or_default();
                let positions: Vec<_> = payloads.iter().map(PositionPayload::to_position).collect();
                Ok(json!({
                    "allocation": calculate_allocation(&positions, config),
                    "net_balance_usd": net_balance_usd(&positions),
                    "position_counts": count_positions(&positions)
                }))
            }

            "pulse_calculate_delta" => {
                let current = required_f64(args, "current_crypto_pct")?;
                validate_finite("current_crypto_pct", current)?;

                let target = match args.get("target_crypto_pct").and_then(Value::as_f64) {
                    Some(target) => target,
                    None => {
                        let regime = parse_regime(required_str(args, "regime_id").map_err(|_| {
                            PulseMcpError::InvalidParameter(
                                "Provide either target_crypto_pct or regime_id".into(),
                            )
                        })?)?;
                        config.target_allocation(regime).crypto_pct
                    }
                };
                validate_finite("target_crypto_pct", target)?;

                Ok(json!({
                    "current_crypto_pct": current,
                    "target_crypto_pct": target,
                    "delta": calculate_delta(current, target)
                }))
            }

            "pulse_select_yield_window" => {
                // No windows selects nothing and serializes as null
                let summary: YieldSummaryPayload = payload_args(args)?;
                Ok(serde_json::to_value(summarize_yield(Some(&summary), config))?)
            }

            "pulse_rank_roi_windows" => {
                let roi: Option<RoiPayload> = optional_arg(args, "roi")?;
                let is_connected = args
                    .get("is_connected")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                Ok(serde_json::to_value(summarize_roi(roi.as_ref(), is_connected))?)
            }

            "pulse_assemble_dashboard" => {
                let key = CacheKey::new(name, args);
                if let Some(cached) = self.cache.get(&key).await {
                    tracing::debug!("Dashboard cache hit");
                    return Ok(cached.as_ref().clone());
                }

                let payloads: DashboardPayloads = payload_args(args)?;
                let now = parse_now(args.get("now").and_then(Value::as_str))?;
                let snapshot = assemble_dashboard(&payloads, config, now);
                let value = serde_json::to_value(snapshot)?;
                Ok(self.cache.insert(key, value).await.as_ref().clone())
            }

            _ => Err(PulseMcpError::UnknownTool(name.to_string())),
        }
    }
}

fn regime_view(regime: RegimeId, config: &AnalyticsConfig) -> Value {
    json!({
        "regime_id": regime,
        "label": regime.label(),
        "status": regime.status(),
        "target_allocation": config.target_allocation(regime)
    })
}

// =============================================================================
// MCP Protocol Handlers
// =============================================================================

fn handle_initialize(_params: &Value) -> Value {
    json!({
        "protocolVersion": "2024-11-05",
        "capabilities": {
            "tools": {}
        },
        "serverInfo": {
            "name": "pulse-mcp",
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}

fn handle_list_tools(tools: &PulseTools) -> Value {
    json!({
        "tools": tools.get_tools()
    })
}

async fn handle_call_tool(tools: &PulseTools, params: &Value) -> Value {
    let name = params["name"].as_str().unwrap_or("");
    let args = &params["arguments"];

    match tools.execute(name, args).await {
        Ok(result) => {
            json!({
                "content": [{
                    "type": "text",
                    "text": serde_json::to_string_pretty(&result).unwrap_or_default()
                }]
            })
        }
        Err(e) => {
            tracing::warn!(tool = %name, error = %e, "Tool call failed");
            json!({
                "content": [{
                    "type": "text",
                    "text": format!("Error: {}", e)
                }],
                "isError": true
            })
        }
    }
}

/// Handle an incoming MCP request
pub async fn handle_request(tools: &PulseTools, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
    let result = match request.method.as_str() {
        "initialize" => Some(handle_initialize(&request.params)),
        "initialized" | "notifications/initialized" => None,
        "tools/list" => Some(handle_list_tools(tools)),
        "tools/call" => Some(handle_call_tool(tools, &request.params).await),
        "notifications/cancelled" => None,
        _ => {
            return Some(JsonRpcResponse {
                jsonrpc: "2.0".to_string(),
                id: request.id,
                result: None,
                error: Some(JsonRpcError {
                    code: -32601,
                    message: format!("Method not found: {}", request.method),
                }),
            });
        }
    };

    result.map(|r| JsonRpcResponse {
        jsonrpc: "2.0".to_string(),
        id: request.id,
        result: Some(r),
        error: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;

    fn tools() -> PulseTools {
        PulseTools::new(
            Arc::new(AnalyticsConfig::default()),
            DashboardCache::new(&CacheConfig::default()),
        )
    }

    fn request(method: &str, params: Value) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: json!(1),
            method: method.to_string(),
            params,
        }
    }

    async fn call(tools: &PulseTools, name: &str, arguments: Value) -> Value {
        let response = handle_request(
            tools,
            request("tools/call", json!({ "name": name, "arguments": arguments })),
        )
        .await
        .unwrap();
        response.result.unwrap()
    }

    fn text_json(result: &Value) -> Value {
        serde_json::from_str(result["content"][0]["text"].as_str().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_initialize_and_list() {
        let tools = tools();
        let init = handle_request(&tools, request("initialize", json!({}))).await.unwrap();
        assert_eq!(init.result.unwrap()["serverInfo"]["name"], "pulse-mcp");

        let list = handle_request(&tools, request("tools/list", Value::Null)).await.unwrap();
        let names: Vec<String> = list.result.unwrap()["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names.len(), 10);
        assert!(names.contains(&"pulse_assemble_dashboard".to_string()));
    }

    #[tokio::test]
    async fn test_notifications_get_no_response() {
        let tools = tools();
        assert!(handle_request(&tools, request("initialized", Value::Null)).await.is_none());
        assert!(handle_request(&tools, request("notifications/cancelled", Value::Null))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let response = handle_request(&tools(), request("resources/list", Value::Null))
            .await
            .unwrap();
        assert!(response.result.is_none());
        assert_eq!(response.error.unwrap().code, -32601);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_error_content() {
        let result = call(&tools(), "pulse_teleport", json!({})).await;
        assert_eq!(result["isError"], true);
        assert!(result["content"][0]["text"].as_str().unwrap().contains("Unknown tool"));
    }

    #[tokio::test]
    async fn test_regime_tools() {
        let tools = tools();
        let regime = text_json(&call(&tools, "pulse_regime_from_sentiment", json!({ "value": 80 })).await);
        assert_eq!(regime["regime_id"], "eg");
        assert_eq!(regime["status"], "Extreme Greed");
        assert_eq!(regime["target_allocation"]["crypto_pct"], 30.0);

        let target = text_json(&call(&tools, "pulse_target_allocation", json!({ "regime_id": "fear" })).await);
        assert_eq!(target["target_allocation"]["stable_pct"], 40.0);

        let bad = call(&tools, "pulse_target_allocation", json!({ "regime_id": "panic" })).await;
        assert_eq!(bad["isError"], true);
    }

    #[tokio::test]
    async fn test_process_null_sentiment() {
        let result = text_json(&call(&tools(), "pulse_process_sentiment", json!({ "sentiment": null })).await);
        assert_eq!(result["sentiment"]["value"], 50.0);
        assert_eq!(result["sentiment"]["status"], "Neutral");
        assert_eq!(result["regime_id"], "n");
    }

    #[tokio::test]
    async fn test_regime_strategy_with_fixed_now() {
        let result = text_json(
            &call(
                &tools(),
                "pulse_regime_strategy",
                json!({
                    "history": [
                        { "regime_id": "g", "entered_at": "2025-03-01T00:00:00Z" },
                        { "regime_id": "n", "entered_at": "2025-03-09T12:00:00Z" }
                    ],
                    "now": "2025-03-10T00:00:00Z"
                }),
            )
            .await,
        );
        assert_eq!(result["previous_regime"], "g");
        assert_eq!(result["strategy_direction"], "fromRight");
        assert_eq!(result["regime_duration"]["hours"], 12);
        assert_eq!(result["regime_duration"]["human_readable"], "12 hours");
    }

    #[tokio::test]
    async fn test_calculate_delta_from_regime() {
        let tools = tools();
        let result = text_json(
            &call(&tools, "pulse_calculate_delta", json!({ "current_crypto_pct": 60, "regime_id": "ef" })).await,
        );
        assert_eq!(result["delta"], -10.0);

        let missing = call(&tools, "pulse_calculate_delta", json!({ "current_crypto_pct": 60 })).await;
        assert_eq!(missing["isError"], true);
    }

    #[tokio::test]
    async fn test_calculate_delta_is_unclamped() {
        let result = text_json(
            &call(
                &tools(),
                "pulse_calculate_delta",
                json!({ "current_crypto_pct": 120, "target_crypto_pct": -5 }),
            )
            .await,
        );
        assert_eq!(result["delta"], 125.0);
    }

    #[tokio::test]
    async fn test_yield_tie_keeps_argument_order() {
        let result = text_json(
            &call(
                &tools(),
                "pulse_select_yield_window",
                json!({ "windows": {
                    "30d": { "average_daily_yield_usd": 1.0, "statistics": { "filtered_days": 10 } },
                    "7d": { "average_daily_yield_usd": 2.0, "statistics": { "filtered_days": 10 } }
                } }),
            )
            .await,
        );
        assert_eq!(result["key"], "30d");
        assert_eq!(result["confidence"], "improving");
    }

    #[tokio::test]
    async fn test_select_yield_window_without_windows_is_null() {
        let tools = tools();
        let empty = call(&tools, "pulse_select_yield_window", json!({ "windows": {} })).await;
        assert!(empty.get("isError").is_none());
        assert_eq!(text_json(&empty), Value::Null);

        let missing = call(&tools, "pulse_select_yield_window", json!({})).await;
        assert!(missing.get("isError").is_none());
        assert_eq!(text_json(&missing), Value::Null);
    }

    #[tokio::test]
    async fn test_rank_roi_windows_legacy_fields() {
        let result = text_json(
            &call(
                &tools(),
                "pulse_rank_roi_windows",
                json!({ "roi": { "roi_90d": 8.0, "roi_7d": 1.0, "roi_30d": 3.0 }, "is_connected": true }),
            )
            .await,
        );
        let keys: Vec<&str> = result["windows"]
            .as_array()
            .unwrap()
            .iter()
            .map(|w| w["key"].as_str().unwrap())
            .collect();
        assert_eq!(keys, vec!["roi_7d", "roi_30d", "roi_90d"]);
        assert_eq!(result["recommended_period"], "30d");
        assert_eq!(result["recommended_value"], 3.0);
    }

    #[tokio::test]
    async fn test_assemble_dashboard_is_cached() {
        let tools = tools();
        let args = json!({
            "sentiment": { "value": 20 },
            "portfolio": { "positions": [
                { "symbol": "BTC", "total_usd_value": 6000.0 },
                { "symbol": "USDC", "total_usd_value": 4000.0 }
            ] }
        });

        let first = text_json(&call(&tools, "pulse_assemble_dashboard", args.clone()).await);
        assert_eq!(first["current_regime"], "ef");
        assert!((first["delta"].as_f64().unwrap() + 10.0).abs() < 1e-9);

        let second = text_json(&call(&tools, "pulse_assemble_dashboard", args).await);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_assemble_dashboard_rejects_bad_now() {
        let result = call(&tools(), "pulse_assemble_dashboard", json!({ "now": "soon" })).await;
        assert_eq!(result["isError"], true);
    }
}
