//! Memoization of assembled dashboards
//!
//! Agents tend to re-request the same dashboard while they reason about it.
//! Entries are keyed by the tool name and its serialized arguments and expire after
//! the configured TTL.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde::Serialize;
use serde_json::Value;

use crate::config::CacheConfig;

/// A tool call identified by its name and serialized arguments.
/// Key order in the arguments is significant.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct CacheKey {
    tool: String,
    arguments: String,
}

impl CacheKey {
    pub fn new(tool: &str, arguments: &Value) -> Self {
        Self {
            tool: tool.to_string(),
            arguments: arguments.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct DashboardCache {
    cache: Cache<CacheKey, Arc<Value>>,
}

impl DashboardCache {
    pub fn new(config: &CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(Duration::from_secs(config.ttl_seconds))
            .build();

        Self { cache }
    }

    pub async fn get(&self, key: &CacheKey) -> Option<Arc<Value>> {
        self.cache.get(key).await
    }

    pub async fn insert(&self, key: CacheKey, value: Value) -> Arc<Value> {
        let value = Arc::new(value);
        self.cache.insert(key, Arc::clone(&value)).await;
        value
    }

    /// Get cache statistics for monitoring
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.cache.entry_count(),
            weighted_size: self.cache.weighted_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub entry_count: u64,
    pub weighted_size: u64,
}
