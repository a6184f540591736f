//! Catalog cache.
//!
//! An in-process `moka` cache sits in front of an optional shared Redis.
//! Values are stored as JSON strings so both layers hold the same bytes.
//!
//! Redis is best-effort: any Redis error is logged and treated as a miss, so
//! a Redis outage slows the catalog down but never fails a request.

use std::time::Duration;

use bb8_redis::RedisConnectionManager;
use bb8_redis::bb8::Pool;
use bb8_redis::redis;
use moka::future::Cache;
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::CacheConfig;

const KEY_PREFIX: &str = "partitur:";
const REDIS_CONNECT_TIMEOUT: Duration = Duration::from_millis(500);

/// Two-level JSON cache for catalog responses.
#[derive(Clone)]
pub struct StoreCache {
    local: Cache<String, String>,
    redis: Option<Pool<RedisConnectionManager>>,
    ttl: Duration,
}

impl std::fmt::Debug for StoreCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreCache")
            .field("entries", &self.local.entry_count())
            .field("redis", &self.redis.is_some())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl StoreCache {
    /// Build the cache. An invalid `REDIS_URL` disables Redis with a warning.
    #[must_use]
    pub fn new(config: &CacheConfig) -> Self {
        let local = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_live(config.ttl)
            .build();

        let redis = config.redis_url.as_ref().and_then(|url| {
            match RedisConnectionManager::new(url.expose_secret()) {
                Ok(manager) => Some(
                    Pool::builder()
                        .max_size(8)
                        .connection_timeout(REDIS_CONNECT_TIMEOUT)
                        .build_unchecked(manager),
                ),
                Err(e) => {
                    warn!(error = %e, "Invalid REDIS_URL, using in-process cache only");
                    None
                }
            }
        });

        Self {
            local,
            redis,
            ttl: config.ttl,
        }
    }

    /// In-process cache only.
    #[must_use]
    pub fn local_only(ttl: Duration, max_entries: u64) -> Self {
        Self::new(&CacheConfig {
            redis_url: None,
            ttl,
            max_entries,
        })
    }

    /// Look up a value: local first, then Redis. A Redis hit is copied into
    /// the local cache.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.local.get(key).await {
            Some(raw) => Some(raw),
            None => {
                let raw = self.redis_get(key).await?;
                self.local.insert(key.to_string(), raw.clone()).await;
                Some(raw)
            }
        }?;

        match serde_json::from_str(&raw) {
            Ok(value) => {
                debug!(key, "Cache hit");
                Some(value)
            }
            Err(e) => {
                warn!(key, error = %e, "Discarding undecodable cache entry");
                self.delete(key).await;
                None
            }
        }
    }

    /// Store a value in both layers.
    pub async fn set_json<T: Serialize + Sync>(&self, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key, error = %e, "Failed to encode cache entry");
                return;
            }
        };

        self.local.insert(key.to_string(), raw.clone()).await;
        self.redis_set(key, raw).await;
    }

    /// Remove a value from both layers.
    pub async fn delete(&self, key: &str) {
        self.local.invalidate(key).await;

        let Some(pool) = &self.redis else {
            return;
        };
        let result: Result<(), String> = async {
            let mut conn = pool.get().await.map_err(|e| e.to_string())?;
            redis::cmd("DEL")
                .arg(prefixed(key))
                .query_async(&mut *conn)
                .await
                .map_err(|e| e.to_string())
        }
        .await;
        if let Err(e) = result {
            warn!(key, error = %e, "Redis DEL failed");
        }
    }

    async fn redis_get(&self, key: &str) -> Option<String> {
        let pool = self.redis.as_ref()?;
        let result: Result<Option<String>, String> = async {
            let mut conn = pool.get().await.map_err(|e| e.to_string())?;
            redis::cmd("GET")
                .arg(prefixed(key))
                .query_async(&mut *conn)
                .await
                .map_err(|e| e.to_string())
        }
        .await;

        result.unwrap_or_else(|e| {
            warn!(key, error = %e, "Redis GET failed, treating as miss");
            None
        })
    }

    async fn redis_set(&self, key: &str, raw: String) {
        let Some(pool) = &self.redis else {
            return;
        };
        let ttl_secs = self.ttl.as_secs().max(1);
        let result: Result<(), String> = async {
            let mut conn = pool.get().await.map_err(|e| e.to_string())?;
            redis::cmd("SET")
                .arg(prefixed(key))
                .arg(raw)
                .arg("EX")
                .arg(ttl_secs)
                .query_async(&mut *conn)
                .await
                .map_err(|e| e.to_string())
        }
        .await;
        if let Err(e) = result {
            warn!(key, error = %e, "Redis SET failed");
        }
    }
}

fn prefixed(key: &str) -> String {
    format!("{KEY_PREFIX}{key}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Entry {
        title: String,
        price: i64,
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = StoreCache::local_only(Duration::from_secs(60), 100);
        let entry = Entry {
            title: "Gloria".to_string(),
            price: 50_000,
        };

        cache.set_json("product:gloria", &entry).await;
        let cached: Option<Entry> = cache.get_json("product:gloria").await;
        assert_eq!(cached, Some(entry));
    }

    #[tokio::test]
    async fn test_miss_and_delete() {
        let cache = StoreCache::local_only(Duration::from_secs(60), 100);
        assert!(cache.get_json::<Entry>("missing").await.is_none());

        cache.set_json("k", &1_u32).await;
        cache.delete("k").await;
        assert!(cache.get_json::<u32>("k").await.is_none());
    }

    #[tokio::test]
    async fn test_type_mismatch_is_a_miss() {
        let cache = StoreCache::local_only(Duration::from_secs(60), 100);
        cache.set_json("k", &"not a number").await;
        assert!(cache.get_json::<u32>("k").await.is_none());
        assert!(cache.get_json::<String>("k").await.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_redis_falls_back_to_local() {
        let cache = StoreCache::new(&CacheConfig {
            redis_url: Some(SecretString::from("redis://127.0.0.1:1")),
            ttl: Duration::from_secs(60),
            max_entries: 10,
        });

        assert!(cache.get_json::<u32>("k").await.is_none());
        cache.set_json("k", &7_u32).await;
        assert_eq!(cache.get_json::<u32>("k").await, Some(7));
    }
}
