//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::cache::StoreCache;
use crate::config::StorefrontConfig;
use crate::midtrans::MidtransClient;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    cache: StoreCache,
    midtrans: MidtransClient,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - `PostgreSQL` connection pool
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Self {
        let midtrans = MidtransClient::new(&config.midtrans);
        let cache = StoreCache::new(&config.cache);
        Self::with_parts(config, pool, cache, midtrans)
    }

    /// Create state from prebuilt parts (tests point the Midtrans client at
    /// a mock).
    #[must_use]
    pub fn with_parts(
        config: StorefrontConfig,
        pool: PgPool,
        cache: StoreCache,
        midtrans: MidtransClient,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                cache,
                midtrans,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the catalog cache.
    #[must_use]
    pub fn cache(&self) -> &StoreCache {
        &self.inner.cache
    }

    /// Get a reference to the Midtrans client.
    #[must_use]
    pub fn midtrans(&self) -> &MidtransClient {
        &self.inner.midtrans
    }
}
