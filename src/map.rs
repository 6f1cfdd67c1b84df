//! C5 — the lazily-populated map from [`Endpoint`] to [`Pool`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::{
    connector::Connector, endpoint::Endpoint, error::Result, events::PoolHandler,
    health::HealthChecker, options::PoolOptions, pool::Pool,
};

/// A concurrent, lazily-populated registry of one [`Pool`] per [`Endpoint`].
///
/// Construction is lazy and atomic: concurrent callers racing `get_or_create`
/// for the same endpoint are guaranteed to observe the same `Pool`, never two
/// separate dispatchers for one endpoint. `DashMap::entry` provides this
/// directly, which is a strictly stronger guarantee than "construct a
/// candidate pool, then discard it if another caller won the race" — the
/// candidate is never constructed at all for the losing callers.
///
/// Every pool the map creates shares one `PoolOptions`, validated once at
/// [`PoolMap::new`] so that `get_or_create` itself can never fail.
pub struct PoolMap<C, H> {
    pools: DashMap<Endpoint, Pool>,
    options: PoolOptions,
    connector: Arc<C>,
    health_checker: Arc<H>,
    handler: Option<Arc<dyn PoolHandler>>,
}

impl<C, H> PoolMap<C, H>
where
    C: Connector + Clone,
    H: HealthChecker + Clone,
{
    /// Creates an empty map. Returns [`crate::error::PoolError::InvalidConfig`]
    /// if `options` is invalid, before any pool is ever constructed.
    pub fn new(
        options: PoolOptions,
        connector: C,
        health_checker: H,
        handler: Option<Arc<dyn PoolHandler>>,
    ) -> Result<Self> {
        options.validate()?;
        Ok(PoolMap {
            pools: DashMap::new(),
            options,
            connector: Arc::new(connector),
            health_checker: Arc::new(health_checker),
            handler,
        })
    }

    /// Returns the pool for `endpoint`, creating and inserting one if none
    /// exists yet. Two threads calling this concurrently for the same
    /// endpoint never race each other's construction.
    pub fn get_or_create(&self, endpoint: Endpoint) -> Pool {
        if let Some(pool) = self.pools.get(&endpoint) {
            return pool.clone();
        }

        let options = self.options.clone();
        let connector = (*self.connector).clone();
        let health_checker = (*self.health_checker).clone();
        let handler = self.handler.clone();

        self.pools
            .entry(endpoint)
            .or_insert_with(|| {
                Pool::new(endpoint, options, connector, health_checker, handler)
                    .expect("options were validated in PoolMap::new")
            })
            .clone()
    }

    /// Looks up an already-created pool without creating one.
    pub fn get(&self, endpoint: Endpoint) -> Option<Pool> {
        self.pools.get(&endpoint).map(|entry| entry.clone())
    }

    /// Removes and closes the pool for `endpoint`, if one exists.
    pub async fn remove(&self, endpoint: Endpoint) {
        if let Some((_, pool)) = self.pools.remove(&endpoint) {
            let _ = pool.close_async().await;
        }
    }

    /// Closes and removes every pool whose `last_active_time` is older than
    /// `idle_threshold`, has no connections currently acquired, and has
    /// nothing queued — i.e. pools that are genuinely idle, not merely quiet.
    pub async fn sweep(&self, idle_threshold: Duration) {
        let now = Instant::now();
        let stale: Vec<Endpoint> = self
            .pools
            .iter()
            .filter(|entry| {
                let pool = entry.value();
                pool.acquired_count() == 0
                    && now.saturating_duration_since(pool.last_active_time()) >= idle_threshold
            })
            .map(|entry| *entry.key())
            .collect();

        for endpoint in stale {
            self.remove(endpoint).await;
        }
    }

    /// The number of distinct endpoints currently tracked.
    pub fn len(&self) -> usize {
        self.pools.len()
    }

    /// Whether the map currently tracks no pools.
    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}
