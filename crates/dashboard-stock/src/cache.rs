//! Caching layer: the time-limited company listing and reused price history

use cached::{Cached, TimedCache};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

use crate::error::Result;
use crate::listing::{Listing, ListingSource};
use crate::types::{DateRange, PriceBar, TickerCode};

/// A listing together with the moment it was fetched
#[derive(Debug, Clone)]
pub struct CachedListing {
    pub listing: Arc<Listing>,
    pub fetched_at: DateTime<Utc>,
}

impl CachedListing {
    /// Whether `ttl` has elapsed since the fetch.
    ///
    /// A `now` earlier than `fetched_at` counts as fresh.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        (now - self.fetched_at)
            .to_std()
            .is_ok_and(|age| age >= ttl)
    }
}

/// Explicit, process-wide cache of the company listing.
///
/// Refreshes are single-flight: callers that find the listing stale queue on
/// `refresh_guard` and re-check freshness once they hold it, so one expiry
/// triggers one fetch. Failed fetches leave the previous state untouched.
pub struct ListingCache {
    source: Arc<dyn ListingSource>,
    ttl: Duration,
    state: RwLock<Option<CachedListing>>,
    refresh_guard: Mutex<()>,
}

impl ListingCache {
    pub fn new(source: Arc<dyn ListingSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            state: RwLock::new(None),
            refresh_guard: Mutex::new(()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Current listing, fetching it when missing or expired
    pub async fn get(&self) -> Result<Arc<Listing>> {
        self.get_at(Utc::now()).await
    }

    /// Same as [`get`](Self::get) with an explicit clock reading
    pub async fn get_at(&self, now: DateTime<Utc>) -> Result<Arc<Listing>> {
        if let Some(listing) = self.fresh(now).await {
            tracing::debug!("Listing cache hit");
            return Ok(listing);
        }

        let _guard = self.refresh_guard.lock().await;

        // Another caller may have refreshed while we waited
        if let Some(listing) = self.fresh(now).await {
            tracing::debug!("Listing refreshed by a concurrent caller");
            return Ok(listing);
        }

        tracing::debug!("Listing cache miss");
        self.refresh_locked(now).await
    }

    /// The cached entry, fresh or not
    pub async fn snapshot(&self) -> Option<CachedListing> {
        self.state.read().await.clone()
    }

    async fn fresh(&self, now: DateTime<Utc>) -> Option<Arc<Listing>> {
        self.state
            .read()
            .await
            .as_ref()
            .filter(|cached| !cached.is_expired(now, self.ttl))
            .map(|cached| Arc::clone(&cached.listing))
    }

    async fn refresh_locked(&self, now: DateTime<Utc>) -> Result<Arc<Listing>> {
        let listing = match self.source.fetch_listing().await {
            Ok(listing) => Arc::new(listing),
            Err(e) => {
                tracing::warn!(error = %e, "Listing refresh failed");
                return Err(e);
            }
        };

        tracing::info!(entries = listing.len(), "Listing cache refreshed");
        *self.state.write().await = Some(CachedListing {
            listing: Arc::clone(&listing),
            fetched_at: now,
        });
        Ok(listing)
    }
}

/// Cache key for price history requests
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PriceKey {
    pub code: TickerCode,
    pub range: DateRange,
}

impl PriceKey {
    pub fn new(code: &TickerCode, range: DateRange) -> Self {
        Self {
            code: code.clone(),
            range,
        }
    }
}

/// Price history per code and range, kept for a fixed lifespan.
///
/// Only successful fetches are stored, so a provider failure is retried by
/// the next query.
pub struct PriceCache {
    entries: RwLock<TimedCache<PriceKey, Vec<PriceBar>>>,
}

impl PriceCache {
    pub fn new(lifespan: Duration) -> Self {
        Self {
            entries: RwLock::new(TimedCache::with_lifespan(lifespan)),
        }
    }

    /// Stored bars for `key`, or the result of `fetch` (stored when it succeeds)
    pub async fn get_or_fetch<F, Fut>(&self, key: PriceKey, fetch: F) -> Result<Vec<PriceBar>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<Vec<PriceBar>>>,
    {
        // `cache_get` updates hit statistics, hence the write lock
        if let Some(bars) = self.entries.write().await.cache_get(&key).cloned() {
            tracing::debug!(code = %key.code, "Price cache hit");
            return Ok(bars);
        }

        tracing::debug!(code = %key.code, "Price cache miss");
        let bars = fetch().await?;
        self.entries.write().await.cache_set(key, bars.clone());
        Ok(bars)
    }

    /// Number of stored entries, expired ones included until they are evicted
    pub async fn len(&self) -> usize {
        self.entries.read().await.cache_size()
    }
}
