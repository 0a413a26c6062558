//! Price history source seam and its caching wrapper

use async_trait::async_trait;
use std::time::Duration;

use crate::cache::{PriceCache, PriceKey};
use crate::error::Result;
use crate::types::{DateRange, PriceBar, TickerCode};

/// Source of daily price history
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Daily bars for `code` within `range`, ascending by time.
    ///
    /// An empty vector means the provider knows the code but has no bars in range.
    async fn fetch_history(&self, code: &TickerCode, range: DateRange) -> Result<Vec<PriceBar>>;
}

/// Fill `change` as the fractional move of close against the previous bar
pub fn with_changes(bars: &mut [PriceBar]) {
    let mut previous_close: Option<f64> = None;
    for bar in bars.iter_mut() {
        bar.change = previous_close
            .filter(|prev| *prev != 0.0)
            .map(|prev| bar.close / prev - 1.0);
        previous_close = Some(bar.close);
    }
}

/// Wraps a [`PriceSource`] and reuses its answers for a while
pub struct CachedPriceSource<S> {
    inner: S,
    cache: PriceCache,
}

impl<S: PriceSource> CachedPriceSource<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            cache: PriceCache::new(ttl),
        }
    }

    pub fn cache(&self) -> &PriceCache {
        &self.cache
    }
}

#[async_trait]
impl<S: PriceSource> PriceSource for CachedPriceSource<S> {
    async fn fetch_history(&self, code: &TickerCode, range: DateRange) -> Result<Vec<PriceBar>> {
        self.cache
            .get_or_fetch(PriceKey::new(code, range), || self.inner.fetch_history(code, range))
            .await
    }
}
