//! Assembled dashboard service: listing cache, cached price source and aggregator

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::aggregator::{Aggregator, QueryOutcome, QueryRequest};
use crate::api::{KrxListingClient, YahooPriceClient};
use crate::cache::ListingCache;
use crate::config::DashboardConfig;
use crate::error::Result;
use crate::fetcher::{CachedPriceSource, PriceSource};
use crate::listing::ListingSource;

/// State of the listing cache, for health reporting
#[derive(Debug, Clone, Serialize)]
pub struct ListingStatus {
    pub loaded: bool,
    pub entries: usize,
    pub fetched_at: Option<DateTime<Utc>>,
    pub expired: bool,
}

/// Shared entry point used by the web server and the terminal command
pub struct StockDashboard {
    config: Arc<DashboardConfig>,
    listing: Arc<ListingCache>,
    aggregator: Aggregator,
}

impl StockDashboard {
    /// Build the service against KRX and Yahoo Finance
    pub fn from_config(config: DashboardConfig) -> Result<Self> {
        config.validate()?;

        let listing_source = KrxListingClient::from_config(&config)?;
        let prices = CachedPriceSource::new(
            YahooPriceClient::from_config(&config)?,
            config.price_cache_ttl,
        );

        tracing::info!(
            listing_url = %config.listing_url,
            listing_ttl_secs = config.listing_ttl.as_secs(),
            price_cache_ttl_secs = config.price_cache_ttl.as_secs(),
            "Stock dashboard initialized"
        );

        Ok(Self::with_sources(config, Arc::new(listing_source), Arc::new(prices)))
    }

    /// Build the service from explicit sources
    pub fn with_sources(
        config: DashboardConfig,
        listing_source: Arc<dyn ListingSource>,
        prices: Arc<dyn PriceSource>,
    ) -> Self {
        let listing = Arc::new(ListingCache::new(listing_source, config.listing_ttl));
        let aggregator = Aggregator::new(Arc::clone(&listing), prices);

        Self {
            config: Arc::new(config),
            listing,
            aggregator,
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub async fn query(&self, request: &QueryRequest) -> Result<QueryOutcome> {
        self.aggregator.run(request).await
    }

    pub async fn listing_status(&self) -> ListingStatus {
        match self.listing.snapshot().await {
            Some(cached) => ListingStatus {
                loaded: true,
                entries: cached.listing.len(),
                fetched_at: Some(cached.fetched_at),
                expired: cached.is_expired(Utc::now(), self.listing.ttl()),
            },
            None => ListingStatus {
                loaded: false,
                entries: 0,
                fetched_at: None,
                expired: false,
            },
        }
    }
}
