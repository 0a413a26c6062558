//! Configuration for the dashboard pipeline

use crate::api::krx::KRX_LISTING_URL;
use crate::error::{Result, StockError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for listing lookup, price fetching and export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// URL of the KRX corp list download
    pub listing_url: String,

    /// How long a fetched listing stays fresh
    pub listing_ttl: Duration,

    /// How long fetched price history is reused
    pub price_cache_ttl: Duration,

    /// Request timeout duration
    pub request_timeout: Duration,

    /// Maximum outbound price requests per second
    pub provider_requests_per_second: u32,

    /// Provider symbol suffixes tried in order (`.KS` = KOSPI, `.KQ` = KOSDAQ)
    pub market_suffixes: Vec<String>,

    /// Worksheet name of the xlsx export
    pub sheet_name: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            listing_url: KRX_LISTING_URL.to_string(),
            listing_ttl: Duration::from_secs(3600),      // 1 hour
            price_cache_ttl: Duration::from_secs(300),   // 5 minutes
            request_timeout: Duration::from_secs(30),
            provider_requests_per_second: 5,
            market_suffixes: vec![".KS".to_string(), ".KQ".to_string()],
            sheet_name: "Stock_Data".to_string(),
        }
    }
}

impl DashboardConfig {
    /// Create a new configuration builder
    pub fn builder() -> DashboardConfigBuilder {
        DashboardConfigBuilder::default()
    }

    /// Defaults overridden by `DASHBOARD_LISTING_URL`,
    /// `DASHBOARD_LISTING_TTL_SECS` and `DASHBOARD_PRICE_CACHE_TTL_SECS`
    pub fn from_env() -> Result<Self> {
        Self::builder().with_env().build()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.listing_url.trim().is_empty() {
            return Err(StockError::ConfigError("listing_url must not be empty".to_string()));
        }

        if self.listing_ttl.is_zero() || self.price_cache_ttl.is_zero() {
            return Err(StockError::ConfigError(
                "cache TTLs must be greater than 0".to_string(),
            ));
        }

        if self.provider_requests_per_second == 0 {
            return Err(StockError::ConfigError(
                "provider_requests_per_second must be greater than 0".to_string(),
            ));
        }

        if self.market_suffixes.is_empty() {
            return Err(StockError::ConfigError(
                "at least one market suffix is required".to_string(),
            ));
        }

        if self.sheet_name.trim().is_empty() {
            return Err(StockError::ConfigError("sheet_name must not be empty".to_string()));
        }

        Ok(())
    }
}

/// Builder for DashboardConfig
#[derive(Debug, Default)]
pub struct DashboardConfigBuilder {
    listing_url: Option<String>,
    listing_ttl: Option<Duration>,
    price_cache_ttl: Option<Duration>,
    request_timeout: Option<Duration>,
    provider_requests_per_second: Option<u32>,
    market_suffixes: Option<Vec<String>>,
    sheet_name: Option<String>,
    env_error: Option<String>,
}

impl DashboardConfigBuilder {
    /// Set the listing URL
    pub fn listing_url(mut self, url: impl Into<String>) -> Self {
        self.listing_url = Some(url.into());
        self
    }

    /// Set the listing TTL
    pub fn listing_ttl(mut self, duration: Duration) -> Self {
        self.listing_ttl = Some(duration);
        self
    }

    /// Set the price cache TTL
    pub fn price_cache_ttl(mut self, duration: Duration) -> Self {
        self.price_cache_ttl = Some(duration);
        self
    }

    /// Set request timeout
    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = Some(duration);
        self
    }

    /// Set the outbound price request rate
    pub fn provider_requests_per_second(mut self, rate: u32) -> Self {
        self.provider_requests_per_second = Some(rate);
        self
    }

    /// Set the provider symbol suffixes
    pub fn market_suffixes<I, S>(mut self, suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.market_suffixes = Some(suffixes.into_iter().map(Into::into).collect());
        self
    }

    /// Set the export sheet name
    pub fn sheet_name(mut self, name: impl Into<String>) -> Self {
        self.sheet_name = Some(name.into());
        self
    }

    /// Load overrides from the environment
    pub fn with_env(self) -> Self {
        self.with_lookup(|key| std::env::var(key).ok())
    }

    fn with_lookup(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup("DASHBOARD_LISTING_URL") {
            self.listing_url = Some(url);
        }

        for (key, slot) in [
            ("DASHBOARD_LISTING_TTL_SECS", &mut self.listing_ttl),
            ("DASHBOARD_PRICE_CACHE_TTL_SECS", &mut self.price_cache_ttl),
        ] {
            if let Some(raw) = lookup(key) {
                match raw.trim().parse::<u64>() {
                    Ok(secs) => *slot = Some(Duration::from_secs(secs)),
                    Err(_) => self.env_error = Some(format!("{key} is not a number: {raw}")),
                }
            }
        }

        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<DashboardConfig> {
        if let Some(err) = self.env_error {
            return Err(StockError::ConfigError(err));
        }

        let defaults = DashboardConfig::default();

        let config = DashboardConfig {
            listing_url: self.listing_url.unwrap_or(defaults.listing_url),
            listing_ttl: self.listing_ttl.unwrap_or(defaults.listing_ttl),
            price_cache_ttl: self.price_cache_ttl.unwrap_or(defaults.price_cache_ttl),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            provider_requests_per_second: self
                .provider_requests_per_second
                .unwrap_or(defaults.provider_requests_per_second),
            market_suffixes: self.market_suffixes.unwrap_or(defaults.market_suffixes),
            sheet_name: self.sheet_name.unwrap_or(defaults.sheet_name),
        };

        config.validate()?;
        Ok(config)
    }
}
