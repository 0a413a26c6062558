//! Yahoo Finance price history client for KRX codes
//!
//! Yahoo lists KOSPI shares as `<code>.KS` and KOSDAQ shares as `<code>.KQ`.
//! The listing does not say which market a code trades on, so the configured
//! suffixes are tried in order.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::future::Future;
use std::num::NonZeroU32;
use std::sync::Arc;
use time::OffsetDateTime;
use yahoo_finance_api as yahoo;

use crate::config::DashboardConfig;
use crate::error::{Result, StockError};
use crate::fetcher::{PriceSource, with_changes};
use crate::types::{DateRange, PriceBar, TickerCode, kst};

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Raw provider row before conversion
#[derive(Debug, Clone, Copy)]
struct RawBar {
    timestamp: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: u64,
}

/// Yahoo Finance price history client
pub struct YahooPriceClient {
    connector: yahoo::YahooConnector,
    suffixes: Vec<String>,
    rate_limiter: SharedRateLimiter,
}

impl YahooPriceClient {
    /// Create a client trying `suffixes` in order, limited to
    /// `requests_per_second` outbound calls
    pub fn new(suffixes: Vec<String>, requests_per_second: u32) -> Result<Self> {
        let rate = NonZeroU32::new(requests_per_second).ok_or_else(|| {
            StockError::ConfigError("requests_per_second must be greater than 0".to_string())
        })?;
        let connector = yahoo::YahooConnector::new()
            .map_err(|e| StockError::Other(format!("Failed to create Yahoo connector: {e}")))?;

        Ok(Self {
            connector,
            suffixes,
            rate_limiter: Arc::new(RateLimiter::direct(Quota::per_second(rate))),
        })
    }

    /// Create a client from the dashboard configuration
    pub fn from_config(config: &DashboardConfig) -> Result<Self> {
        Self::new(config.market_suffixes.clone(), config.provider_requests_per_second)
    }

    /// Provider symbols tried for `code`, in order
    pub fn provider_symbols(&self, code: &TickerCode) -> Vec<String> {
        self.suffixes
            .iter()
            .map(|suffix| format!("{code}{suffix}"))
            .collect()
    }

    async fn history_for_symbol(&self, symbol: &str, range: DateRange) -> Result<Vec<PriceBar>> {
        let (start, end) = request_window(range)?;
        self.rate_limiter.until_ready().await;

        let quotes = self
            .connector
            .get_quote_history(symbol, start, end)
            .await
            .and_then(|response| response.quotes());
        let quotes = match quotes {
            Ok(quotes) => quotes,
            Err(e) if is_no_data(&e) => {
                tracing::debug!(%symbol, error = %e, "Provider has no bars in window");
                return Ok(Vec::new());
            }
            Err(e) => return Err(StockError::Other(e.to_string())),
        };

        let raw = quotes
            .iter()
            .map(|q| RawBar {
                timestamp: q.timestamp as i64,
                open: q.open,
                high: q.high,
                low: q.low,
                close: q.close,
                volume: q.volume,
            })
            .collect();

        Ok(into_bars(raw, range))
    }
}

#[async_trait]
impl PriceSource for YahooPriceClient {
    async fn fetch_history(&self, code: &TickerCode, range: DateRange) -> Result<Vec<PriceBar>> {
        first_with_bars(code, self.provider_symbols(code), |symbol| async move {
            self.history_for_symbol(&symbol, range).await
        })
        .await
    }
}

/// Errors meaning the symbol exists but has nothing in the window
fn is_no_data(error: &yahoo::YahooError) -> bool {
    matches!(
        error,
        yahoo::YahooError::EmptyDataSet | yahoo::YahooError::NoQuotes | yahoo::YahooError::NoResult
    )
}

/// Try `symbols` in order.
///
/// The first symbol with bars wins. When none has bars but at least one
/// answered, the result is empty; when every symbol failed the last error
/// becomes a [`StockError::ProviderError`].
async fn first_with_bars<F, Fut>(
    code: &TickerCode,
    symbols: Vec<String>,
    mut fetch: F,
) -> Result<Vec<PriceBar>>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<Vec<PriceBar>>>,
{
    let mut saw_empty = false;
    let mut last_error = None;

    for symbol in symbols {
        match fetch(symbol.clone()).await {
            Ok(bars) if !bars.is_empty() => {
                tracing::debug!(%symbol, bars = bars.len(), "Fetched price history");
                return Ok(bars);
            }
            Ok(_) => {
                tracing::debug!(%symbol, "No bars in range, trying next market");
                saw_empty = true;
            }
            Err(e) => {
                tracing::debug!(%symbol, error = %e, "Provider lookup failed, trying next market");
                last_error = Some(e);
            }
        }
    }

    if saw_empty {
        return Ok(Vec::new());
    }

    Err(StockError::ProviderError {
        code: code.to_string(),
        reason: last_error.map_or_else(|| "no provider symbols".to_string(), |e| e.to_string()),
    })
}

fn kst_midnight(date: NaiveDate) -> Result<OffsetDateTime> {
    let local = kst()
        .from_local_datetime(&date.and_time(NaiveTime::MIN))
        .single()
        .ok_or_else(|| StockError::Other(format!("Invalid date: {date}")))?;

    OffsetDateTime::from_unix_timestamp(local.timestamp())
        .map_err(|e| StockError::Other(format!("Invalid timestamp for {date}: {e}")))
}

/// `[start 00:00 KST, end + 1 day 00:00 KST)`
fn request_window(range: DateRange) -> Result<(OffsetDateTime, OffsetDateTime)> {
    let after_end = range
        .end()
        .succ_opt()
        .ok_or_else(|| StockError::Other(format!("Invalid end date: {}", range.end())))?;

    Ok((kst_midnight(range.start())?, kst_midnight(after_end)?))
}

/// Convert provider rows to KST bars inside `range`, ascending by time
fn into_bars(mut raw: Vec<RawBar>, range: DateRange) -> Vec<PriceBar> {
    raw.sort_by_key(|bar| bar.timestamp);

    let mut bars: Vec<PriceBar> = raw
        .into_iter()
        .filter_map(|bar| {
            let timestamp = DateTime::from_timestamp(bar.timestamp, 0)?.with_timezone(&kst());
            range.contains(timestamp.date_naive()).then_some(PriceBar {
                timestamp,
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
                volume: bar.volume,
                change: None,
            })
        })
        .collect();

    with_changes(&mut bars);
    bars
}
