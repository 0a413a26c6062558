//! KRX stock price lookup for the dashboard
//!
//! This crate turns a comma-separated list of Korean company names or
//! six-digit codes into a combined daily price table. It includes:
//!
//! - The KRX listed-company listing, fetched from KIND and cached with a TTL
//! - Name/code resolution against the listing
//! - Daily price history from Yahoo Finance (KOSPI `.KS`, then KOSDAQ `.KQ`)
//! - Aggregation into one table labelled by the company as typed
//! - Display shaping (sorted table, closing-price line chart) and xlsx export
//!
//! # Example
//!
//! ```rust,ignore
//! use dashboard_stock::{DashboardConfig, DateRange, QueryRequest, StockDashboard};
//! use chrono::NaiveDate;
//!
//! #[tokio::main]
//! async fn main() -> dashboard_stock::Result<()> {
//!     let dashboard = StockDashboard::from_config(DashboardConfig::from_env()?)?;
//!
//!     let range = DateRange::new(
//!         NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
//!         NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
//!     )?;
//!     let outcome = dashboard.query(&QueryRequest::new("삼성전자, 035720", range)).await?;
//!     println!("{outcome:?}");
//!
//!     Ok(())
//! }
//! ```

pub mod aggregator;
pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod export;
pub mod fetcher;
pub mod listing;
pub mod presenter;
pub mod resolver;
pub mod service;
pub mod types;

pub use aggregator::{Aggregator, QueryNotice, QueryOutcome, QueryRequest};
pub use cache::{CachedListing, ListingCache, PriceCache};
pub use config::DashboardConfig;
pub use error::{Result, StockError};
pub use export::{XLSX_CONTENT_TYPE, export_filename, write_xlsx};
pub use fetcher::{CachedPriceSource, PriceSource};
pub use listing::{Listing, ListingEntry, ListingSource};
pub use presenter::{DisplayRow, DisplayTable, LineChart};
pub use service::{ListingStatus, StockDashboard};
pub use types::{CombinedTable, DateRange, PriceBar, PriceRecord, TickerCode, kst};
