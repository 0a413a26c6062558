//! Error types for dashboard operations

use chrono::NaiveDate;
use thiserror::Error;

/// Dashboard specific errors
#[derive(Debug, Error)]
pub enum StockError {
    /// The company listing could not be fetched
    #[error("Listing unavailable: {0}")]
    ListingUnavailable(String),

    /// The listing page was fetched but could not be understood
    #[error("Listing parse error: {0}")]
    ListingParse(String),

    /// Price history provider failed for a ticker code
    #[error("Price provider error for {code}: {reason}")]
    ProviderError {
        code: String,
        reason: String,
    },

    /// Start date is after end date
    #[error("Invalid date range: {start} is after {end}")]
    InvalidDateRange {
        start: NaiveDate,
        end: NaiveDate,
    },

    /// Network or HTTP error
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Spreadsheet export error
    #[error("Export error: {0}")]
    ExportError(#[from] rust_xlsxwriter::XlsxError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Result type alias for dashboard operations
pub type Result<T> = std::result::Result<T, StockError>;
