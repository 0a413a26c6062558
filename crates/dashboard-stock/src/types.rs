//! Core value types shared across the pipeline

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, StockError};

/// Width of a KRX ticker code
pub const CODE_WIDTH: usize = 6;

const KST_OFFSET_SECS: i32 = 9 * 3600;

/// Korea Standard Time (UTC+09:00), the calendar the exchange trades in
pub fn kst() -> FixedOffset {
    FixedOffset::east_opt(KST_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// A fixed-width KRX ticker code such as `005930`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TickerCode(String);

impl TickerCode {
    /// Interpret a user token as a literal code.
    ///
    /// Only tokens of exactly six ASCII digits qualify; they are returned unchanged.
    pub fn parse_literal(token: &str) -> Option<Self> {
        if token.len() == CODE_WIDTH && token.bytes().all(|b| b.is_ascii_digit()) {
            Some(Self(token.to_string()))
        } else {
            None
        }
    }

    /// Normalize a code cell read from the listing page.
    ///
    /// The page drops leading zeros (`5930`), so shorter codes are left-padded
    /// with zeros. Newer listings may carry letters (`0088M0`), which are kept.
    pub fn from_listing_cell(cell: &str) -> Option<Self> {
        let raw = cell.trim();
        if raw.is_empty()
            || raw.len() > CODE_WIDTH
            || !raw.bytes().all(|b| b.is_ascii_alphanumeric())
        {
            return None;
        }
        Some(Self(format!("{raw:0>width$}", width = CODE_WIDTH)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TickerCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Inclusive calendar date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Create a range, rejecting `start > end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(StockError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// One daily bar as returned by the price provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: DateTime<FixedOffset>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    /// Fractional change of close against the previous bar
    pub change: Option<f64>,
}

/// A price bar tagged with the company label it was requested under
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub company: String,
    #[serde(flatten)]
    pub bar: PriceBar,
}

/// Concatenated price records from every resolved company of one query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombinedTable {
    records: Vec<PriceRecord>,
}

impl CombinedTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one company's bars, labelling each with `company`
    pub fn append_company(&mut self, company: &str, bars: Vec<PriceBar>) {
        self.records.extend(bars.into_iter().map(|bar| PriceRecord {
            company: company.to_string(),
            bar,
        }));
    }

    pub fn records(&self) -> &[PriceRecord] {
        &self.records
    }

    /// Company labels in first-appearance order
    pub fn companies(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for record in &self.records {
            if !seen.contains(&record.company.as_str()) {
                seen.push(&record.company);
            }
        }
        seen
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
