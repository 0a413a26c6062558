//! Company listing types and the listing source seam

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;
use crate::types::TickerCode;

/// A (display name, ticker code) pair from the listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingEntry {
    pub name: String,
    pub code: TickerCode,
}

impl ListingEntry {
    pub fn new(name: impl Into<String>, code: TickerCode) -> Self {
        Self {
            name: name.into(),
            code,
        }
    }
}

/// All listed companies in page order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Listing {
    entries: Vec<ListingEntry>,
}

impl Listing {
    pub fn new(entries: Vec<ListingEntry>) -> Self {
        Self { entries }
    }

    /// An empty listing, used when the page could not be loaded
    pub fn empty() -> Self {
        Self::default()
    }

    /// Code of the first entry whose name equals `name` exactly
    pub fn find_code(&self, name: &str) -> Option<&TickerCode> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| &entry.code)
    }

    pub fn entries(&self) -> &[ListingEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Source of the company listing
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Fetch the complete listing
    async fn fetch_listing(&self) -> Result<Listing>;
}
