//! Query aggregation: resolve every token, fetch its history and combine
//!
//! Recoverable conditions never surface as errors here. A listing that cannot
//! be loaded and tokens that do not resolve are reported as [`QueryNotice`]s,
//! empty input and empty results as [`QueryOutcome`] variants. Only a failing
//! price fetch aborts the query.

use serde::Serialize;
use std::sync::Arc;

use crate::cache::ListingCache;
use crate::error::Result;
use crate::fetcher::PriceSource;
use crate::listing::Listing;
use crate::resolver::{needs_listing, resolve_code, split_tokens};
use crate::types::{CombinedTable, DateRange};

/// One user query
#[derive(Debug, Clone)]
pub struct QueryRequest {
    /// Comma-separated company names and/or six-digit codes
    pub companies: String,
    pub range: DateRange,
}

impl QueryRequest {
    pub fn new(companies: impl Into<String>, range: DateRange) -> Self {
        Self {
            companies: companies.into(),
            range,
        }
    }
}

/// Recoverable problem met while running a query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryNotice {
    /// The listing could not be loaded; name lookups ran against an empty listing
    ListingUnavailable { reason: String },
    /// The token is neither a code nor a listed company name
    CompanyNotFound { token: String },
}

/// Result of a query that did not fail outright
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QueryOutcome {
    /// No tokens were given
    EmptyInput,
    /// Tokens were processed but none produced rows
    NoData { notices: Vec<QueryNotice> },
    /// At least one company produced rows
    Data {
        table: CombinedTable,
        notices: Vec<QueryNotice>,
    },
}

impl QueryOutcome {
    pub fn notices(&self) -> &[QueryNotice] {
        match self {
            QueryOutcome::EmptyInput => &[],
            QueryOutcome::NoData { notices } | QueryOutcome::Data { notices, .. } => notices,
        }
    }

    pub fn table(&self) -> Option<&CombinedTable> {
        match self {
            QueryOutcome::Data { table, .. } => Some(table),
            _ => None,
        }
    }
}

/// Runs queries against the listing cache and a price source
pub struct Aggregator {
    listing: Arc<ListingCache>,
    prices: Arc<dyn PriceSource>,
}

impl Aggregator {
    pub fn new(listing: Arc<ListingCache>, prices: Arc<dyn PriceSource>) -> Self {
        Self { listing, prices }
    }

    /// Run one query.
    ///
    /// Tokens are processed in input order; each resolved company's rows are
    /// appended under the token it was typed as.
    #[tracing::instrument(skip(self, request), fields(companies = %request.companies))]
    pub async fn run(&self, request: &QueryRequest) -> Result<QueryOutcome> {
        let tokens = split_tokens(&request.companies);
        if tokens.is_empty() {
            tracing::debug!("Empty query input");
            return Ok(QueryOutcome::EmptyInput);
        }

        let mut notices = Vec::new();
        let mut listing: Option<Arc<Listing>> = None;
        let mut table = CombinedTable::new();

        for token in tokens {
            if needs_listing(token) && listing.is_none() {
                listing = Some(self.load_listing(&mut notices).await);
            }
            let code = match &listing {
                Some(listing) => resolve_code(token, listing),
                None => resolve_code(token, &Listing::empty()),
            };

            let Some(code) = code else {
                tracing::info!(token, "Company not found");
                notices.push(QueryNotice::CompanyNotFound {
                    token: token.to_string(),
                });
                continue;
            };

            let bars = self.prices.fetch_history(&code, request.range).await?;
            tracing::debug!(token, %code, bars = bars.len(), "Fetched company history");
            if !bars.is_empty() {
                table.append_company(token, bars);
            }
        }

        if table.is_empty() {
            return Ok(QueryOutcome::NoData { notices });
        }

        tracing::info!(rows = table.len(), "Query complete");
        Ok(QueryOutcome::Data { table, notices })
    }

    async fn load_listing(&self, notices: &mut Vec<QueryNotice>) -> Arc<Listing> {
        match self.listing.get().await {
            Ok(listing) => listing,
            Err(e) => {
                notices.push(QueryNotice::ListingUnavailable {
                    reason: e.to_string(),
                });
                Arc::new(Listing::empty())
            }
        }
    }
}
