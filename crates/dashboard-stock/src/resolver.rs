//! Resolve user tokens (company names or literal codes) to ticker codes

use crate::listing::Listing;
use crate::types::TickerCode;

/// Resolve a token against the listing.
///
/// A token of exactly six ASCII digits is returned unchanged without looking
/// at the listing. Anything else must equal a listing name exactly
/// (case-sensitive); the first such entry wins.
pub fn resolve_code(token: &str, listing: &Listing) -> Option<TickerCode> {
    if let Some(code) = TickerCode::parse_literal(token) {
        return Some(code);
    }
    listing.find_code(token).cloned()
}

/// Whether resolving `token` needs the listing at all
pub fn needs_listing(token: &str) -> bool {
    TickerCode::parse_literal(token).is_none()
}

/// Split comma-separated input into trimmed, non-empty tokens
pub fn split_tokens(input: &str) -> Vec<&str> {
    input
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .collect()
}
