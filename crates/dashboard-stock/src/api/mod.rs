//! Clients for the listing page and the price provider

pub mod krx;
pub mod yahoo;

pub use krx::{KRX_LISTING_URL, KrxListingClient, parse_listing_html};
pub use yahoo::YahooPriceClient;
