//! KRX KIND corp list client
//!
//! The KRX disclosure site (KIND) offers the full list of listed companies as
//! a "download" that is really an EUC-KR encoded HTML table. Only the company
//! name (`회사명`) and ticker code (`종목코드`) columns are used.

use async_trait::async_trait;
use encoding_rs::EUC_KR;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::time::{Duration, Instant};

use crate::config::DashboardConfig;
use crate::error::{Result, StockError};
use crate::listing::{Listing, ListingEntry, ListingSource};
use crate::types::TickerCode;

/// Default KIND corp list download
pub const KRX_LISTING_URL: &str =
    "http://kind.krx.co.kr/corpgeneral/corpList.do?method=download&searchType=13";

const NAME_HEADER: &str = "회사명";
const CODE_HEADER: &str = "종목코드";

/// Client for the KIND corp list download
pub struct KrxListingClient {
    client: Client,
    url: String,
}

impl KrxListingClient {
    /// Create a client for `url` with a request timeout
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Create a client from the dashboard configuration
    pub fn from_config(config: &DashboardConfig) -> Result<Self> {
        Self::new(config.listing_url.clone(), config.request_timeout)
    }
}

#[async_trait]
impl ListingSource for KrxListingClient {
    async fn fetch_listing(&self) -> Result<Listing> {
        let started = Instant::now();

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| StockError::ListingUnavailable(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(StockError::ListingUnavailable(format!(
                "listing page returned {}",
                response.status()
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| StockError::ListingUnavailable(format!("failed to read body: {e}")))?;

        let (text, _, had_errors) = EUC_KR.decode(&body);
        if had_errors {
            tracing::warn!("Listing page contained bytes that are not valid EUC-KR");
        }

        let listing = parse_listing_html(&text)?;
        tracing::info!(
            entries = listing.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Fetched company listing"
        );
        Ok(listing)
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| StockError::ListingParse(format!("bad selector {css}: {e:?}")))
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}

/// Parse the listing table out of the (already decoded) page.
///
/// The first row carrying the name and code headers defines the columns;
/// rows with an empty name or an unusable code are skipped.
pub fn parse_listing_html(html: &str) -> Result<Listing> {
    let document = Html::parse_document(html);
    let table_sel = selector("table")?;
    let row_sel = selector("tr")?;
    let cell_sel = selector("th, td")?;

    let table = document
        .select(&table_sel)
        .next()
        .ok_or_else(|| StockError::ListingParse("no table in listing page".to_string()))?;

    let mut columns: Option<(usize, usize)> = None;
    let mut entries = Vec::new();
    let mut skipped = 0usize;

    for row in table.select(&row_sel) {
        let cells: Vec<String> = row.select(&cell_sel).map(cell_text).collect();

        let Some((name_idx, code_idx)) = columns else {
            let name_idx = cells.iter().position(|c| c == NAME_HEADER);
            let code_idx = cells.iter().position(|c| c == CODE_HEADER);
            if let (Some(name_idx), Some(code_idx)) = (name_idx, code_idx) {
                columns = Some((name_idx, code_idx));
            }
            continue;
        };

        let name = cells.get(name_idx).map(String::as_str).unwrap_or_default();
        let code = cells
            .get(code_idx)
            .and_then(|cell| TickerCode::from_listing_cell(cell));

        match code {
            Some(code) if !name.is_empty() => entries.push(ListingEntry::new(name, code)),
            _ => skipped += 1,
        }
    }

    if columns.is_none() {
        return Err(StockError::ListingParse(format!(
            "listing table has no {NAME_HEADER}/{CODE_HEADER} header"
        )));
    }

    if skipped > 0 {
        tracing::debug!(skipped, "Skipped listing rows without a name or code");
    }

    Ok(Listing::new(entries))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        <html><head><meta http-equiv="Content-Type" content="text/html; charset=EUC-KR"></head>
        <body><table border="1">
          <tr><th>회사명</th><th>시장구분</th><th>종목코드</th><th>업종</th></tr>
          <tr><td>삼성전자</td><td>유가</td><td>5930</td><td>통신 및 방송 장비 제조업</td></tr>
          <tr><td>SK하이닉스</td><td>유가</td><td>660</td><td>반도체 제조업</td></tr>
          <tr><td>LG</td><td>유가</td><td>003550</td><td>기타 금융업</td></tr>
          <tr><td></td><td>유가</td><td>123456</td><td>-</td></tr>
          <tr><td>코드없음</td><td>코스닥</td><td></td><td>-</td></tr>
        </table></body></html>
    "#;

    #[test]
    fn test_parse_listing_pads_codes() {
        let listing = parse_listing_html(SAMPLE).unwrap();
        assert_eq!(listing.len(), 3);
        assert_eq!(listing.find_code("삼성전자").unwrap().as_str(), "005930");
        assert_eq!(listing.find_code("SK하이닉스").unwrap().as_str(), "000660");
        assert_eq!(listing.find_code("LG").unwrap().as_str(), "003550");
    }

    #[test]
    fn test_parse_listing_missing_header() {
        let html = "<table><tr><th>이름</th><th>코드</th></tr><tr><td>a</td><td>1</td></tr></table>";
        let err = parse_listing_html(html).unwrap_err();
        assert!(matches!(err, StockError::ListingParse(_)));
    }

    #[test]
    fn test_parse_listing_no_table() {
        let err = parse_listing_html("<html><body><p>점검 중</p></body></html>").unwrap_err();
        assert!(matches!(err, StockError::ListingParse(_)));
    }

    #[test]
    fn test_euc_kr_round_trip() {
        let (bytes, _, _) = EUC_KR.encode(SAMPLE);
        let (text, _, had_errors) = EUC_KR.decode(&bytes);
        assert!(!had_errors);
        assert_eq!(parse_listing_html(&text).unwrap().len(), 3);
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_fetch_krx_listing() {
        let client = KrxListingClient::new(KRX_LISTING_URL, Duration::from_secs(30)).unwrap();
        let listing = client.fetch_listing().await.unwrap();
        assert!(listing.len() > 1000);
        assert_eq!(listing.find_code("삼성전자").unwrap().as_str(), "005930");
    }
}
