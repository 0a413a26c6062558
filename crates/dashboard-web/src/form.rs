//! Query form parameters shared by the page, export and JSON endpoints

use chrono::{Datelike, NaiveDate, Utc};
use dashboard_stock::{DateRange, QueryRequest, kst};
use serde::Deserialize;
use thiserror::Error;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("날짜 형식이 올바르지 않습니다: '{0}'")]
    InvalidDate(String),

    #[error("시작일({start})이 종료일({end})보다 늦습니다.")]
    StartAfterEnd { start: NaiveDate, end: NaiveDate },
}

/// `?companies=..&start=YYYY-MM-DD&end=YYYY-MM-DD`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryParams {
    pub companies: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

/// Current calendar date in Korea
pub fn today_kst() -> NaiveDate {
    Utc::now().with_timezone(&kst()).date_naive()
}

/// January 1st of the current year through `today`
pub fn default_range(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    (today.with_ordinal(1).unwrap_or(today), today)
}

fn parse_date(value: Option<&str>, default: NaiveDate) -> Result<NaiveDate, FormError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(default),
        Some(v) => NaiveDate::parse_from_str(v, DATE_FORMAT)
            .map_err(|_| FormError::InvalidDate(v.to_string())),
    }
}

impl QueryParams {
    /// Whether the form was submitted, as opposed to a first visit
    pub fn is_submitted(&self) -> bool {
        self.companies.is_some()
    }

    pub fn companies(&self) -> &str {
        self.companies.as_deref().unwrap_or_default()
    }

    /// Start and end dates, defaulting blanks to [`default_range`]
    pub fn dates(&self, today: NaiveDate) -> Result<(NaiveDate, NaiveDate), FormError> {
        let (default_start, default_end) = default_range(today);
        let start = parse_date(self.start.as_deref(), default_start)?;
        let end = parse_date(self.end.as_deref(), default_end)?;
        Ok((start, end))
    }

    pub fn to_request(&self, today: NaiveDate) -> Result<QueryRequest, FormError> {
        let (start, end) = self.dates(today)?;
        let range = DateRange::new(start, end).map_err(|_| FormError::StartAfterEnd { start, end })?;
        Ok(QueryRequest::new(self.companies(), range))
    }
}

/// Query string reproducing `request`, for links to other endpoints
pub fn query_string(request: &QueryRequest) -> String {
    format!(
        "companies={}&start={}&end={}",
        urlencoding::encode(&request.companies),
        request.range.start().format(DATE_FORMAT),
        request.range.end().format(DATE_FORMAT),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn params(companies: Option<&str>, start: Option<&str>, end: Option<&str>) -> QueryParams {
        QueryParams {
            companies: companies.map(str::to_string),
            start: start.map(str::to_string),
            end: end.map(str::to_string),
        }
    }

    #[test]
    fn test_default_range_starts_on_new_year() {
        assert_eq!(
            default_range(date(2025, 6, 15)),
            (date(2025, 1, 1), date(2025, 6, 15))
        );
    }

    #[test]
    fn test_blank_dates_use_defaults() {
        let p = params(Some("삼성전자"), Some(""), None);
        assert_eq!(
            p.dates(date(2025, 6, 15)).unwrap(),
            (date(2025, 1, 1), date(2025, 6, 15))
        );
    }

    #[test]
    fn test_explicit_dates() {
        let request = params(Some("LG"), Some("2024-01-02"), Some("2024-03-29"))
            .to_request(date(2025, 6, 15))
            .unwrap();
        assert_eq!(request.companies, "LG");
        assert_eq!(request.range.start(), date(2024, 1, 2));
        assert_eq!(request.range.end(), date(2024, 3, 29));
    }

    #[test]
    fn test_invalid_date() {
        let err = params(Some("LG"), Some("2024/01/02"), None)
            .to_request(date(2025, 6, 15))
            .unwrap_err();
        assert_eq!(err, FormError::InvalidDate("2024/01/02".to_string()));
    }

    #[test]
    fn test_start_after_end() {
        let err = params(Some("LG"), Some("2024-03-02"), Some("2024-03-01"))
            .to_request(date(2025, 6, 15))
            .unwrap_err();
        assert!(matches!(err, FormError::StartAfterEnd { .. }));
    }

    #[test]
    fn test_first_visit_is_not_submitted() {
        assert!(!QueryParams::default().is_submitted());
        assert!(params(Some(""), None, None).is_submitted());
    }

    #[test]
    fn test_query_string_encodes_companies() {
        let request = params(Some("삼성전자, LG"), Some("2024-01-02"), Some("2024-01-31"))
            .to_request(date(2025, 6, 15))
            .unwrap();
        assert_eq!(
            query_string(&request),
            "companies=%EC%82%BC%EC%84%B1%EC%A0%84%EC%9E%90%2C%20LG&start=2024-01-02&end=2024-01-31"
        );
    }
}
