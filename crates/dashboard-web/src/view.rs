//! Page model, number formatting and template rendering

use dashboard_stock::{DisplayRow, DisplayTable, LineChart, QueryOutcome, QueryRequest};
use minijinja::Environment;
use serde::Serialize;

use crate::form::query_string;
use crate::messages::{self, Message};

const DASHBOARD_TEMPLATE: &str = include_str!("../templates/dashboard.html");

/// `1234567.5` -> `"1,234,567.5"`; whole numbers carry no decimals
pub fn format_number(value: f64) -> String {
    // Adding zero turns a negative zero into a positive one
    let rounded = (value * 100.0).round() / 100.0 + 0.0;
    let text = if rounded.fract() == 0.0 {
        format!("{rounded:.0}")
    } else {
        format!("{rounded:.2}")
            .trim_end_matches('0')
            .to_string()
    };

    let (sign, unsigned) = text.strip_prefix('-').map_or(("", text.as_str()), |rest| ("-", rest));
    let (whole, fraction) = unsigned.split_once('.').map_or((unsigned, None), |(w, f)| (w, Some(f)));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match fraction {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

/// Fractional change as a signed percentage, blank when unknown
pub fn format_change(change: Option<f64>) -> String {
    change.map_or_else(String::new, |c| {
        let percent = (c * 10_000.0).round() / 100.0 + 0.0;
        format!("{percent:+.2}%")
    })
}

/// One table row with display strings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowView {
    pub date: String,
    pub company: String,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub volume: String,
    pub change: String,
}

impl From<&DisplayRow> for RowView {
    fn from(row: &DisplayRow) -> Self {
        Self {
            date: row.date.to_string(),
            company: row.company.clone(),
            open: format_number(row.open),
            high: format_number(row.high),
            low: format_number(row.low),
            close: format_number(row.close),
            volume: format_number(row.volume as f64),
            change: format_change(row.change),
        }
    }
}

/// Everything the dashboard template needs
#[derive(Debug, Clone, Default, Serialize)]
pub struct PageView {
    pub title: String,
    pub companies: String,
    pub start: String,
    pub end: String,
    pub messages: Vec<Message>,
    pub columns: Vec<&'static str>,
    pub rows: Vec<RowView>,
    pub chart_json: Option<String>,
    pub download_url: Option<String>,
}

impl PageView {
    pub fn new(title: impl Into<String>, companies: &str, start: &str, end: &str) -> Self {
        Self {
            title: title.into(),
            companies: companies.to_string(),
            start: start.to_string(),
            end: end.to_string(),
            columns: dashboard_stock::presenter::DISPLAY_COLUMNS.to_vec(),
            ..Self::default()
        }
    }

    pub fn push_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Fill messages, table, chart and download link from a finished query
    pub fn show_outcome(&mut self, request: &QueryRequest, outcome: &QueryOutcome) {
        self.messages.extend(messages::for_outcome(outcome));

        let Some(table) = outcome.table() else {
            return;
        };

        let display = DisplayTable::from_combined(table);
        self.rows = display.rows().iter().map(RowView::from).collect();

        match LineChart::from_combined(table).to_script_json() {
            Ok(json) => self.chart_json = Some(json),
            Err(e) => tracing::warn!(error = %e, "Failed to serialize chart"),
        }

        self.download_url = Some(format!("/export?{}", query_string(request)));
    }
}

/// Renders [`PageView`]s with the embedded dashboard template
pub struct PageRenderer {
    env: Environment<'static>,
}

impl PageRenderer {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template("dashboard.html", DASHBOARD_TEMPLATE)?;
        Ok(Self { env })
    }

    pub fn render(&self, page: &PageView) -> Result<String, minijinja::Error> {
        self.env.get_template("dashboard.html")?.render(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use dashboard_stock::{CombinedTable, DateRange, PriceBar, QueryNotice, kst};

    fn request() -> QueryRequest {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
        )
        .unwrap();
        QueryRequest::new("삼성전자", range)
    }

    fn data_outcome() -> QueryOutcome {
        let bar = PriceBar {
            timestamp: kst().with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap(),
            open: 78_200.0,
            high: 79_800.0,
            low: 78_200.0,
            close: 79_600.0,
            volume: 17_142_847,
            change: Some(0.0102),
        };
        let mut table = CombinedTable::new();
        table.append_company("삼성전자", vec![bar]);
        QueryOutcome::Data {
            table,
            notices: vec![QueryNotice::CompanyNotFound {
                token: "<b>없음</b>".to_string(),
            }],
        }
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(999.0), "999");
        assert_eq!(format_number(79_600.0), "79,600");
        assert_eq!(format_number(17_142_847.0), "17,142,847");
        assert_eq!(format_number(1234.5), "1,234.5");
        assert_eq!(format_number(-1234.567), "-1,234.57");
        assert_eq!(format_number(-0.001), "0");
        assert_eq!(format_number(-0.0), "0");
    }

    #[test]
    fn test_format_change() {
        assert_eq!(format_change(None), "");
        assert_eq!(format_change(Some(0.0102)), "+1.02%");
        assert_eq!(format_change(Some(-0.05)), "-5.00%");
        assert_eq!(format_change(Some(-0.000_01)), "+0.00%");
    }

    #[test]
    fn test_show_outcome_fills_page() {
        let mut page = PageView::new("stock-dashboard", "삼성전자", "2024-01-02", "2024-01-03");
        page.show_outcome(&request(), &data_outcome());

        assert_eq!(page.rows.len(), 1);
        assert_eq!(page.rows[0].close, "79,600");
        assert_eq!(page.rows[0].date, "2024-01-02");
        assert_eq!(page.messages.len(), 1);
        assert!(page.chart_json.is_some());
        assert!(page.download_url.unwrap().starts_with("/export?companies="));
    }

    #[test]
    fn test_no_data_has_no_download() {
        let mut page = PageView::new("stock-dashboard", "없음", "2024-01-02", "2024-01-03");
        page.show_outcome(&request(), &QueryOutcome::NoData { notices: Vec::new() });

        assert!(page.rows.is_empty());
        assert!(page.download_url.is_none());
        assert_eq!(page.messages, vec![Message::info(messages::NO_DATA)]);
    }

    #[test]
    fn test_render_escapes_messages() {
        let renderer = PageRenderer::new().unwrap();
        let mut page = PageView::new("stock-dashboard", "삼성전자", "2024-01-02", "2024-01-03");
        page.show_outcome(&request(), &data_outcome());

        let html = renderer.render(&page).unwrap();
        assert!(html.contains("79,600"));
        assert!(html.contains("종가 기준 주가 추이"));
        assert!(html.contains("&lt;b&gt;없음"));
        assert!(!html.contains("<b>없음"));
        assert!(html.contains("export?companies="));
    }

    #[test]
    fn test_render_form_only() {
        let renderer = PageRenderer::new().unwrap();
        let page = PageView::new("stock-dashboard", "", "2025-01-01", "2025-06-15");

        let html = renderer.render(&page).unwrap();
        assert!(html.contains("value=\"2025-01-01\""));
        assert!(!html.contains("<table"));
    }
}
