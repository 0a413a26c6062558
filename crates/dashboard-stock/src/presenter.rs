//! Shape a combined result for display: the sorted table and the line chart

use chrono::NaiveDate;
use serde::Serialize;

use crate::types::CombinedTable;

/// Column headers of the display table, in order
pub const DISPLAY_COLUMNS: [&str; 8] = [
    "Date", "Company", "Open", "High", "Low", "Close", "Volume", "Change",
];

/// One display row; the date carries no time of day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayRow {
    pub date: NaiveDate,
    pub company: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub change: Option<f64>,
}

/// Display table ordered by date descending, then company ascending
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DisplayTable {
    rows: Vec<DisplayRow>,
}

impl DisplayTable {
    pub fn from_combined(table: &CombinedTable) -> Self {
        let mut rows: Vec<DisplayRow> = table
            .records()
            .iter()
            .map(|record| DisplayRow {
                date: record.bar.timestamp.date_naive(),
                company: record.company.clone(),
                open: record.bar.open,
                high: record.bar.high,
                low: record.bar.low,
                close: record.bar.close,
                volume: record.bar.volume,
                change: record.bar.change,
            })
            .collect();

        // Stable: rows sharing (date, company) keep provider order
        rows.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.company.cmp(&b.company)));

        Self { rows }
    }

    pub fn rows(&self) -> &[DisplayRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// One line of the chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub company: String,
    pub points: Vec<ChartPoint>,
}

/// Closing price over time, one series per company
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub legend_label: String,
    pub series: Vec<ChartSeries>,
}

impl LineChart {
    pub fn from_combined(table: &CombinedTable) -> Self {
        let series = table
            .companies()
            .into_iter()
            .map(|company| {
                let mut points: Vec<ChartPoint> = table
                    .records()
                    .iter()
                    .filter(|record| record.company == company)
                    .map(|record| ChartPoint {
                        date: record.bar.timestamp.date_naive(),
                        close: record.bar.close,
                    })
                    .collect();
                points.sort_by_key(|point| point.date);

                ChartSeries {
                    company: company.to_string(),
                    points,
                }
            })
            .collect();

        Self {
            title: "종가 기준 주가 추이".to_string(),
            x_label: "날짜".to_string(),
            y_label: "가격".to_string(),
            legend_label: "기업명".to_string(),
            series,
        }
    }

    /// JSON for embedding inside a `<script>` element
    pub fn to_script_json(&self) -> serde_json::Result<String> {
        Ok(serde_json::to_string(self)?.replace("</", "<\\/"))
    }
}
