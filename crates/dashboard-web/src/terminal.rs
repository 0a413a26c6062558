//! One-shot query printed to the terminal

use anyhow::Context;
use chrono::NaiveDate;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::UTF8_FULL};
use dashboard_stock::{
    DateRange, DisplayTable, QueryOutcome, QueryRequest, StockDashboard, presenter::DISPLAY_COLUMNS,
    write_xlsx,
};
use std::path::Path;

use crate::form::{default_range, today_kst};
use crate::messages::{self, Level};
use crate::view::RowView;

/// Build the comfy-table rendering of `table`
pub fn render_table(table: &DisplayTable) -> Table {
    let mut out = Table::new();
    out.load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(DISPLAY_COLUMNS.iter().map(|c| Cell::new(c)));

    for row in table.rows() {
        let view = RowView::from(row);
        let numeric = |value: String| Cell::new(value).set_alignment(CellAlignment::Right);
        out.add_row(vec![
            Cell::new(view.date),
            Cell::new(view.company),
            numeric(view.open),
            numeric(view.high),
            numeric(view.low),
            numeric(view.close),
            numeric(view.volume),
            numeric(view.change),
        ]);
    }

    out
}

/// Run one query, print messages and the table, optionally write the xlsx
pub async fn run_query(
    dashboard: &StockDashboard,
    companies: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let (default_start, default_end) = default_range(today_kst());
    let range = DateRange::new(start.unwrap_or(default_start), end.unwrap_or(default_end))?;
    let request = QueryRequest::new(companies, range);

    let outcome = match dashboard.query(&request).await {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("{}", messages::failure(&e));
            return Err(e.into());
        }
    };

    for message in messages::for_outcome(&outcome) {
        match message.level {
            Level::Info => println!("{}", message.text),
            Level::Warning | Level::Error => eprintln!("{}", message.text),
        }
    }

    let QueryOutcome::Data { table, .. } = &outcome else {
        return Ok(());
    };

    let display = DisplayTable::from_combined(table);
    println!("{}", render_table(&display));

    if let Some(path) = output {
        let bytes = write_xlsx(&display, &dashboard.config().sheet_name)?;
        tokio::fs::write(path, bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Saved {} rows to {}", display.len(), path.display());
    }

    Ok(())
}
