//! Spreadsheet export of the display table

use chrono::NaiveDate;
use rust_xlsxwriter::{Format, Workbook};

use crate::error::Result;
use crate::presenter::{DISPLAY_COLUMNS, DisplayTable};

/// MIME type of an `.xlsx` workbook
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Download filename stamped with the query date
pub fn export_filename(query_date: NaiveDate) -> String {
    format!("주가조회_결과_{}.xlsx", query_date.format("%Y%m%d"))
}

/// Write `table` to a single-sheet workbook and return its bytes.
///
/// Row 0 holds the column headers; each display row follows in display order.
/// Dates are written as `YYYY-MM-DD` text and a missing change as an empty cell.
pub fn write_xlsx(table: &DisplayTable, sheet_name: &str) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let price = Format::new().set_num_format("#,##0.##");
    let volume = Format::new().set_num_format("#,##0");
    let percent = Format::new().set_num_format("0.00%");

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;

    for (col, title) in DISPLAY_COLUMNS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *title, &header)?;
    }

    for (idx, row) in table.rows().iter().enumerate() {
        let r = idx as u32 + 1;
        worksheet.write_string(r, 0, row.date.format("%Y-%m-%d").to_string())?;
        worksheet.write_string(r, 1, &row.company)?;
        worksheet.write_number_with_format(r, 2, row.open, &price)?;
        worksheet.write_number_with_format(r, 3, row.high, &price)?;
        worksheet.write_number_with_format(r, 4, row.low, &price)?;
        worksheet.write_number_with_format(r, 5, row.close, &price)?;
        worksheet.write_number_with_format(r, 6, row.volume as f64, &volume)?;
        if let Some(change) = row.change {
            worksheet.write_number_with_format(r, 7, change, &percent)?;
        }
    }

    worksheet.set_column_width(0, 12)?;
    worksheet.set_column_width(1, 18)?;
    worksheet.set_freeze_panes(1, 0)?;

    let bytes = workbook.save_to_buffer()?;
    tracing::debug!(rows = table.len(), bytes = bytes.len(), "Wrote xlsx export");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CombinedTable, PriceBar, kst};
    use calamine::{Data, Reader, Xlsx, open_workbook_from_rs};
    use chrono::TimeZone;
    use std::io::Cursor;

    fn bar(day: u32, close: f64, change: Option<f64>) -> PriceBar {
        PriceBar {
            timestamp: kst().with_ymd_and_hms(2024, 1, day, 9, 0, 0).unwrap(),
            open: close - 100.0,
            high: close + 200.0,
            low: close - 300.0,
            close,
            volume: 12_345_678,
            change,
        }
    }

    fn display() -> DisplayTable {
        let mut table = CombinedTable::new();
        table.append_company("삼성전자", vec![bar(2, 79_600.0, None), bar(3, 77_000.0, Some(-0.0327))]);
        table.append_company("LG", vec![bar(2, 92_000.0, None), bar(3, 91_500.0, Some(-0.0054))]);
        DisplayTable::from_combined(&table)
    }

    fn cell_string(cell: &Data) -> String {
        match cell {
            Data::String(s) => s.clone(),
            other => panic!("expected string cell, got {other:?}"),
        }
    }

    #[test]
    fn test_export_filename() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        assert_eq!(export_filename(date), "주가조회_결과_20250307.xlsx");
    }

    #[test]
    fn test_xlsx_round_trips_display_rows() {
        let table = display();
        let bytes = write_xlsx(&table, "Stock_Data").unwrap();

        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["Stock_Data".to_string()]);

        let range = workbook.worksheet_range("Stock_Data").unwrap();
        let rows: Vec<&[Data]> = range.rows().collect();
        assert_eq!(rows.len(), table.len() + 1);

        let headers: Vec<String> = rows[0].iter().map(cell_string).collect();
        assert_eq!(headers, DISPLAY_COLUMNS);

        for (sheet_row, display_row) in rows[1..].iter().zip(table.rows()) {
            assert_eq!(cell_string(&sheet_row[0]), display_row.date.to_string());
            assert_eq!(cell_string(&sheet_row[1]), display_row.company);
            assert_eq!(sheet_row[5], Data::Float(display_row.close));
            assert_eq!(sheet_row[6], Data::Float(display_row.volume as f64));
        }
    }

    #[test]
    fn test_xlsx_missing_change_is_empty_cell() {
        let table = display();
        let bytes = write_xlsx(&table, "Stock_Data").unwrap();
        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).unwrap();
        let range = workbook.worksheet_range("Stock_Data").unwrap();

        // Last display rows are the 2024-01-02 bars, which have no change
        let last = range.rows().last().unwrap();
        assert!(matches!(last.get(7), None | Some(Data::Empty)));
    }

    #[test]
    fn test_xlsx_custom_sheet_name() {
        let bytes = write_xlsx(&display(), "주가").unwrap();
        let workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["주가".to_string()]);
    }

    #[test]
    fn test_xlsx_rejects_invalid_sheet_name() {
        assert!(write_xlsx(&display(), "bad/name").is_err());
    }
}
