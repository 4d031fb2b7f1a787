//! XLSX export
//!
//! A single "Listings" worksheet in the flat column scheme. Prices and
//! quantities are written as numbers, everything else as text.

use crate::model::ProductRecord;
use crate::output::flatten::{FlatRecord, COLUMNS};
use crate::output::traits::{ExportFormat, ExportResult, Exporter};
use chrono::{DateTime, Datelike, Timelike, Utc};
use rust_xlsxwriter::{DocProperties, ExcelDateTime, Format, Workbook, Worksheet};

/// Longest string a worksheet cell accepts
pub const MAX_CELL_CHARS: usize = 32_767;

const MAX_COLUMN_WIDTH: usize = 50;
const SHEET_NAME: &str = "Listings";

/// Writes records as an Excel workbook
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxExporter;

impl Exporter for XlsxExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Xlsx
    }

    fn render(&self, records: &[ProductRecord]) -> ExportResult<Vec<u8>> {
        let mut workbook = Workbook::new();
        let created = excel_datetime(creation_time(records))?;
        workbook.set_properties(&DocProperties::new().set_creation_datetime(&created));
        {
            let sheet = workbook.add_worksheet();
            sheet.set_name(SHEET_NAME)?;
            fill_sheet(sheet, records)?;
        }
        Ok(workbook.save_to_buffer()?)
    }
}

fn fill_sheet(sheet: &mut Worksheet, records: &[ProductRecord]) -> ExportResult<()> {
    let header = Format::new().set_bold();
    let mut widths: Vec<usize> = COLUMNS.iter().map(|c| c.len()).collect();

    for (col, name) in COLUMNS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *name, &header)?;
    }
    sheet.set_freeze_panes(1, 0)?;

    for (index, record) in records.iter().enumerate() {
        let row = index as u32 + 1;
        let flat = FlatRecord::from(record);

        let cells: [Cell; 13] = [
            Cell::Text(Some(flat.url)),
            Cell::Text(Some(flat.item_id)),
            Cell::Text(Some(flat.title)),
            Cell::Number(flat.price_amount),
            Cell::Text(flat.price_currency),
            Cell::Text(flat.condition),
            Cell::Number(flat.quantity_sold.map(|q| q as f64)),
            Cell::Text(flat.seller),
            Cell::Text(flat.shipping),
            Cell::Text(Some(flat.image_urls)),
            Cell::Text(Some(flat.item_specifics)),
            Cell::Text(flat.description),
            Cell::Text(Some(flat.scraped_at.to_rfc3339_opts(
                chrono::SecondsFormat::AutoSi,
                true,
            ))),
        ];

        for (col, cell) in cells.into_iter().enumerate() {
            let col_num = col as u16;
            match cell {
                Cell::Text(Some(text)) if !text.is_empty() => {
                    let text = truncate_cell(&text);
                    widths[col] = widths[col].max(text.chars().count());
                    sheet.write_string(row, col_num, text)?;
                }
                Cell::Number(Some(value)) => {
                    widths[col] = widths[col].max(value.to_string().len());
                    sheet.write_number(row, col_num, value)?;
                }
                _ => {}
            }
        }
    }

    for (col, width) in widths.iter().enumerate() {
        let width = (*width).min(MAX_COLUMN_WIDTH) + 2;
        sheet.set_column_width(col as u16, width as f64)?;
    }

    Ok(())
}

/// Workbook creation time: the earliest `scraped_at`, or the Unix epoch for
/// an empty collection
///
/// Left unset, the writer stamps the current time and two saves of the same
/// records differ.
fn creation_time(records: &[ProductRecord]) -> DateTime<Utc> {
    records
        .iter()
        .map(|r| r.scraped_at)
        .min()
        .unwrap_or_default()
}

fn excel_datetime(time: DateTime<Utc>) -> ExportResult<ExcelDateTime> {
    let year = u16::try_from(time.year()).unwrap_or(1970);
    let datetime = ExcelDateTime::from_ymd(year, time.month() as u8, time.day() as u8)?
        .and_hms(time.hour() as u16, time.minute() as u8, time.second())?;
    Ok(datetime)
}

enum Cell {
    Text(Option<String>),
    Number(Option<f64>),
}

fn truncate_cell(text: &str) -> &str {
    match text.char_indices().nth(MAX_CELL_CHARS) {
        Some((byte_index, _)) => {
            tracing::warn!(
                "Truncating {}-character cell to {} characters",
                text.chars().count(),
                MAX_CELL_CHARS
            );
            &text[..byte_index]
        }
        None => text,
    }
}
