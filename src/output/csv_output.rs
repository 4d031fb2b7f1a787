//! CSV export
//!
//! One header row, then one row per record in the flat column scheme.

use crate::model::ProductRecord;
use crate::output::flatten::{FlatRecord, COLUMNS};
use crate::output::traits::{ExportFormat, ExportResult, Exporter};
use std::io::Read;

/// Writes records as CSV
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvExporter;

impl Exporter for CsvExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Csv
    }

    fn render(&self, records: &[ProductRecord]) -> ExportResult<Vec<u8>> {
        // The header is written by hand so an empty collection still gets one
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());

        writer.write_record(COLUMNS)?;
        for record in records {
            writer.serialize(FlatRecord::from(record))?;
        }

        writer
            .into_inner()
            .map_err(|e| e.into_error().into())
    }
}

/// Reads records back from CSV produced by [`CsvExporter`]
///
/// Subject to the losses documented in the flat column scheme.
pub fn read_csv<R: Read>(reader: R) -> ExportResult<Vec<ProductRecord>> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut records = Vec::new();
    for row in reader.deserialize::<FlatRecord>() {
        records.push(ProductRecord::from(row?));
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Price;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    fn record(id: &str, title: &str) -> ProductRecord {
        ProductRecord {
            url: format!("https://www.ebay.com/itm/{}", id),
            item_id: id.to_string(),
            title: title.to_string(),
            price: Some(Price::new(1234.5, "GBP")),
            condition: None,
            quantity_sold: None,
            image_urls: vec![],
            item_specifics: BTreeMap::new(),
            description: Some("Line one\nLine two, with \"quotes\"".to_string()),
            seller: None,
            shipping: Some("Free".to_string()),
            scraped_at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
        }
    }

    #[test]
    fn test_empty_collection_has_header_only() {
        let bytes = CsvExporter.render(&[]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, format!("{}\n", COLUMNS.join(",")));
    }

    #[test]
    fn test_rows_in_order() {
        let records = vec![record("1", "First"), record("2", "Second")];
        let bytes = CsvExporter.render(&records).unwrap();

        let back = read_csv(bytes.as_slice()).unwrap();
        let titles: Vec<&str> = back.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Second"]);
    }

    #[test]
    fn test_quoting_survives() {
        let records = vec![record("1", "Lamp, brass \"vintage\"")];
        let bytes = CsvExporter.render(&records).unwrap();
        let back = read_csv(bytes.as_slice()).unwrap();
        assert_eq!(back, records);
    }

    #[test]
    fn test_render_is_deterministic() {
        let records = vec![record("1", "First"), record("2", "Second")];
        assert_eq!(
            CsvExporter.render(&records).unwrap(),
            CsvExporter.render(&records).unwrap()
        );
    }
}
