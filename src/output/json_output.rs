//! JSON export
//!
//! A pretty-printed array of full, nested product records. Lossless.

use crate::model::ProductRecord;
use crate::output::traits::{ExportFormat, ExportResult, Exporter};
use std::io::Read;

/// Writes records as a JSON array
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonExporter;

impl Exporter for JsonExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Json
    }

    fn render(&self, records: &[ProductRecord]) -> ExportResult<Vec<u8>> {
        let mut bytes = serde_json::to_vec_pretty(records)?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

/// Reads records back from JSON produced by [`JsonExporter`]
pub fn read_json<R: Read>(reader: R) -> ExportResult<Vec<ProductRecord>> {
    Ok(serde_json::from_reader(reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Price;
    use chrono::Utc;
    use std::collections::BTreeMap;

    #[test]
    fn test_empty_collection() {
        let bytes = JsonExporter.render(&[]).unwrap();
        assert_eq!(bytes, b"[]\n");
    }

    #[test]
    fn test_nested_fields_preserved() {
        let mut specifics = BTreeMap::new();
        specifics.insert("Notes".to_string(), "a;b:c | d".to_string());

        let record = ProductRecord {
            url: "https://www.ebay.com/itm/7".to_string(),
            item_id: "7".to_string(),
            title: "Odd \"lamp\"".to_string(),
            price: Some(Price::new(0.1 + 0.2, "EUR")),
            condition: Some(String::new()),
            quantity_sold: Some(u64::MAX),
            image_urls: vec!["https://i.ebayimg.com/a | b.jpg".to_string()],
            item_specifics: specifics,
            description: None,
            seller: None,
            shipping: None,
            scraped_at: Utc::now(),
        };

        let bytes = JsonExporter.render(std::slice::from_ref(&record)).unwrap();
        let back = read_json(bytes.as_slice()).unwrap();
        assert_eq!(back, vec![record]);
    }
}
