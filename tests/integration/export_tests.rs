//! Integration tests for the export writer
//!
//! Round trips through the files on disk, determinism of repeated writes
//! and isolation of a failing format.

use chrono::{TimeZone, Utc};
use listing_harvest::output::{output_path, read_csv, read_json, write_exports, ExportFormat};
use listing_harvest::{Price, ProductRecord};
use std::collections::BTreeMap;
use std::fs;

fn sample_records() -> Vec<ProductRecord> {
    let mut specifics = BTreeMap::new();
    specifics.insert("Brand".to_string(), "Acme".to_string());
    specifics.insert("Bulb Type".to_string(), "LED".to_string());

    vec![
        ProductRecord {
            url: "https://www.ebay.com/itm/1001".to_string(),
            item_id: "1001".to_string(),
            title: "Brass Desk Lamp, \"vintage\"".to_string(),
            price: Some(Price::new(24.99, "USD")),
            condition: Some("Used".to_string()),
            quantity_sold: Some(17),
            image_urls: vec![
                "https://i.ebayimg.com/images/g/a/s-l1600.jpg".to_string(),
                "https://i.ebayimg.com/images/g/b/s-l1600.jpg".to_string(),
            ],
            item_specifics: specifics,
            description: Some("Works.\nSmall dent on the base.".to_string()),
            seller: Some("lamp_shop".to_string()),
            shipping: Some("Free shipping".to_string()),
            scraped_at: Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap(),
        },
        ProductRecord {
            url: "https://www.ebay.com/itm/1002".to_string(),
            item_id: "1002".to_string(),
            title: "LED Lamp".to_string(),
            price: None,
            condition: None,
            quantity_sold: None,
            image_urls: vec![],
            item_specifics: BTreeMap::new(),
            description: None,
            seller: None,
            shipping: None,
            scraped_at: Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 2).unwrap()
                + chrono::Duration::nanoseconds(123_456_789),
        },
    ]
}

#[test]
fn test_json_round_trip_is_lossless() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("lamps");
    let records = sample_records();

    let report = write_exports(&records, &[ExportFormat::Json], &base);
    assert!(report.failed.is_empty());

    let file = fs::File::open(output_path(&base, ExportFormat::Json)).unwrap();
    assert_eq!(read_json(file).unwrap(), records);
}

#[test]
fn test_csv_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("lamps");
    let records = sample_records();

    write_exports(&records, &[ExportFormat::Csv], &base);

    let file = fs::File::open(output_path(&base, ExportFormat::Csv)).unwrap();
    let back = read_csv(file).unwrap();
    assert_eq!(back, records);
}

#[test]
fn test_csv_flattened_columns() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("lamps");
    write_exports(&sample_records(), &[ExportFormat::Csv], &base);

    let text = fs::read_to_string(output_path(&base, ExportFormat::Csv)).unwrap();
    assert!(text.starts_with("url,item_id,title,price_amount,price_currency,"));
    assert!(text.contains(
        "https://i.ebayimg.com/images/g/a/s-l1600.jpg | https://i.ebayimg.com/images/g/b/s-l1600.jpg"
    ));
    assert!(text.contains("Brand:Acme;Bulb Type:LED"));
}

#[test]
fn test_repeated_writes_are_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("lamps");
    let records = sample_records();
    let formats = [ExportFormat::Csv, ExportFormat::Json, ExportFormat::Xlsx];

    write_exports(&records, &formats, &base);
    let first: Vec<Vec<u8>> = formats
        .iter()
        .map(|f| fs::read(output_path(&base, *f)).unwrap())
        .collect();

    // Cross a wall-clock second so a time-stamped workbook would differ
    std::thread::sleep(std::time::Duration::from_millis(1100));
    write_exports(&records, &formats, &base);
    let second: Vec<Vec<u8>> = formats
        .iter()
        .map(|f| fs::read(output_path(&base, *f)).unwrap())
        .collect();

    assert_eq!(first, second);
}

#[test]
fn test_failing_format_does_not_stop_others() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("lamps");
    fs::create_dir(output_path(&base, ExportFormat::Csv)).unwrap();

    let report = write_exports(
        &sample_records(),
        &[ExportFormat::Csv, ExportFormat::Json, ExportFormat::Xlsx],
        &base,
    );

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, ExportFormat::Csv);
    assert_eq!(report.failed[0].1.kind(), "write_failure");

    let written: Vec<ExportFormat> = report.written.iter().map(|(f, _)| *f).collect();
    assert_eq!(written, vec![ExportFormat::Json, ExportFormat::Xlsx]);
    assert!(output_path(&base, ExportFormat::Xlsx).is_file());
}

#[test]
fn test_overwrite_replaces_previous_export() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("lamps");
    let records = sample_records();

    write_exports(&records, &[ExportFormat::Json], &base);
    write_exports(&records[..1], &[ExportFormat::Json], &base);

    let file = fs::File::open(output_path(&base, ExportFormat::Json)).unwrap();
    assert_eq!(read_json(file).unwrap().len(), 1);
}
