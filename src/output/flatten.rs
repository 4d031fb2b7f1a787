//! Flat column scheme shared by the CSV and XLSX exports
//!
//! | column           | content                                              |
//! |------------------|------------------------------------------------------|
//! | `url`            | canonical listing URL                                |
//! | `item_id`        | numeric item id                                      |
//! | `title`          | listing title                                        |
//! | `price_amount`   | numeric amount, empty when unknown                   |
//! | `price_currency` | ISO 4217 code, empty when unknown                    |
//! | `condition`      | condition as displayed                               |
//! | `quantity_sold`  | integer, empty when unknown                          |
//! | `seller`         | seller name                                          |
//! | `shipping`       | shipping text as displayed                           |
//! | `image_urls`     | image URLs in page order, joined by `" \| "`         |
//! | `item_specifics` | `key:value;key:value`, sorted by key                 |
//! | `description`    | description text                                     |
//! | `scraped_at`     | RFC 3339 UTC timestamp                               |
//!
//! Reading a flat row back is lossy in three places: an empty string field
//! reads back as absent, an image URL containing `" | "` splits in two, and a
//! specifics key or value containing `:` or `;` does not survive.

use crate::model::{Price, ProductRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Delimiter between image URLs
pub const IMAGE_DELIMITER: &str = " | ";

/// Delimiter between item specifics entries
pub const SPECIFICS_DELIMITER: char = ';';

/// Delimiter between an item specific's key and value
pub const SPECIFICS_KEY_VALUE: char = ':';

/// Column headers, in order
pub const COLUMNS: [&str; 13] = [
    "url",
    "item_id",
    "title",
    "price_amount",
    "price_currency",
    "condition",
    "quantity_sold",
    "seller",
    "shipping",
    "image_urls",
    "item_specifics",
    "description",
    "scraped_at",
];

/// One product record as a flat row
///
/// Field order matches [`COLUMNS`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatRecord {
    pub url: String,
    pub item_id: String,
    pub title: String,
    pub price_amount: Option<f64>,
    pub price_currency: Option<String>,
    pub condition: Option<String>,
    pub quantity_sold: Option<u64>,
    pub seller: Option<String>,
    pub shipping: Option<String>,
    pub image_urls: String,
    pub item_specifics: String,
    pub description: Option<String>,
    pub scraped_at: DateTime<Utc>,
}

impl From<&ProductRecord> for FlatRecord {
    fn from(record: &ProductRecord) -> Self {
        Self {
            url: record.url.clone(),
            item_id: record.item_id.clone(),
            title: record.title.clone(),
            price_amount: record.price.as_ref().map(|p| p.amount),
            price_currency: record.price.as_ref().map(|p| p.currency.clone()),
            condition: record.condition.clone(),
            quantity_sold: record.quantity_sold,
            seller: record.seller.clone(),
            shipping: record.shipping.clone(),
            image_urls: join_images(&record.image_urls),
            item_specifics: join_specifics(&record.item_specifics),
            description: record.description.clone(),
            scraped_at: record.scraped_at,
        }
    }
}

impl From<FlatRecord> for ProductRecord {
    fn from(flat: FlatRecord) -> Self {
        let price = match (flat.price_amount, flat.price_currency) {
            (Some(amount), Some(currency)) => Some(Price::new(amount, currency)),
            _ => None,
        };

        Self {
            url: flat.url,
            item_id: flat.item_id,
            title: flat.title,
            price,
            condition: non_empty(flat.condition),
            quantity_sold: flat.quantity_sold,
            image_urls: split_images(&flat.image_urls),
            item_specifics: split_specifics(&flat.item_specifics),
            description: non_empty(flat.description),
            seller: non_empty(flat.seller),
            shipping: non_empty(flat.shipping),
            scraped_at: flat.scraped_at,
        }
    }
}

/// Joins image URLs with [`IMAGE_DELIMITER`]
pub fn join_images(urls: &[String]) -> String {
    urls.join(IMAGE_DELIMITER)
}

/// Splits a joined image column back into URLs
pub fn split_images(joined: &str) -> Vec<String> {
    joined
        .split(IMAGE_DELIMITER)
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .collect()
}

/// Encodes item specifics as `key:value;key:value`, sorted by key
pub fn join_specifics(specifics: &BTreeMap<String, String>) -> String {
    specifics
        .iter()
        .map(|(key, value)| format!("{}{}{}", key, SPECIFICS_KEY_VALUE, value))
        .collect::<Vec<_>>()
        .join(&SPECIFICS_DELIMITER.to_string())
}

/// Decodes an item specifics column; entries without a `:` are dropped
pub fn split_specifics(joined: &str) -> BTreeMap<String, String> {
    joined
        .split(SPECIFICS_DELIMITER)
        .filter_map(|entry| entry.split_once(SPECIFICS_KEY_VALUE))
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
