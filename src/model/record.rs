use crate::model::Price;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A listing link found on a search results page
///
/// Only lives long enough to seed a listing fetch; never exported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingSummary {
    /// Canonical listing URL (`<origin>/itm/<id>`)
    pub url: String,

    /// Numeric item id taken from the URL
    pub item_id: String,

    /// Title shown on the result card, if any
    pub title: Option<String>,

    /// Price text shown on the result card, if any
    pub price_text: Option<String>,

    /// Thumbnail image shown on the result card, if any
    pub thumbnail_url: Option<String>,
}

/// One product extracted from a listing page
///
/// Every optional field is `None` when the page did not show it (or showed
/// something unreadable); nothing is defaulted to a made-up value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Canonical listing URL
    pub url: String,

    /// Numeric item id taken from the URL
    pub item_id: String,

    /// Listing title (always present)
    pub title: String,

    /// Normalized price
    pub price: Option<Price>,

    /// Item condition as displayed ("New", "Used", ...)
    pub condition: Option<String>,

    /// Number of units sold
    pub quantity_sold: Option<u64>,

    /// Image URLs in page order, without duplicates
    pub image_urls: Vec<String>,

    /// Seller-provided attributes, keyed by label
    pub item_specifics: BTreeMap<String, String>,

    /// Seller description text
    pub description: Option<String>,

    /// Seller name
    pub seller: Option<String>,

    /// Shipping cost/terms as displayed
    pub shipping: Option<String>,

    /// When the listing was fetched
    pub scraped_at: DateTime<Utc>,
}

impl ProductRecord {
    /// Returns true if the listing exposed no optional information at all
    pub fn is_bare(&self) -> bool {
        self.price.is_none()
            && self.condition.is_none()
            && self.quantity_sold.is_none()
            && self.image_urls.is_empty()
            && self.item_specifics.is_empty()
            && self.description.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_record() -> ProductRecord {
        ProductRecord {
            url: "https://www.ebay.com/itm/123".to_string(),
            item_id: "123".to_string(),
            title: "Desk lamp".to_string(),
            price: None,
            condition: None,
            quantity_sold: None,
            image_urls: vec![],
            item_specifics: BTreeMap::new(),
            description: None,
            seller: None,
            shipping: None,
            scraped_at: Utc::now(),
        }
    }

    #[test]
    fn test_is_bare() {
        let mut record = bare_record();
        assert!(record.is_bare());

        record.quantity_sold = Some(4);
        assert!(!record.is_bare());
    }

    #[test]
    fn test_absent_fields_serialize_as_null() {
        let json = serde_json::to_value(bare_record()).unwrap();
        assert!(json["price"].is_null());
        assert!(json["quantity_sold"].is_null());
        assert_eq!(json["title"], "Desk lamp");
    }
}
