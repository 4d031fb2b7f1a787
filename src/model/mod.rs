//! Data model shared by the crawler and the exporters
//!
//! - `SearchQuery`: what to search for, immutable once built
//! - `ListingSummary`: a listing link seen on a results page
//! - `ProductRecord`: the extracted product, the unit of export
//! - `Price`: a normalized amount + currency

mod price;
mod query;
mod record;

pub use price::{detect_currency, parse_amount, parse_price, Price};
pub use query::{ItemCondition, SearchFilters, SearchQuery, SortOrder};
pub use record::{ListingSummary, ProductRecord};
