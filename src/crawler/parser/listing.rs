use crate::crawler::parser::{element_text, first_attr, first_text, selectors};
use crate::model::{parse_amount, parse_price, Price, ProductRecord};
use crate::url::{item_id_from_url, normalize_image_url};
use crate::ParseError;
use chrono::Utc;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;
use url::Url;

/// Descriptions longer than this are cut
pub const MAX_DESCRIPTION_CHARS: usize = 5000;

const TITLE_SELECTORS: &[&str] = &[
    "#x-title-label-lbl",
    ".x-item-title__mainTitle",
    "h1[id*='title']",
    ".it-ttl",
    "h1",
];

const PRICE_SELECTORS: &[&str] = &[
    ".x-price-primary",
    "#prcIsum",
    "#mm-saleDscPrc",
    ".price .notranslate",
    "[data-testid='price'] .notranslate",
    ".u-price .notranslate",
    ".display-price",
    ".bin-price .notranslate",
    ".auction-price .notranslate",
];

const CONDITION_SELECTORS: &[&str] = &[
    ".x-item-condition-text .ux-textspans",
    ".x-item-condition-value",
    "[data-testid='condition']",
    "#vi-itm-cond",
    ".condition-text",
    ".item-condition",
];

const QUANTITY_SOLD_SELECTORS: &[&str] = &[
    "[data-testid='sold-quantity']",
    ".sold-quantity",
    ".quantity-sold",
];

const DESCRIPTION_SELECTORS: &[&str] = &[
    "#desc_div",
    ".x-item-description",
    "[data-testid='description']",
    ".item-description",
    "#item_description",
    ".description",
];

const SELLER_SELECTORS: &[&str] = &[
    ".x-sellercard-atf__info__about-seller a span",
    ".x-sellercard-atf__info__about-seller",
    ".ux-seller-section__item--seller a",
    "[data-testid='seller-name']",
    ".mbg-nw",
];

const SHIPPING_SELECTORS: &[&str] = &[
    ".ux-labels-values--shipping .ux-labels-values__values",
    "#fshippingCost",
    "#shSummary",
    "[data-testid='shipping']",
    ".shipping-cost",
];

/// (selector, attributes to try in order)
const IMAGE_SOURCES: &[(&str, &[&str])] = &[
    (".ux-image-carousel-item img", &["data-zoom-src", "src", "data-src"]),
    ("#icImg", &["src", "data-src"]),
    ("[data-zoom-src]", &["data-zoom-src"]),
    (".u-photo img", &["src", "data-src"]),
    (".img640 img", &["src"]),
    ("meta[property='og:image']", &["content"]),
];

/// Table rows holding label/value cell pairs
const SPECIFICS_ROW_SELECTORS: &[&str] = &[
    ".itemAttr tr",
    ".item-specifics tr",
    "[data-testid='item-specifics'] tr",
];

/// Main item panel; a sold figure in free text is only looked for inside it
const MAIN_ITEM_SELECTORS: &[&str] = &["#LeftSummaryPanel", "#mainContent"];

/// Recommendation and advert blocks whose figures belong to other items
const OTHER_ITEMS_SELECTORS: &[&str] = &[
    "[class*='merch']",
    "[class*='similar']",
    "[class*='sponsored']",
    "[class*='recommend']",
    "[id*='merch']",
    "[id*='similar']",
];

fn quantity_sold_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(?i)(\d[\d,]*)\s+sold\b",
            r"(?i)\bsold:\s*(\d[\d,]*)",
            r"(?i)quantity\s+sold:\s*(\d[\d,]*)",
            r"(?i)(\d[\d,]*)\s+vendus?\b",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("valid quantity sold pattern"))
        .collect()
    })
}

/// A parsed listing plus the non-fatal problems met on the way
#[derive(Debug, Clone)]
pub struct ListingExtraction {
    pub record: ProductRecord,

    /// Fields that were present but unreadable; each left the field absent
    pub warnings: Vec<ParseError>,
}

/// Parses a listing page into a product record
///
/// Every field is extracted on its own. A field that cannot be found is left
/// absent; a field that is present but garbled is left absent and reported
/// in [`ListingExtraction::warnings`].
///
/// # Arguments
///
/// * `body` - The listing page HTML
/// * `url` - Canonical listing URL the body was fetched from
///
/// # Returns
///
/// * `Ok(ListingExtraction)` - The record, possibly with warnings
/// * `Err(ParseError::EmptyBody)` - The body has no content at all
/// * `Err(ParseError::MissingRequiredField)` - No title could be found
///
/// # Example
///
/// ```
/// use listing_harvest::crawler::parse_listing_page;
///
/// let body = r#"<html><body>
///   <h1 class="x-item-title__mainTitle"><span>Brass desk lamp</span></h1>
///   <div class="x-price-primary"><span>US $24.99</span></div>
/// </body></html>"#;
///
/// let parsed = parse_listing_page(body, "https://www.ebay.com/itm/1001").unwrap();
/// assert_eq!(parsed.record.title, "Brass desk lamp");
/// assert_eq!(parsed.record.price.unwrap().amount, 24.99);
/// assert!(parsed.record.quantity_sold.is_none());
/// ```
pub fn parse_listing_page(body: &str, url: &str) -> Result<ListingExtraction, ParseError> {
    if body.trim().is_empty() {
        return Err(ParseError::EmptyBody {
            url: url.to_string(),
        });
    }

    let document = Html::parse_document(body);
    let page_text = visible_text(&document);
    if page_text.is_empty() && first_attr(&document, &["meta[property='og:title']"], "content").is_none() {
        return Err(ParseError::EmptyBody {
            url: url.to_string(),
        });
    }

    let title = extract_title(&document).ok_or_else(|| ParseError::MissingRequiredField {
        url: url.to_string(),
        field: "title",
    })?;

    let mut warnings = Vec::new();
    let page_url = Url::parse(url).ok();

    let price = match extract_price(&document) {
        PriceLookup::Found(price) => Some(price),
        PriceLookup::Missing => None,
        PriceLookup::Garbled(text) => {
            warnings.push(ParseError::MalformedField {
                url: url.to_string(),
                field: "price",
                value: text,
            });
            None
        }
    };

    let item_specifics = extract_item_specifics(&document);

    let condition = first_text(&document, CONDITION_SELECTORS)
        .map(|c| strip_label(&c, "Condition"))
        .filter(|c| !c.is_empty())
        .or_else(|| item_specifics.get("Condition").cloned());

    let quantity_sold = match extract_quantity_sold(&document) {
        Ok(quantity) => quantity,
        Err(text) => {
            warnings.push(ParseError::MalformedField {
                url: url.to_string(),
                field: "quantity_sold",
                value: text,
            });
            None
        }
    };

    let image_urls = page_url
        .as_ref()
        .map(|base| extract_images(&document, base))
        .unwrap_or_default();

    let description = first_text(&document, DESCRIPTION_SELECTORS).map(|d| truncate_chars(&d, MAX_DESCRIPTION_CHARS));

    let record = ProductRecord {
        url: url.to_string(),
        item_id: item_id_from_url(url).unwrap_or_default(),
        title,
        price,
        condition,
        quantity_sold,
        image_urls,
        item_specifics,
        description,
        seller: first_text(&document, SELLER_SELECTORS),
        shipping: first_text(&document, SHIPPING_SELECTORS),
        scraped_at: Utc::now(),
    };

    Ok(ListingExtraction { record, warnings })
}

fn extract_title(document: &Html) -> Option<String> {
    first_text(document, TITLE_SELECTORS)
        .map(|t| t.strip_prefix("Details about").map(str::trim).unwrap_or(&t).to_string())
        .filter(|t| !t.is_empty())
        .or_else(|| {
            first_attr(document, &["meta[property='og:title']"], "content").map(|t| {
                t.trim_end_matches(" | eBay").trim().to_string()
            })
        })
        .filter(|t| !t.is_empty())
}

enum PriceLookup {
    Found(Price),
    Missing,
    Garbled(String),
}

fn extract_price(document: &Html) -> PriceLookup {
    // Structured data first: machine-readable amount and ISO currency
    let amount = first_attr(document, &["[itemprop='price']"], "content")
        .or_else(|| first_text(document, &["[itemprop='price']"]));
    let currency = first_attr(document, &["[itemprop='priceCurrency']"], "content");

    if let (Some(amount), Some(currency)) = (&amount, &currency) {
        if let Some(value) = parse_amount(amount) {
            return PriceLookup::Found(Price::new(value, currency.as_str()));
        }
    }

    match first_text(document, PRICE_SELECTORS) {
        Some(text) => match parse_price(&text) {
            Some(price) => PriceLookup::Found(price),
            None => PriceLookup::Garbled(text),
        },
        None => match amount {
            Some(text) => PriceLookup::Garbled(text),
            None => PriceLookup::Missing,
        },
    }
}

/// `Ok(None)` when no figure is shown, `Err(text)` when it does not fit a u64
fn extract_quantity_sold(document: &Html) -> Result<Option<u64>, String> {
    if let Some(text) = first_text(document, QUANTITY_SOLD_SELECTORS) {
        let digits: String = text
            .split(|c: char| !c.is_ascii_digit() && c != ',')
            .find(|s| s.chars().any(|c| c.is_ascii_digit()))
            .unwrap_or("")
            .replace(',', "");
        if !digits.is_empty() {
            return digits.parse().map(Some).map_err(|_| text);
        }
    }

    let item_text = main_item_text(document);
    let mut best: Option<u64> = None;
    for pattern in quantity_sold_patterns() {
        for caps in pattern.captures_iter(&item_text) {
            let raw = &caps[1];
            let value: u64 = raw.replace(',', "").parse().map_err(|_| raw.to_string())?;
            best = Some(best.map_or(value, |b| b.max(value)));
        }
    }
    Ok(best)
}

fn extract_images(document: &Html, page_url: &Url) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut images = Vec::new();

    for (css, attrs) in IMAGE_SOURCES {
        for selector in selectors(&[*css]) {
            for element in document.select(&selector) {
                let src = attrs.iter().find_map(|attr| {
                    element
                        .value()
                        .attr(attr)
                        .and_then(|value| normalize_image_url(value, page_url))
                });
                if let Some(src) = src {
                    if seen.insert(src.clone()) {
                        images.push(src);
                    }
                }
            }
        }
    }

    images
}

fn extract_item_specifics(document: &Html) -> BTreeMap<String, String> {
    let mut specifics = BTreeMap::new();
    let mut insert = |key: String, value: String| {
        let key = key.trim().trim_end_matches(':').trim().to_string();
        let value = value.trim().to_string();
        if !key.is_empty() && !value.is_empty() {
            specifics.entry(key).or_insert(value);
        }
    };

    // Current layout: label/value blocks
    let label = selectors(&[".ux-labels-values__labels"]);
    let value = selectors(&[".ux-labels-values__values"]);
    for block in selectors(&[".x-about-this-item .ux-labels-values", ".ux-layout-section-evo .ux-labels-values"]) {
        for element in document.select(&block) {
            let key = label.iter().find_map(|s| element.select(s).next()).map(|e| element_text(&e));
            let val = value.iter().find_map(|s| element.select(s).next()).map(|e| element_text(&e));
            if let (Some(k), Some(v)) = (key, val) {
                insert(k, v);
            }
        }
    }

    // Older layouts: table rows with label/value cell pairs
    let cell = selectors(&["td, th"]);
    for row_selector in selectors(SPECIFICS_ROW_SELECTORS) {
        for row in document.select(&row_selector) {
            let cells: Vec<String> = cell
                .iter()
                .flat_map(|s| row.select(s))
                .map(|c| element_text(&c))
                .collect();
            for pair in cells.chunks(2) {
                if let [k, v] = pair {
                    insert(k.clone(), v.clone());
                }
            }
        }
    }

    // Definition lists
    let dt = selectors(&["dt"]);
    let dd = selectors(&["dd"]);
    for dl in selectors(&["dl"]) {
        for list in document.select(&dl) {
            let keys: Vec<ElementRef> = dt.iter().flat_map(|s| list.select(s)).collect();
            let values: Vec<ElementRef> = dd.iter().flat_map(|s| list.select(s)).collect();
            for (k, v) in keys.iter().zip(values.iter()) {
                insert(element_text(k), element_text(v));
            }
        }
    }

    specifics
}

/// Page text outside of script and style elements, whitespace-collapsed
fn visible_text(document: &Html) -> String {
    visible_text_within(document.root_element(), &[])
}

/// Visible text of the main item panel (the whole page when there is none),
/// leaving out blocks about other items
fn main_item_text(document: &Html) -> String {
    let root = selectors(MAIN_ITEM_SELECTORS)
        .iter()
        .find_map(|selector| document.select(selector).next())
        .unwrap_or_else(|| document.root_element());
    visible_text_within(root, &selectors(OTHER_ITEMS_SELECTORS))
}

fn visible_text_within(root: ElementRef, skip: &[Selector]) -> String {
    let mut parts = Vec::new();
    for node in root.descendants() {
        if let Node::Text(text) = node.value() {
            let hidden = node
                .parent()
                .and_then(|p| p.value().as_element().map(|e| e.name()))
                .is_some_and(|name| matches!(name, "script" | "style" | "noscript" | "template"));
            let skipped = !skip.is_empty()
                && node
                    .ancestors()
                    .filter_map(ElementRef::wrap)
                    .any(|el| skip.iter().any(|selector| selector.matches(&el)));
            if !hidden && !skipped {
                parts.push(&**text);
            }
        }
    }
    parts.join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_label(text: &str, label: &str) -> String {
    text.strip_prefix(label)
        .map(|rest| rest.trim_start_matches(':').trim())
        .unwrap_or(text)
        .to_string()
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
