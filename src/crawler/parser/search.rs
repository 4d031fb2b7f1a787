use crate::crawler::parser::{element_text, selectors};
use crate::model::ListingSummary;
use crate::url::{canonical_listing_url, resolve_link, same_site};
use scraper::{ElementRef, Html};
use std::collections::HashSet;
use url::Url;

/// Result cards on the results page, one selector group so matches come
/// back in document order across layouts
const CARD_SELECTOR: &str = "li.s-item, div.s-item, .srp-results .s-card";

/// Listing links inside a card, most specific first
const CARD_LINK_SELECTORS: &[&str] = &[
    "a.s-item__link[href]",
    ".s-item__title a[href]",
    "a[href*='/itm/']",
];

const CARD_TITLE_SELECTORS: &[&str] = &[".s-item__title", ".s-card__title"];
const CARD_PRICE_SELECTORS: &[&str] = &[".s-item__price", ".s-card__price"];
const CARD_IMAGE_SELECTORS: &[&str] = &[".s-item__image img", ".s-item__image-img", "img"];

/// "Next page" links, most specific first
const NEXT_PAGE_SELECTORS: &[&str] = &[
    "a.pagination__next[href]",
    "a[rel='next'][href]",
    "link[rel='next'][href]",
];

/// What a search results page yields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPage {
    /// Listing links in page order, without duplicates
    pub listings: Vec<ListingSummary>,

    /// Absolute URL of the next results page; `None` means end of results
    pub next_page_url: Option<String>,
}

/// Parses a search results page
///
/// Only links that canonicalize to a listing on the same site as the page
/// are kept. Result cards are read when present; a page without recognizable
/// cards falls back to every listing link in document order.
///
/// A blank or unreadable body yields an empty page and a warning; this
/// function never fails.
///
/// # Example
///
/// ```
/// use listing_harvest::crawler::parse_search_page;
/// use url::Url;
///
/// let page_url = Url::parse("https://www.ebay.com/sch/i.html?_nkw=lamp").unwrap();
/// let body = r#"<ul>
///   <li class="s-item"><a class="s-item__link" href="/itm/Lamp/111?hash=x">Lamp</a></li>
///   <li class="s-item"><a class="s-item__link" href="/itm/222">Shade</a></li>
/// </ul>
/// <a class="pagination__next" href="/sch/i.html?_nkw=lamp&_pgn=2">Next</a>"#;
///
/// let page = parse_search_page(body, &page_url);
/// assert_eq!(page.listings.len(), 2);
/// assert_eq!(page.listings[0].url, "https://www.ebay.com/itm/111");
/// assert!(page.next_page_url.is_some());
/// ```
pub fn parse_search_page(body: &str, page_url: &Url) -> SearchPage {
    if body.trim().is_empty() {
        tracing::warn!("Empty search page body for {}", page_url);
        return SearchPage::default();
    }

    let document = Html::parse_document(body);
    let mut seen = HashSet::new();
    let mut listings = Vec::new();

    let cards: Vec<ElementRef> = selectors(&[CARD_SELECTOR])
        .iter()
        .flat_map(|selector| document.select(selector).collect::<Vec<_>>())
        .collect();

    if cards.is_empty() {
        let any_listing_link = selectors(&["a[href]"]);
        for selector in &any_listing_link {
            for anchor in document.select(selector) {
                if let Some((url, item_id)) = listing_link(&anchor, page_url) {
                    if seen.insert(url.clone()) {
                        listings.push(ListingSummary {
                            url,
                            item_id,
                            title: Some(element_text(&anchor)).filter(|t| !t.is_empty()),
                            price_text: None,
                            thumbnail_url: None,
                        });
                    }
                }
            }
        }
    } else {
        let link_selectors = selectors(CARD_LINK_SELECTORS);
        for card in &cards {
            let link = link_selectors
                .iter()
                .flat_map(|selector| card.select(selector))
                .find_map(|anchor| listing_link(&anchor, page_url));

            if let Some((url, item_id)) = link {
                if seen.insert(url.clone()) {
                    listings.push(read_card(card, url, item_id, page_url));
                }
            }
        }
    }

    let next_page_url = find_next_page(&document, page_url);

    if listings.is_empty() {
        tracing::warn!("No listing links found on {}", page_url);
    } else {
        tracing::debug!("Found {} listings on {}", listings.len(), page_url);
    }

    SearchPage {
        listings,
        next_page_url,
    }
}

/// Canonical listing URL and item id of an anchor, if it points at a listing
fn listing_link(anchor: &ElementRef, page_url: &Url) -> Option<(String, String)> {
    let href = anchor.value().attr("href")?;
    let resolved = resolve_link(href, page_url)?;
    if !same_site(&resolved, page_url) {
        return None;
    }
    canonical_listing_url(&resolved)
}

fn read_card(card: &ElementRef, url: String, item_id: String, page_url: &Url) -> ListingSummary {
    let text_of = |list: &[&str]| {
        selectors(list).iter().find_map(|selector| {
            card.select(selector)
                .map(|el| element_text(&el))
                .find(|text| !text.is_empty())
        })
    };

    let title = text_of(CARD_TITLE_SELECTORS).map(|t| {
        t.strip_prefix("New Listing")
            .map(|rest| rest.trim().to_string())
            .unwrap_or(t)
    });

    let thumbnail_url = selectors(CARD_IMAGE_SELECTORS).iter().find_map(|selector| {
        card.select(selector).find_map(|img| {
            let attrs = img.value();
            attrs
                .attr("src")
                .filter(|s| !s.starts_with("data:"))
                .or_else(|| attrs.attr("data-src"))
                .and_then(|src| crate::url::normalize_image_url(src, page_url))
        })
    });

    ListingSummary {
        url,
        item_id,
        title,
        price_text: text_of(CARD_PRICE_SELECTORS),
        thumbnail_url,
    }
}

fn find_next_page(document: &Html, page_url: &Url) -> Option<String> {
    selectors(NEXT_PAGE_SELECTORS).iter().find_map(|selector| {
        document.select(selector).find_map(|el| {
            let attrs = el.value();
            if attrs.attr("aria-disabled") == Some("true") {
                return None;
            }
            let next = resolve_link(attrs.attr("href")?, page_url)?;
            if !same_site(&next, page_url) || next == *page_url {
                return None;
            }
            Some(next.to_string())
        })
    })
}
