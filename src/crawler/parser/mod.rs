//! HTML parsers for search result pages and listing pages
//!
//! Both parsers work on an already-fetched body and never touch the network.
//! Markup drift is expected: every field is looked up through an ordered list
//! of selectors and the first usable match wins.

mod listing;
mod search;

pub use listing::{parse_listing_page, ListingExtraction, MAX_DESCRIPTION_CHARS};
pub use search::{parse_search_page, SearchPage};

use scraper::{ElementRef, Html, Selector};

/// Parses a list of CSS selectors, skipping any that fail to parse
pub(crate) fn selectors(list: &[&str]) -> Vec<Selector> {
    list.iter().filter_map(|css| Selector::parse(css).ok()).collect()
}

/// Whitespace-collapsed text of an element
pub(crate) fn element_text(element: &ElementRef) -> String {
    element.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text of the first element matched by any selector, in selector order
///
/// Elements whose text is empty are skipped.
pub(crate) fn first_text(document: &Html, list: &[&str]) -> Option<String> {
    selectors(list).iter().find_map(|selector| {
        document
            .select(selector)
            .map(|el| element_text(&el))
            .find(|text| !text.is_empty())
    })
}

/// Attribute of the first element matched by any selector, in selector order
pub(crate) fn first_attr(document: &Html, list: &[&str], attr: &str) -> Option<String> {
    selectors(list).iter().find_map(|selector| {
        document
            .select(selector)
            .filter_map(|el| el.value().attr(attr))
            .map(str::trim)
            .find(|value| !value.is_empty())
            .map(str::to_string)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_text_collapses_whitespace() {
        let doc = Html::parse_fragment("<p>  Hello \n <b>big</b>\tworld  </p>");
        let selector = Selector::parse("p").unwrap();
        let p = doc.select(&selector).next().unwrap();
        assert_eq!(element_text(&p), "Hello big world");
    }

    #[test]
    fn test_first_text_respects_selector_order() {
        let doc = Html::parse_document(
            r#"<html><body><h1>Fallback</h1><span class="main"> Primary </span></body></html>"#,
        );
        assert_eq!(first_text(&doc, &[".main", "h1"]), Some("Primary".to_string()));
        assert_eq!(first_text(&doc, &[".missing", "h1"]), Some("Fallback".to_string()));
        assert_eq!(first_text(&doc, &[".missing"]), None);
    }

    #[test]
    fn test_first_text_skips_empty_elements() {
        let doc = Html::parse_document(r#"<html><body><h1> </h1><h1>Second</h1></body></html>"#);
        assert_eq!(first_text(&doc, &["h1"]), Some("Second".to_string()));
    }

    #[test]
    fn test_first_attr() {
        let doc = Html::parse_document(
            r#"<html><head><meta property="og:title" content="From meta"></head></html>"#,
        );
        assert_eq!(
            first_attr(&doc, &[r#"meta[property="og:title"]"#], "content"),
            Some("From meta".to_string())
        );
    }

    #[test]
    fn test_invalid_selector_is_ignored() {
        let doc = Html::parse_document("<html><body><h1>Title</h1></body></html>");
        assert_eq!(first_text(&doc, &["[[[", "h1"]), Some("Title".to_string()));
    }
}
