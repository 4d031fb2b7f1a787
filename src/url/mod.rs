//! URL handling module for Listing-Harvest
//!
//! This module resolves links found in page markup, reduces listing links to
//! their canonical form and decides whether a link stays on the target site.

mod normalize;

use url::Url;

pub use normalize::{canonical_listing_url, item_id_from_url, normalize_image_url};

/// Resolves a link href against the page it was found on
///
/// Returns None if the link should be excluded:
/// - empty hrefs and fragment-only anchors
/// - javascript:, mailto:, tel: and data: schemes
/// - invalid URLs
/// - non-HTTP(S) URLs after resolution
///
/// # Example
///
/// ```
/// use listing_harvest::url::resolve_link;
/// use url::Url;
///
/// let base = Url::parse("https://www.ebay.com/sch/i.html?_nkw=lamp").unwrap();
/// let link = resolve_link("/itm/123", &base).unwrap();
/// assert_eq!(link.as_str(), "https://www.ebay.com/itm/123");
/// assert!(resolve_link("javascript:void(0)", &base).is_none());
/// ```
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    if absolute.scheme() == "http" || absolute.scheme() == "https" {
        Some(absolute)
    } else {
        None
    }
}

/// Lowercased host without a leading `www.`
pub fn site_host(url: &Url) -> Option<String> {
    url.host_str().map(|h| {
        let host = h.to_lowercase();
        match host.strip_prefix("www.") {
            Some(stripped) => stripped.to_string(),
            None => host,
        }
    })
}

/// Returns true if both URLs point at the same site
///
/// Hosts are compared case-insensitively with any `www.` prefix ignored;
/// ports must match too, so a mock server on another port is another site.
pub fn same_site(a: &Url, b: &Url) -> bool {
    match (site_host(a), site_host(b)) {
        (Some(ha), Some(hb)) => ha == hb && a.port_or_known_default() == b.port_or_known_default(),
        _ => false,
    }
}
