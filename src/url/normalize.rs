use regex::Regex;
use std::sync::OnceLock;
use url::Url;

/// Listing path: `/itm/<id>` or `/itm/<slug>/<id>`
fn listing_path_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^/itm/(?:[^/?#]+/)?(\d+)/?$").expect("valid listing path pattern"))
}

/// Reduces a listing link to its canonical form
///
/// # Canonicalization Steps
///
/// 1. Accept only paths shaped like `/itm/<id>` or `/itm/<slug>/<id>`
/// 2. Drop the slug, the query string (tracking `hash=`, `epid=`, ...) and the fragment
/// 3. Keep the scheme, host and port of the link itself
///
/// # Arguments
///
/// * `url` - An absolute link, already resolved against its page
///
/// # Returns
///
/// * `Some((canonical_url, item_id))` - The link points at a listing
/// * `None` - The link is not a listing link
///
/// # Examples
///
/// ```
/// use listing_harvest::url::canonical_listing_url;
/// use url::Url;
///
/// let link = Url::parse("https://www.ebay.com/itm/Vintage-Lamp/2045551234?hash=item2f&_trkparms=x#rpdCntId").unwrap();
/// let (url, id) = canonical_listing_url(&link).unwrap();
/// assert_eq!(url, "https://www.ebay.com/itm/2045551234");
/// assert_eq!(id, "2045551234");
/// ```
pub fn canonical_listing_url(url: &Url) -> Option<(String, String)> {
    let id = item_id_from_path(url.path())?;

    let mut canonical = url.clone();
    canonical.set_path(&format!("/itm/{}", id));
    canonical.set_query(None);
    canonical.set_fragment(None);

    Some((canonical.to_string(), id))
}

/// Extracts the numeric item id from a listing URL string
pub fn item_id_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    item_id_from_path(parsed.path())
}

fn item_id_from_path(path: &str) -> Option<String> {
    listing_path_regex()
        .captures(path)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Normalizes an image source attribute into an absolute URL string
///
/// Protocol-relative sources (`//i.ebayimg.com/...`) get the page's scheme;
/// relative sources are joined onto the page URL.
pub fn normalize_image_url(src: &str, page_url: &Url) -> Option<String> {
    let src = src.trim();
    if src.is_empty() || src.starts_with("data:") {
        return None;
    }

    let absolute = if let Some(rest) = src.strip_prefix("//") {
        Url::parse(&format!("{}://{}", page_url.scheme(), rest)).ok()?
    } else {
        page_url.join(src).ok()?
    };

    match absolute.scheme() {
        "http" | "https" => Some(absolute.to_string()),
        _ => None,
    }
}
