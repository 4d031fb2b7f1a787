//! Robots.txt handling module
//!
//! When enabled, robots.txt is fetched once per run from the search origin,
//! through the same fetcher (and therefore the same pacing) as every other
//! request.

mod parser;

pub use parser::ParsedRobots;

use crate::crawler::Fetcher;
use crate::FetchError;
use url::Url;

/// Product token matched against `User-agent` groups
pub const ROBOTS_AGENT: &str = "listing-harvest";

/// Fetches robots.txt for the origin of `site`
///
/// A missing file (any 4xx) allows everything. Any other failure is logged
/// and also treated as allow-all; robots.txt never aborts a run.
///
/// # Arguments
///
/// * `fetcher` - The run's fetcher
/// * `site` - Any URL on the site
pub async fn fetch_robots(fetcher: &mut Fetcher, site: &Url) -> ParsedRobots {
    let robots_url = match site.join("/robots.txt") {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!("Cannot build robots.txt URL for {}: {}", site, e);
            return ParsedRobots::allow_all();
        }
    };

    match fetcher.fetch(robots_url.as_str()).await {
        Ok(page) => {
            tracing::info!("Loaded robots.txt from {} ({} bytes)", robots_url, page.body.len());
            ParsedRobots::from_content(&page.body)
        }
        Err(FetchError::HttpStatus { status, .. }) if (400..500).contains(&status) => {
            tracing::info!("No robots.txt at {} (HTTP {}), allowing all", robots_url, status);
            ParsedRobots::allow_all()
        }
        Err(e) => {
            tracing::warn!("Could not fetch robots.txt: {}; allowing all", e);
            ParsedRobots::allow_all()
        }
    }
}

/// Checks if a URL may be fetched under `robots`
pub fn is_allowed(robots: &ParsedRobots, url: &str) -> bool {
    robots.is_allowed(url, ROBOTS_AGENT)
}
