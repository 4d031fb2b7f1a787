//! Crawler module for searching, fetching and extracting listings
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with pacing, retry and block detection
//! - Search result and listing page parsing
//! - The pagination driver and run orchestration
//! - Interrupt handling

mod coordinator;
mod fetcher;
mod parser;
mod rate_limiter;
mod shutdown;
mod user_agents;

pub use coordinator::{harvest, Coordinator, CrawlOutcome};
pub use fetcher::{build_http_client, detect_challenge_page, FetchedPage, Fetcher, RetryPolicy};
pub use parser::{
    parse_listing_page, parse_search_page, ListingExtraction, SearchPage, MAX_DESCRIPTION_CHARS,
};
pub use rate_limiter::{DelayPolicy, RateLimiter};
pub use shutdown::{shutdown_channel, ShutdownSignal, ShutdownTrigger};
pub use user_agents::UserAgentPool;
