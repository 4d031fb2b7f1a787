//! Crawler coordinator - pagination driver and run orchestration
//!
//! This module contains the main crawl loop that coordinates all aspects of
//! a harvest, including:
//! - Walking the search result pages up to the page limit
//! - Fetching and parsing every listing found on them
//! - Recording per-listing failures without stopping the run
//! - Handling interrupts
//! - Exporting the collected records and reporting on the run

use crate::config::Config;
use crate::crawler::fetcher::{FetchedPage, Fetcher};
use crate::crawler::parser::{parse_listing_page, parse_search_page, SearchPage};
use crate::crawler::shutdown::ShutdownSignal;
use crate::model::{ListingSummary, ProductRecord, SearchQuery};
use crate::output::{report_path, write_exports, write_markdown_report, RunSummary};
use crate::robots::{self, ParsedRobots, ROBOTS_AGENT};
use crate::state::{CrawlPhase, CrawlState, StopReason};
use crate::{FetchError, HarvestError, Result};
use chrono::Utc;
use std::collections::HashSet;
use url::Url;

/// What a finished crawl hands over to the exporters
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    /// Records in the order their listings were visited
    pub records: Vec<ProductRecord>,

    /// Final counters
    pub state: CrawlState,

    /// Why pagination ended
    pub stop_reason: StopReason,

    /// Whether the run was cut short by an interrupt
    pub interrupted: bool,
}

enum SearchStep {
    Page(SearchPage),
    Failed,
    Interrupted,
}

enum ListingStep {
    Done,
    Interrupted,
}

/// Main crawler coordinator structure
///
/// Drives one search from its first results page to the end, one request at
/// a time. Per-listing problems are counted in the [`CrawlState`] and
/// skipped; only an unreachable first page ends the run with an error.
pub struct Coordinator {
    config: Config,
    query: SearchQuery,
    fetcher: Fetcher,
    shutdown: ShutdownSignal,
    phase: CrawlPhase,
    state: CrawlState,
    records: Vec<ProductRecord>,
    robots: Option<ParsedRobots>,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    /// * `query` - The search to run
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(HarvestError)` - The HTTP client could not be built
    pub fn new(config: Config, query: SearchQuery) -> Result<Self> {
        let fetcher = Fetcher::new(&config)?;
        Ok(Self {
            config,
            query,
            fetcher,
            shutdown: ShutdownSignal::never(),
            phase: CrawlPhase::Start,
            state: CrawlState::new(),
            records: Vec::new(),
            robots: None,
        })
    }

    /// Stops the crawl early when `shutdown` fires
    pub fn with_shutdown(mut self, shutdown: ShutdownSignal) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// The search being run
    pub fn query(&self) -> &SearchQuery {
        &self.query
    }

    /// Current driver phase
    pub fn phase(&self) -> CrawlPhase {
        self.phase
    }

    /// Runs the pagination loop to completion
    ///
    /// 1. Builds the first search URL (and loads robots.txt if enabled)
    /// 2. Fetches a search page and collects its listing links
    /// 3. Fetches and parses every listing not seen before
    /// 4. Follows the "next" link until a limit, the last page, a failed
    ///    search page or an interrupt stops it
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlOutcome)` - Whatever was collected, possibly nothing
    /// * `Err(HarvestError)` - The first search page could not be fetched
    pub async fn run(&mut self) -> Result<CrawlOutcome> {
        let base = Url::parse(&self.config.search.base_url)?;
        let first_url = self
            .query
            .first_page_url(&base, &self.config.search.search_path)?;

        tracing::info!(
            "Starting harvest for {:?} at {} (max {} page(s))",
            self.query.terms(),
            first_url,
            self.query.max_pages()
        );

        if self.config.crawler.respect_robots_txt {
            self.load_robots(&first_url).await;
        }

        let max_pages = self.query.max_pages();
        let mut next_page = Some(first_url.to_string());
        let mut visited_pages: HashSet<String> = HashSet::new();
        let mut seen_listings: HashSet<String> = HashSet::new();
        let mut page_number = 0u32;

        let stop_reason = 'pages: loop {
            let Some(page_url) = next_page.take() else {
                break StopReason::EndOfResults;
            };
            if page_number >= max_pages {
                break StopReason::PageLimit;
            }
            if self.listing_limit_reached() {
                break StopReason::ListingLimit;
            }
            if !visited_pages.insert(page_url.clone()) {
                tracing::warn!(url = %page_url, "Next link points at a page already visited");
                break StopReason::PaginationLoop;
            }

            self.transition(CrawlPhase::FetchSearchPage)?;
            page_number += 1;

            let page = match self.fetch_search_page(&page_url, page_number).await? {
                SearchStep::Page(page) => page,
                SearchStep::Failed => break StopReason::SearchPageFailed,
                SearchStep::Interrupted => break StopReason::Interrupted,
            };

            for listing in &page.listings {
                if !seen_listings.insert(listing.url.clone()) {
                    tracing::debug!("Skipping {} (already seen on an earlier page)", listing.url);
                    continue;
                }
                if self.listing_limit_reached() {
                    break 'pages StopReason::ListingLimit;
                }

                self.transition(CrawlPhase::FetchListing)?;
                if let ListingStep::Interrupted = self.harvest_listing(listing).await {
                    break 'pages StopReason::Interrupted;
                }
            }

            next_page = page.next_page_url;
        };

        self.transition(CrawlPhase::Done)?;

        tracing::info!(
            "Crawl finished ({}): {} search page(s), {} listing(s) attempted, {} succeeded in {:?}",
            stop_reason,
            self.state.search_pages_visited,
            self.state.listings_attempted,
            self.state.listings_succeeded,
            self.state.elapsed()
        );

        Ok(CrawlOutcome {
            records: std::mem::take(&mut self.records),
            state: self.state.clone(),
            stop_reason,
            interrupted: stop_reason == StopReason::Interrupted,
        })
    }

    fn transition(&mut self, next: CrawlPhase) -> Result<()> {
        if !self.phase.can_transition_to(next) {
            return Err(HarvestError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        tracing::trace!("Phase {} -> {}", self.phase, next);
        self.phase = next;
        Ok(())
    }

    fn listing_limit_reached(&self) -> bool {
        self.config
            .crawler
            .max_listings
            .is_some_and(|max| self.state.listings_attempted >= max)
    }

    async fn load_robots(&mut self, site: &Url) {
        let parsed = robots::fetch_robots(&mut self.fetcher, site).await;
        if let Some(delay) = parsed.crawl_delay(ROBOTS_AGENT) {
            let limiter = self.fetcher.limiter_mut();
            if delay > limiter.floor() {
                tracing::info!("robots.txt asks for a crawl delay of {:?}", delay);
                limiter.raise_floor(delay);
            }
        }
        self.robots = Some(parsed);
    }

    fn disallowed(&self, url: &str) -> bool {
        self.robots
            .as_ref()
            .is_some_and(|parsed| !robots::is_allowed(parsed, url))
    }

    /// Fetches through the shared fetcher unless shutdown fires first
    async fn fetch_or_interrupt(&mut self, url: &str) -> Option<std::result::Result<FetchedPage, FetchError>> {
        if self.shutdown.is_triggered() {
            return None;
        }

        let mut shutdown = self.shutdown.clone();
        tokio::select! {
            result = self.fetcher.fetch(url) => Some(result),
            _ = shutdown.triggered() => None,
        }
    }

    async fn fetch_search_page(&mut self, url: &str, page_number: u32) -> Result<SearchStep> {
        let result = if self.disallowed(url) {
            Err(FetchError::Disallowed {
                url: url.to_string(),
            })
        } else {
            match self.fetch_or_interrupt(url).await {
                Some(result) => result,
                None => return Ok(SearchStep::Interrupted),
            }
        };

        let fetched = match result {
            Ok(fetched) => fetched,
            Err(e) if page_number == 1 => {
                tracing::error!(url = %url, kind = %e.kind(), "First search page unreachable: {}", e);
                return Err(HarvestError::FirstPageUnreachable {
                    url: url.to_string(),
                    source: e,
                });
            }
            Err(e) => {
                tracing::warn!(
                    url = %url,
                    kind = %e.kind(),
                    page = page_number,
                    "Search page failed, stopping pagination: {}",
                    e
                );
                self.state.record_failure(e.kind());
                return Ok(SearchStep::Failed);
            }
        };

        self.state.record_search_page();
        let page = parse_search_page(&fetched.body, &fetched.final_url);
        tracing::info!(
            "Search page {} yielded {} listing(s){}",
            page_number,
            page.listings.len(),
            if page.next_page_url.is_some() { "" } else { ", no next page" }
        );

        Ok(SearchStep::Page(page))
    }

    async fn harvest_listing(&mut self, listing: &ListingSummary) -> ListingStep {
        if self.disallowed(&listing.url) {
            let e = FetchError::Disallowed {
                url: listing.url.clone(),
            };
            tracing::warn!(url = %listing.url, kind = %e.kind(), "Skipping listing: {}", e);
            self.state.record_listing_attempt();
            self.state.record_failure(e.kind());
            return ListingStep::Done;
        }

        let result = match self.fetch_or_interrupt(&listing.url).await {
            Some(result) => result,
            None => return ListingStep::Interrupted,
        };
        self.state.record_listing_attempt();

        let fetched = match result {
            Ok(fetched) => fetched,
            Err(e) => {
                tracing::warn!(url = %listing.url, kind = %e.kind(), "Listing fetch failed: {}", e);
                self.state.record_failure(e.kind());
                return ListingStep::Done;
            }
        };

        match parse_listing_page(&fetched.body, &listing.url) {
            Ok(extraction) => {
                for warning in &extraction.warnings {
                    tracing::warn!(
                        url = %listing.url,
                        kind = %warning.kind(),
                        "Dropped unreadable field: {}",
                        warning
                    );
                    self.state.record_field_warning();
                }
                tracing::debug!("Harvested {}: {}", listing.item_id, extraction.record.title);
                self.records.push(extraction.record);
                self.state.record_success();
            }
            Err(e) => {
                tracing::warn!(url = %listing.url, kind = %e.kind(), "Listing skipped: {}", e);
                self.state.record_failure(e.kind());
            }
        }

        ListingStep::Done
    }
}

/// Runs a complete harvest: crawl, export and report
///
/// Whatever was collected is exported, including after an interrupt or a
/// failed search page.
///
/// # Arguments
///
/// * `config` - Validated configuration
/// * `query` - The search to run
/// * `shutdown` - Interrupt signal
///
/// # Returns
///
/// * `Ok(RunSummary)` - At least one requested format was written
/// * `Err(HarvestError)` - First page unreachable, or no format written
///
/// # Example
///
/// ```no_run
/// use listing_harvest::config::Config;
/// use listing_harvest::crawler::{harvest, ShutdownSignal};
/// use listing_harvest::model::SearchQuery;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config::default();
/// let query = SearchQuery::new("desk lamp", 2)?;
/// let summary = harvest(&config, query, ShutdownSignal::on_ctrl_c()).await?;
/// println!("{} records", summary.listings_succeeded);
/// # Ok(())
/// # }
/// ```
pub async fn harvest(config: &Config, query: SearchQuery, shutdown: ShutdownSignal) -> Result<RunSummary> {
    let started_at = Utc::now();
    let mut coordinator = Coordinator::new(config.clone(), query)?.with_shutdown(shutdown);
    let outcome = coordinator.run().await?;

    let mut summary = RunSummary::from_state(
        coordinator.query().terms(),
        started_at,
        &outcome.state,
        outcome.stop_reason,
        outcome.interrupted,
    );

    let base = config.output.base_path();
    let report = write_exports(&outcome.records, &config.output.formats, &base);
    let attempted = report.attempted();
    let nothing_written = report.nothing_written();

    summary.files_written = report.written;
    summary.formats_failed = report
        .failed
        .iter()
        .map(|(format, e)| (*format, e.to_string()))
        .collect();

    if nothing_written {
        return Err(HarvestError::NothingWritten { attempted });
    }

    if config.output.summary_report {
        let path = report_path(&base);
        match write_markdown_report(&summary, &outcome.records, &path) {
            Ok(()) => {
                tracing::info!("Wrote summary report to {}", path.display());
                summary.report_path = Some(path);
            }
            Err(e) => tracing::warn!(kind = e.kind(), "Summary report not written: {}", e),
        }
    }

    Ok(summary)
}
