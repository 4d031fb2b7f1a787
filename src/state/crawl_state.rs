use crate::state::FailureKind;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Process-wide counters for one crawl run
///
/// Only the single crawl flow touches this, so it is a plain struct owned by
/// the coordinator and handed to the summary at the end.
#[derive(Debug, Clone)]
pub struct CrawlState {
    /// Search result pages successfully fetched
    pub search_pages_visited: u32,

    /// Listings whose fetch completed or was refused (an interrupted fetch does not count)
    pub listings_attempted: u64,

    /// Listings that produced a record
    pub listings_succeeded: u64,

    /// Failed listings and search pages, by kind
    pub failures: BTreeMap<FailureKind, u64>,

    /// Optional fields that were present but unusable (record still kept)
    pub field_warnings: u64,

    /// When the run started
    pub started_at: Instant,
}

impl CrawlState {
    /// Creates an empty state with the clock started now
    pub fn new() -> Self {
        Self {
            search_pages_visited: 0,
            listings_attempted: 0,
            listings_succeeded: 0,
            failures: BTreeMap::new(),
            field_warnings: 0,
            started_at: Instant::now(),
        }
    }

    /// Records a fetched search page
    pub fn record_search_page(&mut self) {
        self.search_pages_visited += 1;
    }

    /// Records a listing attempt
    pub fn record_listing_attempt(&mut self) {
        self.listings_attempted += 1;
    }

    /// Records a listing that became a record
    pub fn record_success(&mut self) {
        self.listings_succeeded += 1;
    }

    /// Records a failure of the given kind
    pub fn record_failure(&mut self, kind: FailureKind) {
        *self.failures.entry(kind).or_insert(0) += 1;
    }

    /// Records a field that had to be dropped from an otherwise valid record
    pub fn record_field_warning(&mut self) {
        self.field_warnings += 1;
    }

    /// Listings that were attempted but did not produce a record
    pub fn listings_failed(&self) -> u64 {
        self.listings_attempted
            .saturating_sub(self.listings_succeeded)
    }

    /// Number of failures recorded for a kind
    pub fn failures_of(&self, kind: FailureKind) -> u64 {
        self.failures.get(&kind).copied().unwrap_or(0)
    }

    /// Total failures across all kinds (listings and search pages)
    pub fn total_failures(&self) -> u64 {
        self.failures.values().sum()
    }

    /// Time since the run started
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl Default for CrawlState {
    fn default() -> Self {
        Self::new()
    }
}
