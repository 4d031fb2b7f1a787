//! Pagination driver phases
//!
//! `Start → FetchSearchPage → FetchListing* → FetchSearchPage → … → Done`

use std::fmt;

/// Where the pagination driver currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    /// Nothing fetched yet
    Start,

    /// Fetching and parsing a search results page
    FetchSearchPage,

    /// Fetching and parsing one listing
    FetchListing,

    /// Pagination finished; nothing more will be fetched
    Done,
}

impl CrawlPhase {
    /// Returns true if the driver may move from `self` to `next`
    pub fn can_transition_to(&self, next: CrawlPhase) -> bool {
        use CrawlPhase::*;
        match (self, next) {
            (Done, _) => false,
            (_, Done) => true,
            (Start, FetchSearchPage) => true,
            (FetchSearchPage, FetchSearchPage | FetchListing) => true,
            (FetchListing, FetchListing | FetchSearchPage) => true,
            _ => false,
        }
    }

    /// Returns true once pagination has finished
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::FetchSearchPage => "fetch_search_page",
            Self::FetchListing => "fetch_listing",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why pagination stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopReason {
    /// The last search page had no "next" link
    EndOfResults,

    /// The configured page limit was reached
    PageLimit,

    /// The configured listing limit was reached
    ListingLimit,

    /// A search page after the first could not be fetched
    SearchPageFailed,

    /// The "next" link pointed at a page already visited
    PaginationLoop,

    /// The process received an interrupt
    Interrupted,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EndOfResults => "end of results",
            Self::PageLimit => "page limit reached",
            Self::ListingLimit => "listing limit reached",
            Self::SearchPageFailed => "search page failed",
            Self::PaginationLoop => "pagination loop detected",
            Self::Interrupted => "interrupted",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
