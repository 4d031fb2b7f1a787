//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlState`: run-wide counters (pages, listings, failures by kind)
//! - `FailureKind`: the closed set of reasons a listing or page is skipped
//! - `CrawlPhase`: the pagination driver's state machine
//! - `StopReason`: why pagination ended

mod crawl_state;
mod failure_kind;
mod phase;

// Re-export main types
pub use crawl_state::CrawlState;
pub use failure_kind::FailureKind;
pub use phase::{CrawlPhase, StopReason};
