//! Export traits and types
//!
//! This module defines the exporter interface, the export error type and the
//! run summary handed to the report writers.

use crate::model::ProductRecord;
use crate::state::{CrawlState, FailureKind, StopReason};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while writing an export file
///
/// Whatever the cause, a failed format is reported under the single kind
/// `write_failure`.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV serialization failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XLSX serialization failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("Failed to move export into place at {path}: {source}")]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl ExportError {
    /// Name used in log fields and summaries
    pub fn kind(&self) -> &'static str {
        "write_failure"
    }
}

/// Result type for export operations
pub type ExportResult<T> = Result<T, ExportError>;

/// A supported export format
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
    Xlsx,
}

impl ExportFormat {
    /// Conventional file extension, without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Xlsx => "xlsx",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Serializes a record collection into one file format
///
/// Rendering happens fully in memory; the caller decides where the bytes go.
/// Implementations must be deterministic: the same records always render to
/// the same bytes.
pub trait Exporter {
    /// The format this exporter produces
    fn format(&self) -> ExportFormat;

    /// Renders the records, in order, to the format's bytes
    ///
    /// # Arguments
    ///
    /// * `records` - The collected records, in crawl order
    fn render(&self, records: &[ProductRecord]) -> ExportResult<Vec<u8>>;
}

/// Summary of one harvest run
#[derive(Debug, Clone)]
pub struct RunSummary {
    // Run metadata
    pub query: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration: Duration,
    pub stop_reason: StopReason,
    pub interrupted: bool,

    // Crawl counters
    pub search_pages_visited: u32,
    pub listings_attempted: u64,
    pub listings_succeeded: u64,
    pub field_warnings: u64,

    // Failures by kind (listings and search pages)
    pub failures: BTreeMap<FailureKind, u64>,

    // Export outcome
    pub files_written: Vec<(ExportFormat, PathBuf)>,
    pub formats_failed: Vec<(ExportFormat, String)>,
    pub report_path: Option<PathBuf>,
}

impl RunSummary {
    /// Builds a summary from the final crawl state, before anything is exported
    pub fn from_state(
        query: &str,
        started_at: DateTime<Utc>,
        state: &CrawlState,
        stop_reason: StopReason,
        interrupted: bool,
    ) -> Self {
        Self {
            query: query.to_string(),
            started_at,
            finished_at: Utc::now(),
            duration: state.elapsed(),
            stop_reason,
            interrupted,
            search_pages_visited: state.search_pages_visited,
            listings_attempted: state.listings_attempted,
            listings_succeeded: state.listings_succeeded,
            field_warnings: state.field_warnings,
            failures: state.failures.clone(),
            files_written: Vec::new(),
            formats_failed: Vec::new(),
            report_path: None,
        }
    }

    /// Listings that did not produce a record
    pub fn listings_failed(&self) -> u64 {
        self.listings_attempted
            .saturating_sub(self.listings_succeeded)
    }

    /// Total failures across all kinds
    pub fn total_failures(&self) -> u64 {
        self.failures.values().sum()
    }

    /// Returns the listing success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.listings_attempted == 0 {
            return 0.0;
        }
        (self.listings_succeeded as f64 / self.listings_attempted as f64) * 100.0
    }
}
