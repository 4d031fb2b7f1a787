//! Listing-Harvest: a polite product listing crawler
//!
//! This crate issues a search against a commerce listing site, walks the
//! paginated results, visits every listing it finds, extracts a structured
//! product record from each one and exports the collection as CSV, JSON
//! and/or XLSX.

pub mod config;
pub mod crawler;
pub mod model;
pub mod output;
pub mod robots;
pub mod state;
pub mod url;

use thiserror::Error;

use crate::state::{CrawlPhase, FailureKind};

/// Main error type for Listing-Harvest operations
///
/// Only a handful of these abort a run: the first search page being
/// unreachable, no output format being writable, or a startup problem.
/// Per-listing problems are reported through [`FetchError`] and
/// [`ParseError`] and never surface here.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("First search page {url} could not be fetched: {source}")]
    FirstPageUnreachable { url: String, source: FetchError },

    #[error("None of the {attempted} requested output format(s) could be written")]
    NothingWritten { attempted: usize },

    #[error("Invalid crawl transition: {from:?} -> {to:?}")]
    InvalidTransition { from: CrawlPhase, to: CrawlPhase },

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Failure to retrieve a page body
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("Request timeout for {url} after {attempts} attempt(s)")]
    Timeout { url: String, attempts: u32 },

    #[error("HTTP {status} for {url} after {attempts} attempt(s)")]
    HttpStatus {
        url: String,
        status: u16,
        attempts: u32,
    },

    #[error("Connection to {url} failed after {attempts} attempt(s): {message}")]
    Connection {
        url: String,
        message: String,
        attempts: u32,
    },

    #[error("Blocked at {url}: {reason}")]
    Blocked { url: String, reason: String },

    #[error("URL disallowed by robots.txt: {url}")]
    Disallowed { url: String },
}

impl FetchError {
    /// The failure kind used for counting and log fields
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::HttpStatus { .. } => FailureKind::HttpStatus,
            Self::Connection { .. } => FailureKind::Connection,
            Self::Blocked { .. } => FailureKind::Blocked,
            Self::Disallowed { .. } => FailureKind::Disallowed,
        }
    }

    /// The URL the failed request was made for
    pub fn url(&self) -> &str {
        match self {
            Self::Timeout { url, .. }
            | Self::HttpStatus { url, .. }
            | Self::Connection { url, .. }
            | Self::Blocked { url, .. }
            | Self::Disallowed { url } => url,
        }
    }
}

/// Failure to turn a listing page body into a record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Required field '{field}' not found on {url}")]
    MissingRequiredField { url: String, field: &'static str },

    #[error("Empty page body for {url}")]
    EmptyBody { url: String },

    #[error("Malformed '{field}' on {url}: {value:?}")]
    MalformedField {
        url: String,
        field: &'static str,
        value: String,
    },
}

impl ParseError {
    /// The failure kind used for counting and log fields
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::MissingRequiredField { .. } => FailureKind::MissingRequiredField,
            Self::EmptyBody { .. } => FailureKind::EmptyBody,
            Self::MalformedField { .. } => FailureKind::MalformedField,
        }
    }
}

/// Result type alias for Listing-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use model::{ListingSummary, Price, ProductRecord, SearchQuery};
pub use output::{ExportError, ExportFormat};
pub use state::CrawlState;
