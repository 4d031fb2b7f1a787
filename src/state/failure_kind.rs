//! Failure kinds recorded while crawling
//!
//! Every listing or page that does not end up as a record is counted under
//! exactly one of these kinds.

use std::fmt;

/// Classifies why a page or listing was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FailureKind {
    // ===== Fetch Failures =====
    /// The request timed out on every attempt
    Timeout,

    /// The server answered with a non-success status
    HttpStatus,

    /// The connection could not be established or was dropped
    Connection,

    /// The response was a rate-limit status or a challenge page
    Blocked,

    /// robots.txt forbids the URL
    Disallowed,

    // ===== Parse Failures =====
    /// The listing had no title
    MissingRequiredField,

    /// The page body was structurally empty
    EmptyBody,

    /// A field was present but could not be normalized
    MalformedField,
}

impl FailureKind {
    /// Returns true if the failure happened before a body was obtained
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::HttpStatus | Self::Connection | Self::Blocked | Self::Disallowed
        )
    }

    /// Returns true if the failure happened while extracting fields
    pub fn is_parse_failure(&self) -> bool {
        !self.is_fetch_failure()
    }

    /// Snake-case name used in log fields and summaries
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::HttpStatus => "http_status",
            Self::Connection => "connection",
            Self::Blocked => "blocked",
            Self::Disallowed => "disallowed",
            Self::MissingRequiredField => "missing_required_field",
            Self::EmptyBody => "empty_body",
            Self::MalformedField => "malformed_field",
        }
    }

    /// Parses a failure kind from its snake-case name
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "timeout" => Some(Self::Timeout),
            "http_status" => Some(Self::HttpStatus),
            "connection" => Some(Self::Connection),
            "blocked" => Some(Self::Blocked),
            "disallowed" => Some(Self::Disallowed),
            "missing_required_field" => Some(Self::MissingRequiredField),
            "empty_body" => Some(Self::EmptyBody),
            "malformed_field" => Some(Self::MalformedField),
            _ => None,
        }
    }

    /// Returns all failure kinds
    pub fn all() -> Vec<Self> {
        vec![
            Self::Timeout,
            Self::HttpStatus,
            Self::Connection,
            Self::Blocked,
            Self::Disallowed,
            Self::MissingRequiredField,
            Self::EmptyBody,
            Self::MalformedField,
        ]
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
