//! Markdown summary report
//!
//! This module generates a human-readable report of a harvest run: counters,
//! failures, price statistics, condition distribution and best sellers.

use crate::model::ProductRecord;
use crate::output::stats::RecordStatistics;
use crate::output::traits::{ExportResult, RunSummary};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Path of the report for an output base path (`<base>_summary.md`)
pub fn report_path(base: &Path) -> PathBuf {
    let mut name: OsString = base.as_os_str().to_owned();
    name.push("_summary.md");
    PathBuf::from(name)
}

/// Writes the markdown report next to the exports
///
/// # Arguments
///
/// * `summary` - The run summary (exports already recorded in it)
/// * `records` - The records of the run
/// * `path` - Where the report should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote the report
/// * `Err(ExportError)` - Failed to write the report
pub fn write_markdown_report(
    summary: &RunSummary,
    records: &[ProductRecord],
    path: &Path,
) -> ExportResult<()> {
    let stats = RecordStatistics::from_records(records);
    let markdown = format_markdown_report(summary, &stats);
    super::write_atomic(path, markdown.as_bytes())
}

/// Formats a run summary and record statistics as markdown
pub fn format_markdown_report(summary: &RunSummary, stats: &RecordStatistics) -> String {
    let mut md = String::new();

    md.push_str("# Listing Harvest Summary\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Query**: {}\n", summary.query));
    md.push_str(&format!("- **Started**: {}\n", summary.started_at.to_rfc3339()));
    md.push_str(&format!("- **Finished**: {}\n", summary.finished_at.to_rfc3339()));
    md.push_str(&format!(
        "- **Duration**: {:.1} seconds\n",
        summary.duration.as_secs_f64()
    ));
    md.push_str(&format!("- **Stopped**: {}\n", summary.stop_reason));
    if summary.interrupted {
        md.push_str("- **Interrupted**: yes (partial results)\n");
    }
    md.push('\n');

    // Counters
    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!(
        "- **Search Pages Visited**: {}\n",
        summary.search_pages_visited
    ));
    md.push_str(&format!(
        "- **Listings Attempted**: {}\n",
        summary.listings_attempted
    ));
    md.push_str(&format!(
        "- **Listings Succeeded**: {}\n",
        summary.listings_succeeded
    ));
    md.push_str(&format!("- **Listings Failed**: {}\n", summary.listings_failed()));
    md.push_str(&format!("- **Field Warnings**: {}\n", summary.field_warnings));
    md.push_str(&format!(
        "- **Success Rate**: {:.2}%\n\n",
        summary.success_rate()
    ));

    if !summary.failures.is_empty() {
        md.push_str("## Failures by Kind\n\n");
        md.push_str("| Kind | Count |\n");
        md.push_str("|------|-------|\n");
        for (kind, count) in &summary.failures {
            md.push_str(&format!("| {} | {} |\n", kind, count));
        }
        md.push('\n');
    }

    if !stats.prices.is_empty() {
        md.push_str("## Prices\n\n");
        md.push_str("| Currency | Listings | Min | Max | Mean |\n");
        md.push_str("|----------|----------|-----|-----|------|\n");
        for (currency, price) in &stats.prices {
            md.push_str(&format!(
                "| {} | {} | {:.2} | {:.2} | {:.2} |\n",
                currency, price.count, price.min, price.max, price.mean
            ));
        }
        if stats.missing_price > 0 {
            md.push_str(&format!("\n{} listing(s) had no price.\n", stats.missing_price));
        }
        md.push('\n');
    }

    if !stats.conditions.is_empty() {
        md.push_str("## Conditions\n\n");
        md.push_str("| Condition | Listings |\n");
        md.push_str("|-----------|----------|\n");

        let mut conditions: Vec<_> = stats.conditions.iter().collect();
        conditions.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (condition, count) in conditions {
            md.push_str(&format!("| {} | {} |\n", escape_cell(condition), count));
        }
        md.push('\n');
    }

    if !stats.top_sold.is_empty() {
        md.push_str(&format!("## Top {} by Quantity Sold\n\n", stats.top_sold.len()));
        md.push_str("| Title | Sold |\n");
        md.push_str("|-------|------|\n");
        for (title, url, sold) in &stats.top_sold {
            md.push_str(&format!("| [{}]({}) | {} |\n", escape_cell(title), url, sold));
        }
        md.push('\n');
    }

    md.push_str("## Files Written\n\n");
    if summary.files_written.is_empty() {
        md.push_str("None.\n");
    }
    for (format, path) in &summary.files_written {
        md.push_str(&format!("- {}: `{}`\n", format, path.display()));
    }
    for (format, reason) in &summary.formats_failed {
        md.push_str(&format!("- {}: **failed** ({})\n", format, reason));
    }

    md
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
        .replace('[', "\\[")
        .replace(']', "\\]")
}
