//! Statistics over the collected records, and the console run summary
//!
//! This module provides functionality for summarizing the records of a run
//! and for printing the run summary at the end of a harvest.

use crate::model::ProductRecord;
use crate::output::traits::RunSummary;
use std::collections::BTreeMap;

/// How many listings the "top sellers" table shows
pub const TOP_SELLERS: usize = 10;

/// Price figures for one currency
#[derive(Debug, Clone, PartialEq)]
pub struct PriceStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Aggregate figures over a record collection
#[derive(Debug, Clone, Default)]
pub struct RecordStatistics {
    /// Number of records
    pub total_records: usize,

    /// Price figures keyed by currency code
    pub prices: BTreeMap<String, PriceStats>,

    /// Records per displayed condition; unknown conditions are not counted
    pub conditions: BTreeMap<String, usize>,

    /// Records without a price
    pub missing_price: usize,

    /// (title, url, quantity sold) for the best sellers, highest first
    pub top_sold: Vec<(String, String, u64)>,
}

impl RecordStatistics {
    /// Computes statistics from the collected records
    ///
    /// # Arguments
    ///
    /// * `records` - The records of the run
    pub fn from_records(records: &[ProductRecord]) -> Self {
        let mut per_currency: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        let mut conditions = BTreeMap::new();
        let mut missing_price = 0;

        for record in records {
            match &record.price {
                Some(price) => per_currency
                    .entry(price.currency.clone())
                    .or_default()
                    .push(price.amount),
                None => missing_price += 1,
            }
            if let Some(condition) = &record.condition {
                *conditions.entry(condition.clone()).or_insert(0) += 1;
            }
        }

        let prices = per_currency
            .into_iter()
            .map(|(currency, amounts)| {
                let count = amounts.len();
                let min = amounts.iter().copied().fold(f64::INFINITY, f64::min);
                let max = amounts.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let mean = amounts.iter().sum::<f64>() / count as f64;
                (currency, PriceStats { count, min, max, mean })
            })
            .collect();

        let mut sold: Vec<(String, String, u64)> = records
            .iter()
            .filter_map(|r| r.quantity_sold.map(|q| (r.title.clone(), r.url.clone(), q)))
            .collect();
        // Stable sort keeps crawl order among ties
        sold.sort_by(|a, b| b.2.cmp(&a.2));
        sold.truncate(TOP_SELLERS);

        Self {
            total_records: records.len(),
            prices,
            conditions,
            missing_price,
            top_sold: sold,
        }
    }
}

/// Prints the run summary to stdout in a formatted manner
///
/// # Arguments
///
/// * `summary` - The summary to display
pub fn print_summary(summary: &RunSummary) {
    println!("=== Harvest Summary ===\n");

    println!("Run:");
    println!("  Query: {}", summary.query);
    println!("  Started: {}", summary.started_at.to_rfc3339());
    println!("  Duration: {:.1}s", summary.duration.as_secs_f64());
    println!("  Stopped: {}", summary.stop_reason);
    if summary.interrupted {
        println!("  (interrupted, partial results)");
    }
    println!();

    println!("Listings:");
    println!("  Search pages visited: {}", summary.search_pages_visited);
    println!("  Attempted: {}", summary.listings_attempted);
    println!("  Succeeded: {}", summary.listings_succeeded);
    println!("  Failed: {}", summary.listings_failed());
    if summary.field_warnings > 0 {
        println!("  Field warnings: {}", summary.field_warnings);
    }
    println!();

    if !summary.failures.is_empty() {
        println!("Failures by Kind:");
        let mut failure_counts: Vec<_> = summary.failures.iter().collect();
        failure_counts.sort_by(|a, b| b.1.cmp(a.1));

        for (kind, count) in failure_counts {
            println!("  {}: {}", kind, count);
        }
        println!();
    }

    println!("Files Written ({}):", summary.files_written.len());
    for (format, path) in &summary.files_written {
        println!("  [{}] {}", format, path.display());
    }
    if let Some(report) = &summary.report_path {
        println!("  [report] {}", report.display());
    }
    for (format, reason) in &summary.formats_failed {
        println!("  [{}] FAILED: {}", format, reason);
    }
    println!();

    println!(
        "Success Rate: {:.1}% ({} / {} listings harvested)",
        summary.success_rate(),
        summary.listings_succeeded,
        summary.listings_attempted
    );
}
