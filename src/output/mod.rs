//! Output module for exporting records and reporting on a run
//!
//! This module handles:
//! - Writing the collected records as CSV, JSON and/or XLSX
//! - Printing the run summary to the console
//! - Writing the optional markdown summary report
//!
//! Every format is rendered in memory, written to a temporary file in the
//! output directory and renamed over the destination. A failing format
//! leaves no partial file behind and does not stop the other formats.

mod csv_output;
pub mod flatten;
mod json_output;
mod markdown;
pub mod stats;
mod traits;
mod xlsx_output;

pub use csv_output::{read_csv, CsvExporter};
pub use json_output::{read_json, JsonExporter};
pub use markdown::{format_markdown_report, report_path, write_markdown_report};
pub use stats::{print_summary, RecordStatistics};
pub use traits::{ExportError, ExportFormat, ExportResult, Exporter, RunSummary};
pub use xlsx_output::XlsxExporter;

use crate::model::ProductRecord;
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Outcome of writing every requested format
#[derive(Debug, Default)]
pub struct ExportReport {
    /// Formats written, with their file paths
    pub written: Vec<(ExportFormat, PathBuf)>,

    /// Formats that failed, with the reason
    pub failed: Vec<(ExportFormat, ExportError)>,
}

impl ExportReport {
    /// Returns true if formats were requested and none could be written
    pub fn nothing_written(&self) -> bool {
        self.written.is_empty() && !self.failed.is_empty()
    }

    /// Number of distinct formats attempted
    pub fn attempted(&self) -> usize {
        self.written.len() + self.failed.len()
    }
}

/// Returns the exporter for a format
pub fn exporter_for(format: ExportFormat) -> Box<dyn Exporter> {
    match format {
        ExportFormat::Csv => Box::new(CsvExporter),
        ExportFormat::Json => Box::new(JsonExporter),
        ExportFormat::Xlsx => Box::new(XlsxExporter),
    }
}

/// File path for a format: the base path plus the format's extension
///
/// The extension is appended, never substituted, so a prefix containing a
/// dot keeps it.
pub fn output_path(base: &Path, format: ExportFormat) -> PathBuf {
    let mut name: OsString = base.as_os_str().to_owned();
    name.push(".");
    name.push(format.extension());
    PathBuf::from(name)
}

/// Writes the records in every requested format
///
/// Formats are attempted in the order given, each at most once. A format
/// that fails is logged and recorded in the report; the others are still
/// attempted.
///
/// # Arguments
///
/// * `records` - The collected records, in crawl order
/// * `formats` - Formats to write
/// * `base` - Output directory joined with the file prefix
///
/// # Example
///
/// ```no_run
/// use listing_harvest::output::{write_exports, ExportFormat};
/// use std::path::Path;
///
/// let report = write_exports(&[], &[ExportFormat::Csv], Path::new("output/listings"));
/// assert_eq!(report.written.len(), 1);
/// ```
pub fn write_exports(records: &[ProductRecord], formats: &[ExportFormat], base: &Path) -> ExportReport {
    let mut report = ExportReport::default();
    let mut seen = Vec::with_capacity(formats.len());

    for &format in formats {
        if seen.contains(&format) {
            continue;
        }
        seen.push(format);

        let path = output_path(base, format);
        let result = exporter_for(format)
            .render(records)
            .and_then(|bytes| write_atomic(&path, &bytes));

        match result {
            Ok(()) => {
                tracing::info!("Wrote {} record(s) to {}", records.len(), path.display());
                report.written.push((format, path));
            }
            Err(e) => {
                tracing::error!(
                    format = %format,
                    path = %path.display(),
                    kind = e.kind(),
                    "Export failed: {}",
                    e
                );
                report.failed.push((format, e));
            }
        }
    }

    report
}

/// Writes bytes to `path` through a temporary file in the same directory
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> ExportResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)?;

    let mut tmp = NamedTempFile::new_in(&dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| ExportError::Persist {
        path: path.to_path_buf(),
        source: e.error,
    })?;

    Ok(())
}
