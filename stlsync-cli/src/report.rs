/// Printing of import pass summaries
use clap::ValueEnum;
use crossterm::style::Stylize;
use serde_json::json;
use std::io::{self, Write};
use stlsync_core::SyncReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Write one pass summary in the requested format
pub fn print_report<W: Write>(out: &mut W, report: &SyncReport, format: OutputFormat) -> io::Result<()> {
    match format {
        OutputFormat::Text => {
            for failure in &report.failures {
                writeln!(out, "{} {}: {}", "failed".red(), failure.file, failure.error)?;
            }
            writeln!(out, "{} updated, {} created.", report.updated, report.created)?;
        }
        OutputFormat::Json => {
            let failures: Vec<_> = report
                .failures
                .iter()
                .map(|f| json!({ "file": f.file, "error": f.error.to_string() }))
                .collect();
            let value = json!({
                "updated": report.updated,
                "created": report.created,
                "failures": failures,
            });
            writeln!(out, "{value}")?;
        }
    }
    out.flush()
}
