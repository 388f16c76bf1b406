//! Terminal progress and summary output
//!
//! Renders [`Progress`](crate::pipeline::Progress) changes with an indicatif
//! bar and prints the run header and summary.

use crate::pipeline::{IngestResult, ProgressListener, ProgressSnapshot};
use console::style;
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress bar that follows the pipeline's progress counters
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);

        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {pos}/{len} files | {msg}")
                .expect("Invalid progress template")
                .progress_chars("=> ")
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Finish the progress display with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    /// Finish and clear the progress display
    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressListener for ProgressReporter {
    fn on_progress(&self, snapshot: &ProgressSnapshot) {
        self.bar.set_length(snapshot.maximum);
        self.bar.set_position(snapshot.current);
        self.bar.set_message(snapshot.status.clone());
    }
}

/// Format a number with thousands separators
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| {
            chunk
                .iter()
                .rev()
                .map(|&b| b as char)
                .collect::<String>()
        })
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

/// Print a summary of the run
pub fn print_summary(result: &IngestResult, db_path: Option<&str>, db_size: Option<u64>) {
    let duration_secs = result.duration.as_secs_f64();

    println!();
    if result.is_complete() {
        println!("{}", style("Ingest Complete").green().bold());
    } else {
        println!("{}", style("Ingest Completed With Failures").yellow().bold());
    }
    println!("{}", style("─".repeat(50)).dim());
    println!(
        "  {} {} ({} from links)",
        style("Time zones:").bold(),
        format_number(result.time_zones),
        format_number(result.links_resolved)
    );
    println!("  {} {}", style("Rules:").bold(), format_number(result.rules));
    if result.leaps > 0 {
        println!("  {} {}", style("Leaps:").bold(), format_number(result.leaps));
    }
    println!(
        "  {} {} ({} dropped)",
        style("Cities:").bold(),
        format_number(result.cities_loaded),
        format_number(result.cities_dropped)
    );
    if result.feature_codes > 0 {
        println!(
            "  {} {}",
            style("Feature codes:").bold(),
            format_number(result.feature_codes)
        );
    }
    println!(
        "  {} {} ({})",
        style("Files:").bold(),
        format_number(result.files_processed),
        format_size(result.input_bytes, BINARY)
    );
    println!("  {} {:.1}s", style("Duration:").bold(), duration_secs);

    let issues = result.issues;
    if issues.total() > 0 {
        println!(
            "  {} {} ({} low, {} medium, {} critical)",
            style("Issues:").yellow().bold(),
            format_number(issues.total()),
            issues.low,
            issues.medium,
            issues.critical
        );
    }
    for path in result.failed_files.iter().chain(&result.unprocessed_files) {
        println!("  {} {}", style("Not loaded:").red().bold(), path.display());
    }

    match (db_path, db_size) {
        (Some(path), Some(size)) => {
            println!(
                "  {} {} ({})",
                style("Database:").bold(),
                path,
                format_size(size, BINARY)
            );
        }
        (Some(path), None) => println!("  {} {}", style("Database:").bold(), path),
        (None, _) => println!("  {} dry run, nothing written", style("Database:").bold()),
    }
    println!();
}

/// Print a header at the start of the run
pub fn print_header(tzdb: Option<&str>, gazetteer: Option<&str>, workers: usize, output: &str) {
    println!();
    println!(
        "{} {}",
        style("tzdb-ingest").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("{}", style("─".repeat(50)).dim());
    if let Some(dir) = tzdb {
        println!("  {} {}", style("Tz database:").bold(), dir);
    }
    if let Some(dir) = gazetteer {
        println!("  {} {}", style("Gazetteer:").bold(), dir);
    }
    println!("  {} {}", style("Workers:").bold(), workers);
    println!("  {} {}", style("Output:").bold(), output);
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
        assert_eq!(format_number(1234567890), "1,234,567,890");
    }

    #[test]
    fn test_reporter_follows_snapshot() {
        let reporter = ProgressReporter::new();
        reporter.on_progress(&ProgressSnapshot {
            current: 3,
            maximum: 9,
            status: "Parsing europe".into(),
        });

        assert_eq!(reporter.bar.length(), Some(9));
        assert_eq!(reporter.bar.position(), 3);
        assert_eq!(reporter.bar.message(), "Parsing europe");
        reporter.finish_and_clear();
    }
}
