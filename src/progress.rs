//! Terminal output for parfs runs
//!
//! A spinner while the pool works, then a summary built from the run's
//! aggregated counters. Nothing here feeds back into a run.

use crate::aggregate::{RunSummary, WorkerCounters};
use crate::delete::DeleteResult;
use crate::extract::ExtractResult;
use console::style;
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner shown while workers run
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();

        let spinner = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
        bar.set_style(spinner);
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Set a status message
    pub fn set_status(&self, status: &str) {
        self.bar.set_message(status.to_string());
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

/// Format a number with thousands separators
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| chunk.iter().rev().map(|&b| b as char).collect::<String>())
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

/// Print a header at the start of a run
pub fn print_header(tool: &str, source: &str, workers: usize, target: Option<&str>) {
    println!();
    println!(
        "{} {} {}",
        style("parfs").cyan().bold(),
        style(tool).cyan(),
        env!("CARGO_PKG_VERSION")
    );
    println!("{}", style("─".repeat(50)).dim());
    println!("  {} {}", style("Source:").bold(), source);
    println!("  {} {}", style("Workers:").bold(), workers);
    if let Some(target) = target {
        println!("  {} {}", style("Destination:").bold(), target);
    }
    println!();
}

fn print_timing<R: WorkerCounters>(summary: &RunSummary<R>) {
    println!(
        "  {} {:.1}s ({:.0} entries/sec)",
        style("Duration:").bold(),
        summary.elapsed.as_secs_f64(),
        summary.entries_per_second()
    );
}

/// Print the outcome of a delete run
pub fn print_delete_summary(summary: &RunSummary<DeleteResult>, root: &str) {
    let totals = &summary.totals;

    println!();
    println!("{}", style("Delete Complete").green().bold());
    println!("{}", style("─".repeat(50)).dim());
    println!("  {} {}", style("Removed:").bold(), root);
    println!(
        "  {} {}",
        style("Directories:").bold(),
        format_number(totals.dirs_removed)
    );
    println!("  {} {}", style("Files:").bold(), format_number(totals.files_removed));
    print_timing(summary);
    if totals.collisions > 0 || totals.nonempty_defers > 0 {
        println!(
            "  {} {} vanished, {} deferred",
            style("Races:").yellow().bold(),
            format_number(totals.collisions),
            format_number(totals.nonempty_defers)
        );
    }

    println!();
    for (id, result) in summary.per_worker.iter().enumerate() {
        println!(
            "  {} {}",
            style(format!("worker {:>3}", id)).dim(),
            delete_worker_row(result)
        );
    }
    println!();
}

/// One worker's line in the delete summary table
fn delete_worker_row(result: &DeleteResult) -> String {
    format!(
        "dirs {:>10}  files {:>12}  vanished {:>8}  deferred {:>8}",
        format_number(result.dirs_removed),
        format_number(result.files_removed),
        format_number(result.collisions),
        format_number(result.nonempty_defers)
    )
}

/// Print the outcome of an extract run
pub fn print_extract_summary(summary: &RunSummary<ExtractResult>, destination: &str) {
    let totals = &summary.totals;

    println!();
    println!("{}", style("Extract Complete").green().bold());
    println!("{}", style("─".repeat(50)).dim());
    println!("  {} {}", style("Destination:").bold(), destination);
    println!(
        "  {} {}",
        style("Directories:").bold(),
        format_number(totals.dirs_extracted)
    );
    println!(
        "  {} {}",
        style("Files:").bold(),
        format_number(totals.files_extracted)
    );
    println!(
        "  {} {}",
        style("Total Size:").bold(),
        format_size(totals.bytes_extracted, BINARY)
    );
    print_timing(summary);
    if totals.links_deferred > 0 {
        println!(
            "  {} {}",
            style("Deferred links:").bold(),
            format_number(totals.links_deferred)
        );
    }
    if totals.dir_create_collisions > 0 || totals.link_collisions > 0 {
        println!(
            "  {} {} directory, {} link",
            style("Collisions:").yellow().bold(),
            format_number(totals.dir_create_collisions),
            format_number(totals.link_collisions)
        );
    }

    println!();
    for (id, result) in summary.per_worker.iter().enumerate() {
        println!(
            "  {} dirs {:>10}  files {:>12}  {:>10}",
            style(format!("worker {:>3}", id)).dim(),
            format_number(result.dirs_extracted),
            format_number(result.files_extracted),
            format_size(result.bytes_extracted, BINARY)
        );
    }
    println!();
}
