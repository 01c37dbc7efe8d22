//! Console rendering for the SelfSync CLI

use chrono::{DateTime, Local, Utc};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use selfsync_sync::{Snapshot, SyncReport};
use selfsync_types::{StatusReporter, SyncStatus};
use std::time::Duration;

/// Status indicator backed by a terminal spinner
pub struct ConsoleStatus {
    spinner: Option<ProgressBar>,
}

impl ConsoleStatus {
    /// Create a status indicator; quiet mode renders nothing
    pub fn new(quiet: bool) -> Self {
        let spinner = (!quiet).then(|| {
            let pb = ProgressBar::new_spinner();
            if let Ok(spinner_style) =
                ProgressStyle::default_spinner().template("{spinner:.green} {msg}")
            {
                pb.set_style(spinner_style);
            }
            pb
        });
        Self { spinner }
    }
}

impl StatusReporter for ConsoleStatus {
    fn set_status(&self, status: SyncStatus) {
        let Some(pb) = &self.spinner else {
            return;
        };

        match status {
            SyncStatus::Syncing => {
                pb.set_message(status.to_string());
                pb.enable_steady_tick(Duration::from_millis(100));
            }
            SyncStatus::UpToDate => {
                pb.finish_with_message(format!("{} {}", style("✓").green(), status));
            }
            SyncStatus::Failed => {
                pb.abandon_with_message(format!("{} {}", style("✗").red(), style(status).red()));
            }
        }
    }
}

/// Print the summary of a committed transaction
pub fn print_report(report: &SyncReport) {
    println!();
    println!("{}", style("Sync Report:").bold().underlined());
    println!("  Uploaded: {}", style(report.uploaded.len()).green());
    println!(
        "  Deletions reported: {}",
        style(report.reported_deletions.len()).green()
    );
    println!("  Files written: {}", style(report.written.len()).green());
    println!("  Files deleted: {}", style(report.deleted.len()).green());
    println!(
        "  Empty folders removed: {}",
        style(report.directories_removed).green()
    );
    println!(
        "  Skipped: {}",
        if report.skipped.is_empty() {
            style(report.skipped.len()).green()
        } else {
            style(report.skipped.len()).yellow()
        }
    );
    for item in &report.skipped {
        println!("    • {} ({})", style(&item.path).yellow(), style(&item.reason).dim());
    }
    println!("  Known paths: {}", style(report.known_paths).cyan());
    println!(
        "  Duration: {}",
        style(format_duration(report.duration)).blue()
    );
}

/// Print the persisted snapshot of a vault
pub fn print_snapshot(vault_name: &str, snapshot: &Snapshot) {
    println!("{} {}", style("Vault:").bold(), style(vault_name).cyan());
    println!(
        "  Known paths: {}",
        style(snapshot.known_paths.len()).green()
    );
    println!(
        "  Last sync: {}",
        style(format_last_sync(snapshot)).blue()
    );
}

/// Render the snapshot's commit time in local time
pub fn format_last_sync(snapshot: &Snapshot) -> String {
    if snapshot.is_fresh() {
        return "never".to_string();
    }
    DateTime::<Utc>::from_timestamp_millis(snapshot.recency_threshold_millis()).map_or_else(
        || format!("{} (epoch seconds)", snapshot.last_sync_timestamp),
        |utc| {
            utc.with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        },
    )
}

/// Render a duration for humans
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{:.2}s", duration.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Duration::from_millis(1500), "1.50s")]
    #[case(Duration::from_secs(125), "2m 5s")]
    #[case(Duration::from_secs(3725), "1h 2m 5s")]
    fn test_format_duration(#[case] duration: Duration, #[case] expected: &str) {
        assert_eq!(format_duration(duration), expected);
    }

    #[test]
    fn test_format_last_sync() {
        assert_eq!(format_last_sync(&Snapshot::fresh()), "never");

        let snapshot = Snapshot::new(["a.md"], 1_700_000_000.0);
        let rendered = format_last_sync(&snapshot);
        assert!(rendered.starts_with("2023-11-1"), "unexpected: {}", rendered);
    }

    #[test]
    fn test_quiet_status_is_silent() {
        let status = ConsoleStatus::new(true);
        status.set_status(SyncStatus::Syncing);
        status.set_status(SyncStatus::Failed);
        assert!(status.spinner.is_none());
    }
}
