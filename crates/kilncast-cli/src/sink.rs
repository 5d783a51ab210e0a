//! Console rendering of run progress.

use async_trait::async_trait;
use colored::Colorize;

use kilncast_core::sink::{NotificationSink, ProgressEvent, RunSummary};

/// Sink printing one line per event, colored by kind.
#[derive(Debug, Default)]
pub struct ConsoleSink;

#[async_trait]
impl NotificationSink for ConsoleSink {
    async fn progress(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Converted {
                source_rel,
                target_rel,
                reason,
            } => {
                println!(
                    "  {} {} {} {} {}",
                    "+".green().bold(),
                    source_rel.display(),
                    "->".dimmed(),
                    target_rel.display(),
                    format!("({reason})").dimmed()
                );
            }
            ProgressEvent::Deleted { target_rel, reason } => {
                println!(
                    "  {} {} {}",
                    "-".red().bold(),
                    target_rel.display(),
                    format!("({reason})").dimmed()
                );
            }
            ProgressEvent::AssetWritten { output } => {
                println!("  {} {}", "+".cyan(), output);
            }
            ProgressEvent::AssetRetired { source_rel } => {
                println!(
                    "  {} {} {}",
                    "-".yellow(),
                    source_rel.display(),
                    "(unreferenced, moved to holding area)".dimmed()
                );
            }
            ProgressEvent::Warning { message } => {
                println!("  {} {}", "!".yellow().bold(), message);
            }
        }
    }

    async fn summary(&self, summary: &RunSummary) {
        if summary.dry_run {
            println!("{}", "Dry run, nothing was written.".yellow());
        }
        if summary.nothing_to_do() {
            println!("Nothing to do ({} documents up to date).", summary.skipped);
            return;
        }
        let mut line = format!(
            "Converted {}, deleted {}, skipped {}",
            summary.converted, summary.deleted, summary.skipped
        );
        if summary.assets_released > 0 || summary.assets_retired > 0 {
            line.push_str(&format!(
                ", assets released {}, retired {}",
                summary.assets_released, summary.assets_retired
            ));
        }
        if summary.warnings > 0 {
            line.push_str(&format!(", {} warning(s)", summary.warnings));
        }
        println!("{}", line.bold());
    }
}
