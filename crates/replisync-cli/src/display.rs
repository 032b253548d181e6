//! Console output helpers for the replisync CLI

use console::style;
use replisync_config::{Config, SyncRoots};
use replisync_sync::PassReport;
use std::time::Duration;

/// Print the startup banner
pub fn print_banner(roots: &SyncRoots, config: &Config, once: bool) {
    println!(
        "{} Mirroring {} to {}",
        style("→").green().bold(),
        style(roots.source.display()).cyan(),
        style(roots.replica.display()).cyan()
    );
    let schedule = if once {
        "single pass".to_string()
    } else {
        format!("every {} minute(s)", config.schedule.interval_minutes)
    };
    println!(
        "  Hash: {}  Schedule: {}{}",
        style(config.sync.hash_algorithm).yellow(),
        style(schedule).yellow(),
        if config.sync.dry_run {
            style("  (dry run)").dim().to_string()
        } else {
            String::new()
        }
    );
}

/// Print the statistics of a finished pass
pub fn print_pass_summary(report: &PassReport) {
    let stats = &report.stats;
    println!();
    println!("{}", style("Pass Summary:").bold().underlined());
    println!("  Created: {}", style(stats.created).green());
    println!("  Updated: {}", style(stats.updated).green());
    println!("  Deleted: {}", style(stats.deleted).green());
    println!("  Unchanged: {}", style(stats.unchanged).dim());
    println!(
        "  Bytes copied: {}",
        style(format_bytes(stats.bytes_copied)).green()
    );
    println!(
        "  Errors: {}",
        if stats.errors > 0 {
            style(stats.errors).red()
        } else {
            style(stats.errors).green()
        }
    );
    println!(
        "  Duration: {}",
        style(format_duration(stats.duration)).blue()
    );
    if report.dry_run {
        println!(
            "  Planned actions: {}",
            style(report.plan.action_count()).yellow()
        );
    }
}

/// Human readable byte count
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}

/// Human readable duration
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
