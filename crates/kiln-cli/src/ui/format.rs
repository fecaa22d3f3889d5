//! Formatting utilities for sizes, durations, and build summaries.

#![allow(clippy::disallowed_methods)]

use std::path::Path;
use std::time::Duration;

use console::Term;
use kiln_build::BuildOutcome;
use owo_colors::{OwoColorize, Stream::Stderr};

/// Format file size in human-readable format.
///
/// ```
/// use kiln_cli::ui::format_size;
///
/// assert_eq!(format_size(500), "500 B");
/// assert_eq!(format_size(1536), "1.50 KB");
/// ```
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", size, UNITS[unit])
    }
}

/// Format duration as `ms`, `s` or `m s`.
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();

    if total_ms < 1000 {
        format!("{}ms", total_ms)
    } else if total_ms < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

/// Print the written files with their sizes, then the totals.
pub fn print_build_summary(outcome: &BuildOutcome, out_dir: &Path) {
    let width = (Term::stderr().size().1 as usize).min(80);
    let stats = outcome.stats;

    eprintln!("\n{}", "Build Summary".if_supports_color(Stderr, |t| t.bold()));
    eprintln!("{}", "─".repeat(width));

    let mut total = 0;
    for file in &outcome.files {
        let size = std::fs::metadata(file).map(|meta| meta.len()).unwrap_or(0);
        total += size;
        let name = file.strip_prefix(out_dir).unwrap_or(file).display().to_string();
        eprintln!(
            "  {} {} {}",
            "▸".if_supports_color(Stderr, |t| t.blue()),
            name.if_supports_color(Stderr, |t| t.bold()),
            format_size(size).if_supports_color(Stderr, |t| t.dimmed())
        );
    }

    eprintln!("{}", "─".repeat(width));
    eprintln!(
        "  {} {} modules in {} chunks, {} in {}",
        "Total:".if_supports_color(Stderr, |t| t.bold()),
        stats.modules,
        stats.chunks,
        format_size(total).if_supports_color(Stderr, |t| t.green()),
        format_duration(stats.duration).if_supports_color(Stderr, |t| t.green())
    );
    if stats.reused > 0 {
        eprintln!(
            "  {}",
            format!("{} loaded, {} reused", stats.loaded, stats.reused)
                .if_supports_color(Stderr, |t| t.dimmed())
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size_bytes() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
    }

    #[test]
    fn test_format_size_units() {
        assert_eq!(format_size(1024), "1.00 KB");
        assert_eq!(format_size(1_572_864), "1.50 MB");
        assert_eq!(format_size(2_147_483_648), "2.00 GB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
    }
}
