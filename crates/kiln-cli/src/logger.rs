//! Logging setup for the kiln CLI.
//!
//! `--verbose` turns on debug output for the kiln crates, `--quiet` keeps
//! errors only, and otherwise `RUST_LOG` is honored with `info` as the
//! fallback.
//!
//! ```rust,no_run
//! use kiln_cli::logger::init_logger;
//! use tracing::info;
//!
//! init_logger(false, false, false);
//! info!("Starting build");
//! ```

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const VERBOSE_FILTER: &str = "kiln_graph=debug,kiln_build=debug,kiln_cli=debug";
const DEFAULT_FILTER: &str = "kiln_graph=info,kiln_build=info,kiln_cli=info";

/// Install the global tracing subscriber. Call once, before any logging.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    let filter = EnvFilter::new(filter_directives(verbose, quiet));

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_ansi(should_use_colors(no_color))
        .compact();

    // A subscriber installed by an embedding test harness wins.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

/// Filter directives for the given flags, in precedence order:
/// `--verbose`, `--quiet`, `RUST_LOG`, default.
pub fn filter_directives(verbose: bool, quiet: bool) -> String {
    if verbose {
        VERBOSE_FILTER.to_string()
    } else if quiet {
        "error".to_string()
    } else {
        std::env::var(EnvFilter::DEFAULT_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_FILTER.to_string())
    }
}

/// Colors are on unless `--no-color`, `NO_COLOR`, or stderr isn't a terminal.
pub fn should_use_colors(no_color: bool) -> bool {
    !no_color && crate::ui::should_use_color()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_wins() {
        assert_eq!(filter_directives(true, false), VERBOSE_FILTER);
    }

    #[test]
    fn test_quiet_is_errors_only() {
        assert_eq!(filter_directives(false, true), "error");
    }

    #[test]
    fn test_no_color_flag_disables_colors() {
        assert!(!should_use_colors(true));
    }

    #[test]
    fn test_init_twice_does_not_panic() {
        init_logger(false, true, true);
        init_logger(true, false, true);
    }
}
