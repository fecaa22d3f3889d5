//! Helpers shared by the build and watch commands.

use std::path::{Path, PathBuf};

use kiln_build::{BuildConfig, BuildOutcome};

use crate::cli::BuildArgs;
use crate::config::KilnConfig;
use crate::error::{CliError, Result};
use crate::ui;

/// Load the layered configuration relative to the working directory.
pub(crate) fn load_build_config(args: &BuildArgs) -> Result<BuildConfig> {
    let cwd = std::env::current_dir()?;
    let config = KilnConfig::load(args, &cwd)?;
    config.to_build_config(&cwd)
}

pub(crate) fn describe(config: &BuildConfig) {
    match config.entries.as_slice() {
        [(path, _)] => ui::info(&format!("Building: {}", path.display())),
        entries => {
            ui::info(&format!("Building {} entries...", entries.len()));
            for (path, name) in entries {
                ui::info(&format!("  - {} -> {}", path.display(), name));
            }
        }
    }
    ui::info(&format!("Output: {}", config.out_dir.display()));
}

/// Print warnings and the summary of a finished build.
pub(crate) fn report_outcome(outcome: &BuildOutcome, out_dir: &Path) {
    for warning in &outcome.warnings {
        ui::warning(&warning.to_string());
    }
    ui::print_build_summary(outcome, out_dir);
}

/// Render a build error the way `main` would, without exiting.
pub(crate) fn report_error(err: kiln_build::Error) {
    let report = crate::error::cli_error_to_miette(CliError::Build(err));
    eprintln!("{:?}", report);
}

/// Output directory as an absolute path.
pub(crate) fn absolute_out_dir(config: &BuildConfig) -> Result<PathBuf> {
    Ok(config.absolute_out_dir()?)
}
