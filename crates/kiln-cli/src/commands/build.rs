//! `kiln build`: one build of the configured entries.

use crate::cli::BuildArgs;
use crate::commands::utils;
use crate::error::Result;
use crate::ui;

/// Execute the build command.
///
/// 1. Load configuration (CLI > env > file > defaults)
/// 2. Build, version, chunk and write
/// 3. Print warnings and the summary
pub async fn execute(args: BuildArgs) -> Result<()> {
    let config = utils::load_build_config(&args)?;
    utils::describe(&config);

    let outcome = kiln_build::build(&config).await?;
    utils::report_outcome(&outcome, &utils::absolute_out_dir(&config)?);

    ui::success(&format!(
        "Build completed in {}",
        ui::format_duration(outcome.stats.duration)
    ));
    Ok(())
}
