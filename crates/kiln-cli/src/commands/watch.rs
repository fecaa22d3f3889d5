//! `kiln watch`: initial build, then incremental rebuilds on change.
//!
//! Changes are batched for the debounce window. A new batch cancels the
//! rebuild in flight. Paths stay dirty until a rebuild that includes them
//! succeeds, since failed and cancelled builds never replace the last good
//! graph.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use kiln_build::{BuildOutcome, BuildSession};
use tokio::signal;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{Instant, timeout_at};
use tracing::debug;

use crate::cli::WatchArgs;
use crate::commands::utils;
use crate::error::Result;
use crate::ui;
use crate::watcher::{FileChange, FileWatcher};

type Rebuild = (Vec<PathBuf>, kiln_build::Result<BuildOutcome>);

/// Execute the watch command. Runs until Ctrl+C.
pub async fn execute(args: WatchArgs) -> Result<()> {
    let mut config = utils::load_build_config(&args.build)?;
    // Watcher events carry canonical paths; graph URLs must match them.
    config.root_dir = config.root_dir.canonicalize()?;
    let out_dir = utils::absolute_out_dir(&config)?;
    utils::describe(&config);

    let session = Arc::new(BuildSession::new(config));

    ui::info("Performing initial build...");
    match session.build().await {
        Ok(outcome) => {
            utils::report_outcome(&outcome, &out_dir);
            ui::success(&format!(
                "Initial build completed in {}",
                ui::format_duration(outcome.stats.duration)
            ));
        }
        Err(e) => utils::report_error(e),
    }

    let (watcher, mut changes) = FileWatcher::new(&session.config().root_dir, vec![out_dir.clone()])?;
    ui::info(&format!("Watching for changes in: {}", watcher.root().display()));
    ui::info("Press Ctrl+C to stop");

    let window = Duration::from_millis(args.debounce);
    let mut dirty: BTreeSet<PathBuf> = BTreeSet::new();
    let mut in_flight: Option<JoinHandle<Rebuild>> = None;

    loop {
        tokio::select! {
            Some(change) = changes.recv() => {
                dirty.insert(change.into_path());
                collect_batch(&mut changes, &mut dirty, window).await;

                if let Some(handle) = in_flight.take() {
                    session.cancel();
                    finish(handle.await, &mut dirty, &out_dir);
                }

                let paths: Vec<PathBuf> = dirty.iter().cloned().collect();
                for path in &paths {
                    ui::info(&format!("File changed: {}", path.display()));
                }
                let session = Arc::clone(&session);
                in_flight = Some(tokio::spawn(async move {
                    let result = session.rebuild(&paths).await;
                    (paths, result)
                }));
            }

            result = wait(&mut in_flight) => {
                in_flight = None;
                finish(result, &mut dirty, &out_dir);
            }

            _ = signal::ctrl_c() => {
                ui::info("Stopping...");
                session.cancel();
                break;
            }
        }
    }

    drop(watcher);
    ui::success("Watch stopped");
    Ok(())
}

/// Keep receiving until `window` passes without the channel closing.
async fn collect_batch(
    changes: &mut mpsc::Receiver<FileChange>,
    dirty: &mut BTreeSet<PathBuf>,
    window: Duration,
) {
    let deadline = Instant::now() + window;
    while let Ok(Some(change)) = timeout_at(deadline, changes.recv()).await {
        dirty.insert(change.into_path());
    }
}

async fn wait(handle: &mut Option<JoinHandle<Rebuild>>) -> std::result::Result<Rebuild, JoinError> {
    match handle {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

fn finish(
    result: std::result::Result<Rebuild, JoinError>,
    dirty: &mut BTreeSet<PathBuf>,
    out_dir: &std::path::Path,
) {
    match result {
        Ok((paths, Ok(outcome))) => {
            for path in &paths {
                dirty.remove(path);
            }
            utils::report_outcome(&outcome, out_dir);
            ui::success(&format!(
                "Rebuild completed in {}",
                ui::format_duration(outcome.stats.duration)
            ));
        }
        Ok((_, Err(e))) if e.is_cancelled() => debug!("Rebuild cancelled"),
        Ok((_, Err(e))) => {
            ui::error("Rebuild failed, keeping the last good build");
            utils::report_error(e);
        }
        Err(e) => ui::error(&format!("Rebuild task failed: {}", e)),
    }
}
