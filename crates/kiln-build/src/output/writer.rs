//! Atomic, contained file writing for build output.
//!
//! Every path is validated against the output directory before anything is
//! written. Files go to temporary siblings first and are renamed into place
//! once all of them were written; if any step fails, the temporary files are
//! removed again and nothing from this build becomes visible.

#![allow(clippy::disallowed_methods)]

use std::fs;
use std::path::{Path, PathBuf};

use path_clean::PathClean;
use tracing::warn;

use super::{OutputFile, WriteError};

const TEMP_SUFFIX: &str = ".kiln-tmp";

/// Write `files` below `dir`, creating it when needed.
///
/// Returns the absolute paths written, in the order of `files`.
pub(crate) fn write_files(dir: &Path, files: &[OutputFile]) -> Result<Vec<PathBuf>, WriteError> {
    let dir = validate_and_normalize_dir(dir)?;

    fs::create_dir_all(&dir).map_err(|e| {
        WriteError::WriteFailure(format!(
            "Failed to create output directory '{}': {}",
            dir.display(),
            e
        ))
    })?;

    let mut operations = Vec::with_capacity(files.len());
    for file in files {
        let target_path = validate_output_path(&dir, &file.path)?;
        operations.push((target_path, file.contents.as_slice()));
    }

    write_files_atomic(&operations)?;
    Ok(operations.into_iter().map(|(path, _)| path).collect())
}

fn validate_and_normalize_dir(dir: &Path) -> Result<PathBuf, WriteError> {
    let cleaned = dir.clean();
    if cleaned.is_absolute() {
        return Ok(cleaned);
    }
    let cwd = std::env::current_dir().map_err(|e| {
        WriteError::InvalidOutputPath(format!("Failed to get current directory: {}", e))
    })?;
    Ok(cwd.join(&cleaned).clean())
}

/// Resolve `filename` below `base_dir`, rejecting anything that would land
/// outside of it.
pub(crate) fn validate_output_path(base_dir: &Path, filename: &str) -> Result<PathBuf, WriteError> {
    if filename.contains('\0') {
        return Err(WriteError::InvalidOutputPath(
            "Filename contains null byte".to_string(),
        ));
    }

    #[cfg(target_os = "windows")]
    {
        let upper = filename.rsplit('/').next().unwrap_or(filename).to_uppercase();
        let device_names = [
            "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7",
            "COM8", "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
        ];
        for device in &device_names {
            if upper == *device || upper.starts_with(&format!("{}.", device)) {
                return Err(WriteError::InvalidOutputPath(format!(
                    "Filename is a reserved device name: {}",
                    filename
                )));
            }
        }
    }

    let filename_path = Path::new(filename).clean();
    let full_path = base_dir.join(&filename_path).clean();

    if filename_path.is_absolute() || !full_path.starts_with(base_dir) || full_path == base_dir {
        return Err(WriteError::InvalidOutputPath(format!(
            "Path '{}' escapes output directory '{}' (resolved to '{}')",
            filename,
            base_dir.display(),
            full_path.display()
        )));
    }

    Ok(full_path)
}

fn temp_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(TEMP_SUFFIX);
    target.with_file_name(name)
}

/// Two-phase write: everything to temporary files, then rename.
fn write_files_atomic(operations: &[(PathBuf, &[u8])]) -> Result<(), WriteError> {
    let mut temp_files = Vec::new();

    for (target_path, content) in operations {
        if let Some(parent) = target_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                cleanup_temp_files(&temp_files);
                WriteError::WriteFailure(format!(
                    "Failed to create directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let temp_path = temp_path(target_path);
        fs::write(&temp_path, content).map_err(|e| {
            cleanup_temp_files(&temp_files);
            WriteError::WriteFailure(format!(
                "Failed to write temporary file '{}': {}",
                temp_path.display(),
                e
            ))
        })?;

        temp_files.push((temp_path, target_path.clone()));
    }

    for (temp_path, target_path) in &temp_files {
        fs::rename(temp_path, target_path).map_err(|e| {
            cleanup_temp_files(&temp_files);
            WriteError::WriteFailure(format!(
                "Failed to rename '{}' to '{}': {}",
                temp_path.display(),
                target_path.display(),
                e
            ))
        })?;
    }

    Ok(())
}

/// Best effort; we are already failing.
fn cleanup_temp_files(temp_files: &[(PathBuf, PathBuf)]) {
    for (temp_path, _) in temp_files {
        if temp_path.exists() {
            if let Err(e) = fs::remove_file(temp_path) {
                warn!(path = %temp_path.display(), error = %e, "Failed to clean up temporary file");
            }
        }
    }
}
