//! Local disposal actions: delete and move.
//!
//! Both actions share the same partial-failure contract: one file failing
//! never stops the pass over the remaining files. Failures are collected
//! and reported together once the action has finished.

use std::fs;
use std::path::{Path, PathBuf};

/// A single file the action could not dispose of.
#[derive(Debug)]
pub struct DisposalFailure {
    pub file: PathBuf,
    /// Destination directory or bucket, when the action has one.
    pub context: Option<String>,
    pub cause: anyhow::Error,
}

impl DisposalFailure {
    pub fn new(file: &Path, context: Option<&str>, cause: impl Into<anyhow::Error>) -> Self {
        Self {
            file: file.to_path_buf(),
            context: context.map(str::to_string),
            cause: cause.into(),
        }
    }
}

/// Log every collected failure for `action` at error level.
pub fn report_failures(action: &str, failures: &[DisposalFailure]) {
    for failure in failures {
        match &failure.context {
            Some(context) => tracing::error!(
                file = %failure.file.display(),
                context = %context,
                cause = %failure.cause,
                "{action} failed"
            ),
            None => tracing::error!(
                file = %failure.file.display(),
                cause = %failure.cause,
                "{action} failed"
            ),
        }
    }
}

/// Remove each file, continuing past per-file errors.
pub fn delete_files(files: &[PathBuf]) -> Vec<DisposalFailure> {
    if files.is_empty() {
        tracing::info!("nothing to delete");
        return Vec::new();
    }
    let mut failures = Vec::new();
    for file in files {
        match fs::remove_file(file) {
            Ok(()) => tracing::info!(file = %file.display(), "removed file"),
            Err(err) => failures.push(DisposalFailure::new(file, None, err)),
        }
    }
    failures
}

/// Relocate each file into `dest`, preserving the base name.
///
/// Rename is attempted first; when it fails (typically a cross-device
/// move) the file is copied and the source removed. Continues past
/// per-file errors, matching delete.
pub fn move_files(files: &[PathBuf], dest: &Path) -> Vec<DisposalFailure> {
    if files.is_empty() {
        tracing::info!("nothing to move");
        return Vec::new();
    }
    let mut failures = Vec::new();
    for file in files {
        let Some(name) = file.file_name() else {
            failures.push(DisposalFailure::new(
                file,
                Some(&dest.display().to_string()),
                anyhow::anyhow!("path has no file name"),
            ));
            continue;
        };
        let target = dest.join(name);
        match move_one(file, &target) {
            Ok(()) => {
                tracing::info!(file = %file.display(), dest = %dest.display(), "moved file");
            }
            Err(err) => {
                failures.push(DisposalFailure::new(file, Some(&dest.display().to_string()), err));
            }
        }
    }
    failures
}

fn move_one(source: &Path, target: &Path) -> anyhow::Result<()> {
    if fs::rename(source, target).is_ok() {
        return Ok(());
    }
    // Rename cannot cross filesystems; fall back to copy + remove.
    fs::copy(source, target)?;
    fs::remove_file(source)?;
    Ok(())
}
