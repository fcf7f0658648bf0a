//! Per-group processing: settings resolution, candidate selection, and
//! action dispatch.

use std::path::{Path, PathBuf};

use crate::actions;
use crate::age;
use crate::config::{Action, FileGroup};
use crate::store::StoreClient;

/// How a group is processed.
#[derive(Debug, Clone, Copy)]
pub enum Mode {
    /// Report the eligible set; never touch a file.
    List,
    /// Run the configured actions. `simulate` logs what each action would
    /// do instead of doing it.
    Execute { simulate: bool },
}

/// Process one file group and return its eligible file set.
///
/// In [`Mode::List`] the set is returned untouched. In [`Mode::Execute`]
/// each configured action runs against it in order; action failures are
/// logged and never abort the group.
pub async fn process(
    name: &str,
    group: &FileGroup,
    store: &StoreClient,
    host_id: &str,
    mode: Mode,
) -> Vec<PathBuf> {
    tracing::info!(group = name, "processing file group");

    let candidates = expand_glob(name, group);
    let eligible = age::select_expired(candidates, &group.date_regex, group.max_age_days);

    let simulate = match mode {
        Mode::List => return eligible,
        Mode::Execute { simulate } => simulate,
    };

    for text in &group.actions {
        let action = match text.parse::<Action>() {
            Ok(action) => action,
            Err(err) => {
                tracing::error!(group = name, error = %err, "skipping invalid action");
                continue;
            }
        };
        if simulate {
            for file in &eligible {
                tracing::info!(group = name, %action, file = %file.display(), "simulate: skipping action");
            }
            continue;
        }
        dispatch(name, group, store, host_id, action, &eligible).await;
    }

    eligible
}

async fn dispatch(
    name: &str,
    group: &FileGroup,
    store: &StoreClient,
    host_id: &str,
    action: Action,
    files: &[PathBuf],
) {
    match action {
        Action::Archive => {
            // Validated on load; a group cannot reach here without a bucket.
            let Some(bucket) = group.bucket.as_deref() else {
                tracing::error!(group = name, "archive action has no bucket");
                return;
            };
            match store.archive(bucket, host_id, files).await {
                Ok(failures) => actions::report_failures("upload", &failures),
                Err(err) => {
                    tracing::error!(group = name, bucket, error = %err, "archive batch aborted");
                }
            }
        }
        Action::Delete => {
            let failures = actions::delete_files(files);
            actions::report_failures("delete", &failures);
        }
        Action::Move => {
            let Some(dest) = group.dest.as_deref() else {
                tracing::error!(group = name, "move action has no dest");
                return;
            };
            let failures = actions::move_files(files, Path::new(dest));
            actions::report_failures("move", &failures);
        }
    }
}

/// Expand `path/files` into candidate paths. Glob errors never abort the
/// run; a bad pattern yields an empty candidate set.
fn expand_glob(name: &str, group: &FileGroup) -> Vec<PathBuf> {
    let pattern = format!("{}/{}", group.path, group.files);
    let entries = match glob::glob(&pattern) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::error!(group = name, pattern = %pattern, error = %err, "invalid file pattern");
            return Vec::new();
        }
    };
    let mut candidates = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) => candidates.push(path),
            Err(err) => tracing::warn!(group = name, error = %err, "skipping unreadable path"),
        }
    }
    candidates
}
