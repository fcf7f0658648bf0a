//! Age-based file selection.
//!
//! A file is eligible for disposal when its name matches the group's date
//! pattern and its last-modified time is strictly before the cutoff
//! (`now - max_age_days`). Files whose names do not match are skipped
//! silently; they are simply not managed by the group.

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use std::path::PathBuf;

/// Select the paths older than `max_age_days`, gated by `date_regex`.
///
/// `max_age_days` of 0 selects every matching file modified before the
/// instant of evaluation.
pub fn select_expired(
    paths: impl IntoIterator<Item = PathBuf>,
    date_regex: &Regex,
    max_age_days: i64,
) -> Vec<PathBuf> {
    select_expired_before(paths, date_regex, Utc::now() - Duration::days(max_age_days))
}

/// Cutoff-instant form of [`select_expired`]: keeps paths whose mtime is
/// strictly earlier than `cutoff`. Relative input order is preserved.
pub fn select_expired_before(
    paths: impl IntoIterator<Item = PathBuf>,
    date_regex: &Regex,
    cutoff: DateTime<Utc>,
) -> Vec<PathBuf> {
    paths
        .into_iter()
        .filter(|path| {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                return false;
            };
            if !date_regex.is_match(name) {
                return false;
            }
            // If we can't read mtime, keep the file (never dispose blind).
            let Ok(meta) = std::fs::metadata(path) else {
                tracing::debug!(file = %path.display(), "cannot stat file; keeping");
                return false;
            };
            let Ok(modified) = meta.modified() else {
                return false;
            };
            DateTime::<Utc>::from(modified) < cutoff
        })
        .collect()
}
