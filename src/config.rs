//! Configuration loading and validation.
//!
//! The config file is YAML: two reserved credential keys plus any number
//! of named file groups. Each group names a directory, a glob, a date
//! pattern, a maximum age, and the disposal actions to apply. Validation
//! happens at load time so a group missing the bucket for an archive
//! action fails the run up front instead of deep inside the action.

use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("group {group}: {source}")]
    Group {
        group: String,
        source: serde_yaml::Error,
    },
    #[error("group {group}: invalid dateregex: {source}")]
    InvalidDateRegex {
        group: String,
        source: regex::Error,
    },
    #[error("group {group}: upto {value:?} has no leading integer")]
    InvalidAge { group: String, value: String },
    #[error("group {group}: action {action} requires {field}")]
    MissingActionField {
        group: String,
        action: Action,
        field: &'static str,
    },
    #[error("{action:?} is not a valid action")]
    UnknownAction { action: String },
}

/// The closed set of disposal actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Archive,
    Delete,
    Move,
}

impl FromStr for Action {
    type Err = ConfigError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text.trim().to_ascii_lowercase().as_str() {
            "s3" => Ok(Self::Archive),
            "delete" => Ok(Self::Delete),
            "move" => Ok(Self::Move),
            _ => Err(ConfigError::UnknownAction {
                action: text.to_string(),
            }),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Archive => write!(f, "s3"),
            Self::Delete => write!(f, "delete"),
            Self::Move => write!(f, "move"),
        }
    }
}

/// One validated file group.
#[derive(Debug, Clone)]
pub struct FileGroup {
    /// Directory to search.
    pub path: String,
    /// Glob pattern for candidate file names, joined onto `path`.
    pub files: String,
    /// A file name must match this to be eligible for age evaluation.
    pub date_regex: Regex,
    /// Maximum age in days before a file is eligible for disposal.
    pub max_age_days: i64,
    /// Action names in configured order. Parsed at dispatch time so an
    /// unknown name is a per-group error, not a load failure.
    pub actions: Vec<String>,
    pub bucket: Option<String>,
    pub dest: Option<String>,
}

#[derive(Debug)]
pub struct Config {
    pub access_key: String,
    pub secret_key: String,
    pub groups: BTreeMap<String, FileGroup>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(rename = "remote access key")]
    access_key: String,
    #[serde(rename = "remote secret key")]
    secret_key: String,
    #[serde(flatten)]
    entries: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Deserialize)]
struct RawGroup {
    path: String,
    files: String,
    dateregex: String,
    upto: AgeSpec,
    action: Vec<String>,
    #[serde(default)]
    bucket: Option<String>,
    #[serde(default)]
    dest: Option<String>,
}

/// `upto` is usually written `"7 days"`, but a bare integer works too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AgeSpec {
    Days(i64),
    Text(String),
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_yaml::from_str(text)?;
        let mut groups = BTreeMap::new();
        for (name, value) in raw.entries {
            // Scalar top-level entries are not groups; skip them.
            if !value.is_mapping() {
                continue;
            }
            let group: RawGroup =
                serde_yaml::from_value(value).map_err(|source| ConfigError::Group {
                    group: name.clone(),
                    source,
                })?;
            groups.insert(name.clone(), validate_group(&name, group)?);
        }
        Ok(Self {
            access_key: raw.access_key,
            secret_key: raw.secret_key,
            groups,
        })
    }
}

fn validate_group(name: &str, raw: RawGroup) -> Result<FileGroup, ConfigError> {
    let max_age_days = match raw.upto {
        AgeSpec::Days(days) => days,
        AgeSpec::Text(text) => leading_integer(&text).ok_or_else(|| ConfigError::InvalidAge {
            group: name.to_string(),
            value: text.clone(),
        })?,
    };

    let date_regex = Regex::new(&raw.dateregex).map_err(|source| ConfigError::InvalidDateRegex {
        group: name.to_string(),
        source,
    })?;

    // Recognized actions must have their parameters declared up front.
    // Unrecognized names are left for the group processor to diagnose.
    for text in &raw.action {
        match text.parse::<Action>() {
            Ok(Action::Archive) if raw.bucket.is_none() => {
                return Err(ConfigError::MissingActionField {
                    group: name.to_string(),
                    action: Action::Archive,
                    field: "bucket",
                });
            }
            Ok(Action::Move) if raw.dest.is_none() => {
                return Err(ConfigError::MissingActionField {
                    group: name.to_string(),
                    action: Action::Move,
                    field: "dest",
                });
            }
            _ => {}
        }
    }

    Ok(FileGroup {
        path: raw.path,
        files: raw.files,
        date_regex,
        max_age_days,
        actions: raw.action,
        bucket: raw.bucket,
        dest: raw.dest,
    })
}

/// Leading integer of a string with trailing units: `"7 days"` -> 7.
fn leading_integer(text: &str) -> Option<i64> {
    let digits: String = text
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}
