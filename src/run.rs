//! Run controller: resolves the host identity, verifies the storage
//! target, then walks the configured groups.

use std::time::Duration;

use crate::config::{Config, FileGroup};
use crate::group::{self, Mode};
use crate::identity::{IdentityError, IdentityProvider};
use crate::store::{StoreClient, StoreError};

/// Bound on the whole pre-flight exchange so an unattended run cannot
/// hang on an unresponsive storage endpoint.
const PREFLIGHT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub list_only: bool,
    pub only_group: Option<String>,
    pub simulate: bool,
}

/// Conditions that abort the run before or during group iteration.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("cannot obtain host identity: {0}")]
    Identity(#[from] IdentityError),
    #[error("storage pre-flight check failed: {0}")]
    Preflight(StoreError),
    #[error("group {0:?} is not declared in the configuration")]
    UnknownGroup(String),
}

impl RunError {
    /// Process exit status for this failure. Pre-flight failures get a
    /// distinct status per cause so a scheduler can tell them apart.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Identity(_) | Self::UnknownGroup(_) => 1,
            Self::Preflight(StoreError::Auth(_)) => 2,
            Self::Preflight(StoreError::OwnershipConflict { .. }) => 3,
            Self::Preflight(StoreError::PermissionDenied { .. }) => 4,
            Self::Preflight(_) => 5,
        }
    }
}

/// Execute one housekeeping run over every group, or over the single
/// group selected with `--only`.
pub async fn run(
    cfg: &Config,
    store: &StoreClient,
    identity: &IdentityProvider,
    opts: &RunOptions,
) -> Result<(), RunError> {
    let host_id = identity.host_id().await?;
    tracing::info!(host_id = %host_id, "resolved host identity");

    match tokio::time::timeout(PREFLIGHT_TIMEOUT, store.preflight(&host_id)).await {
        Ok(result) => result.map_err(RunError::Preflight)?,
        Err(_) => {
            return Err(RunError::Preflight(StoreError::Unknown(
                "pre-flight check timed out".to_string(),
            )));
        }
    }

    let mode = if opts.list_only {
        Mode::List
    } else {
        Mode::Execute {
            simulate: opts.simulate,
        }
    };

    let selected: Vec<(&str, &FileGroup)> = match &opts.only_group {
        Some(name) => {
            let group = cfg
                .groups
                .get(name)
                .ok_or_else(|| RunError::UnknownGroup(name.clone()))?;
            vec![(name.as_str(), group)]
        }
        None => cfg.groups.iter().map(|(n, g)| (n.as_str(), g)).collect(),
    };

    for (name, group) in selected {
        let eligible = group::process(name, group, store, &host_id, mode).await;
        if opts.list_only {
            if eligible.is_empty() {
                tracing::info!(group = name, "no files for action");
            } else {
                for file in &eligible {
                    tracing::info!(group = name, file = %file.display(), "eligible file");
                }
            }
        }
    }
    Ok(())
}
