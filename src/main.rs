use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use logpurge::cli::Cli;
use logpurge::config::Config;
use logpurge::identity::IdentityProvider;
use logpurge::run::{self, RunOptions};
use logpurge::store::StoreClient;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let cfg = match Config::load(&cli.cfg) {
        Ok(cfg) => cfg,
        Err(err) => {
            tracing::error!(path = %cli.cfg.display(), error = %err, "cannot load configuration, quitting");
            return ExitCode::from(1);
        }
    };
    if cfg.access_key.is_empty() || cfg.secret_key.is_empty() {
        tracing::warn!("remote credentials are empty; pre-flight and archive actions will fail");
    }
    if cfg.groups.is_empty() {
        tracing::warn!("configuration declares no file groups; nothing to do");
    }

    let store = match StoreClient::from_config(&cfg) {
        Ok(store) => store,
        Err(err) => {
            tracing::error!(error = %err, "cannot initialize storage client, quitting");
            return ExitCode::from(2);
        }
    };

    // HOST_ID skips the metadata lookup (useful off-cloud and in tests).
    let identity = match std::env::var("HOST_ID") {
        Ok(id) if !id.trim().is_empty() => IdentityProvider::fixed(id.trim()),
        _ => match IdentityProvider::metadata() {
            Ok(provider) => provider,
            Err(err) => {
                tracing::error!(error = %err, "cannot build identity client, quitting");
                return ExitCode::from(1);
            }
        },
    };

    let opts = RunOptions {
        list_only: cli.list,
        only_group: cli.only,
        simulate: cli.simulate,
    };

    match run::run(&cfg, &store, &identity, &opts).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "run aborted");
            ExitCode::from(err.exit_code())
        }
    }
}
