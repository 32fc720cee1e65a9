//! icloud-photo-sync: mirror an iCloud Photos library into a local directory.
//!
//! Lists "All Photos" through Apple's CloudKit API, downloads what is missing,
//! stamps each file with its capture date, optionally purges local files that
//! vanished remotely and keeps a hard-linked secondary copy.

#![warn(clippy::all)]

mod auth;
mod cli;
mod config;
mod download;
mod icloud;
mod inventory;
mod link;
mod purge;
mod sync;
#[cfg(test)]
mod testing;
mod types;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use auth::endpoints::Endpoints;
use config::Config;
use icloud::photos::PhotosService;
use sync::observer::ConsoleObserver;
use sync::SyncOrchestrator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    let filter = if cli.verbose {
        "warn,icloud_photo_sync=debug"
    } else {
        "warn,icloud_photo_sync=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    // Everything the user typed is validated before touching the network.
    let config = Config::from_cli(cli)?;
    tracing::debug!(
        "Syncing into {} (link directory: {:?})",
        config.directory.display(),
        config.link_directory
    );

    let endpoints = Endpoints::for_domain(config.domain);
    let auth_result = auth::authenticate(&config.credentials, &endpoints).await?;

    let ckdatabasews_url = auth_result.ckdatabasews_url()?;
    let photos_service = PhotosService::new(
        ckdatabasews_url,
        Box::new(auth_result.session.http_client()),
        auth_result.service_params(),
    )
    .await?;

    let observer = ConsoleObserver::new(config.no_progress_bar);
    SyncOrchestrator::new(&photos_service, &observer, config.sync_options())
        .run()
        .await?;

    Ok(())
}
