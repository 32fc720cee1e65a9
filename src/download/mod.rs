//! Download engine: fetch one photo if it is not already on disk, write it
//! atomically, then stamp its modification time from embedded metadata or the
//! remote creation date.

pub mod error;
pub mod file;
pub mod metadata;
pub mod paths;

use std::fs::FileTimes;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};

use crate::inventory::{parse_created_at, Inventory, PhotoDescriptor, PhotoSource};
use crate::sync::observer::{SyncEvent, SyncObserver};
use crate::types::TimestampFallback;
use error::DownloadError;

/// Subset of application config consumed by the download engine.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    pub(crate) directory: PathBuf,
    pub(crate) skip_existing: bool,
    pub(crate) timestamp_fallback: TimestampFallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampSource {
    Metadata,
    Fallback,
}

/// Modification time applied to a freshly downloaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedTimestamp {
    pub at: DateTime<Utc>,
    pub source: TimestampSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Already present and `skip_existing` is set. Nothing was fetched.
    Skipped,
    /// Written to disk. `timestamp` is `None` when no time could be applied;
    /// the file keeps its write time in that case.
    Downloaded {
        bytes: u64,
        timestamp: Option<ResolvedTimestamp>,
    },
}

/// Bring `item` into `config.directory`.
///
/// Any error is fatal for the run. By then the partial file is already gone.
pub async fn download_photo(
    source: &dyn PhotoSource,
    inventory: &Inventory,
    item: &PhotoDescriptor,
    config: &DownloadConfig,
    observer: &dyn SyncObserver,
) -> Result<DownloadOutcome, DownloadError> {
    let target = config.directory.join(item.local_name());

    if config.skip_existing && is_regular_file(&target).await {
        return Ok(DownloadOutcome::Skipped);
    }

    observer.on_event(SyncEvent::Downloading {
        path: target.clone(),
    });
    let body = source.open(&item.handle).await?;
    let bytes = file::write_stream(body, &target).await?;

    let fallback = fallback_created_at(inventory, item, config.timestamp_fallback).to_owned();
    let stamp_path = target.clone();
    let timestamp = tokio::task::spawn_blocking(move || stamp_file(&stamp_path, &fallback))
        .await
        .map_err(|e| DownloadError::Other(anyhow::anyhow!("Timestamp task failed: {}", e)))?;

    Ok(DownloadOutcome::Downloaded { bytes, timestamp })
}

async fn is_regular_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

/// The `created_at` used when a file carries no embedded date.
///
/// `FirstItem` reproduces the historical behavior of stamping every such file
/// with the newest photo's date.
fn fallback_created_at<'a>(
    inventory: &'a Inventory,
    item: &'a PhotoDescriptor,
    policy: TimestampFallback,
) -> &'a str {
    match policy {
        TimestampFallback::FirstItem => inventory
            .first()
            .map_or(item.created_at.as_str(), |first| first.created_at.as_str()),
        TimestampFallback::Item => &item.created_at,
    }
}

/// Resolve and apply the modification time. Blocking.
fn stamp_file(path: &Path, fallback_created_at: &str) -> Option<ResolvedTimestamp> {
    let resolved = match metadata::extract_creation_timestamp(path) {
        Ok(at) => ResolvedTimestamp {
            at,
            source: TimestampSource::Metadata,
        },
        Err(e) => {
            tracing::debug!("No embedded creation date in {}: {}", path.display(), e);
            let Some(at) = parse_created_at(fallback_created_at) else {
                tracing::warn!(
                    "Unparseable created_at {:?}; leaving mtime of {} unchanged",
                    fallback_created_at,
                    path.display()
                );
                return None;
            };
            ResolvedTimestamp {
                at,
                source: TimestampSource::Fallback,
            }
        }
    };

    if let Err(e) = set_file_times(path, resolved.at.timestamp()) {
        tracing::warn!("Could not set mtime on {}: {}", path.display(), e);
        return None;
    }
    Some(resolved)
}

/// Set the modification and access times of a file to the given Unix
/// timestamp. Pre-1970 dates are honored where the platform allows them.
fn set_file_times(path: &Path, timestamp: i64) -> std::io::Result<()> {
    let time = if timestamp >= 0 {
        UNIX_EPOCH + Duration::from_secs(timestamp as u64)
    } else {
        UNIX_EPOCH
            .checked_sub(Duration::from_secs(timestamp.unsigned_abs()))
            .unwrap_or(SystemTime::UNIX_EPOCH)
    };
    let times = FileTimes::new().set_modified(time).set_accessed(time);
    let file = std::fs::File::options().write(true).open(path)?;
    file.set_times(times)?;
    Ok(())
}
