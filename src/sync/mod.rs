//! Sync orchestration: one strictly ordered pass of purge, then per-item
//! download and link, ending in a single [`SyncReport`].

pub mod error;
pub mod observer;
pub mod report;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::download::{self, paths, DownloadConfig, DownloadOutcome};
use crate::inventory::{Inventory, PhotoSource};
use crate::link::{self, FsLinker, LinkOutcome, Linker};
use crate::purge::{self, FsRemover, Remover};
use crate::types::TimestampFallback;
use error::SyncError;
use observer::{SyncEvent, SyncObserver};
pub use report::SyncReport;

/// What a run should do. Built from the CLI by `Config::sync_options`.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub directory: PathBuf,
    pub link_directory: Option<PathBuf>,
    pub skip_existing: bool,
    pub purge: bool,
    /// Also link items that were skipped because they already exist.
    pub link_existing: bool,
    pub timestamp_fallback: TimestampFallback,
}

pub struct SyncOrchestrator<'a> {
    source: &'a dyn PhotoSource,
    observer: &'a dyn SyncObserver,
    linker: Arc<dyn Linker>,
    remover: Box<dyn Remover>,
    options: SyncOptions,
}

impl<'a> SyncOrchestrator<'a> {
    pub fn new(
        source: &'a dyn PhotoSource,
        observer: &'a dyn SyncObserver,
        options: SyncOptions,
    ) -> Self {
        Self {
            source,
            observer,
            linker: Arc::new(FsLinker),
            remover: Box::new(FsRemover),
            options,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_linker(mut self, linker: Arc<dyn Linker>) -> Self {
        self.linker = linker;
        self
    }

    #[cfg(test)]
    pub(crate) fn with_remover(mut self, remover: Box<dyn Remover>) -> Self {
        self.remover = remover;
        self
    }

    /// Fetch the inventory and synchronize against it.
    pub async fn run(&self) -> Result<SyncReport, SyncError> {
        let inventory = self
            .source
            .fetch_inventory()
            .await
            .map_err(SyncError::Inventory)?;
        self.run_with_inventory(&inventory).await
    }

    /// Synchronize against an inventory fetched earlier.
    ///
    /// Items are handled one at a time, newest first. The first download
    /// failure ends the run; everything else is counted in
    /// [`SyncReport::errors`] and the run carries on.
    pub async fn run_with_inventory(&self, inventory: &Inventory) -> Result<SyncReport, SyncError> {
        let mut report = SyncReport::default();
        self.observer.on_event(SyncEvent::InventoryReady {
            total: inventory.len(),
        });

        if self.options.purge {
            if inventory.is_empty() {
                tracing::warn!("Remote library is empty; every local photo will be purged");
            }
            let summary = purge::purge_missing(
                &self.options.directory,
                inventory,
                self.remover.as_ref(),
                self.observer,
            )
            .await?;
            report.purged += summary.purged;
            report.errors += summary.failed;
        }

        let download_config = DownloadConfig {
            directory: self.options.directory.clone(),
            skip_existing: self.options.skip_existing,
            timestamp_fallback: self.options.timestamp_fallback,
        };

        for item in inventory {
            let name = item.local_name();
            if !paths::is_usable_name(&name) {
                self.observer.on_event(SyncEvent::InvalidFilename {
                    filename: item.filename.clone(),
                });
                report.errors += 1;
                continue;
            }
            let target = self.options.directory.join(&name);

            let outcome = match download::download_photo(
                self.source,
                inventory,
                item,
                &download_config,
                self.observer,
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(source) => {
                    self.observer.on_event(SyncEvent::DownloadFailed {
                        path: target,
                        error: source.to_string(),
                    });
                    return Err(SyncError::Download {
                        filename: item.filename.clone(),
                        source,
                    });
                }
            };

            let should_link = match outcome {
                DownloadOutcome::Skipped => {
                    report.skipped += 1;
                    self.observer.on_event(SyncEvent::Skipped {
                        path: target.clone(),
                    });
                    self.options.link_existing
                }
                DownloadOutcome::Downloaded { bytes, timestamp } => {
                    report.downloaded += 1;
                    if timestamp.is_none() {
                        report.errors += 1;
                    }
                    self.observer.on_event(SyncEvent::Downloaded {
                        path: target.clone(),
                        bytes,
                        timestamp: timestamp.map(|t| (t.at, t.source)),
                    });
                    true
                }
            };

            if let Some(link_dir) = &self.options.link_directory {
                if should_link {
                    self.link(&target, &link_dir.join(&name), &mut report).await;
                } else {
                    tracing::debug!("Not linking skipped {}", target.display());
                }
            }
        }

        self.observer.on_event(SyncEvent::Finished { report });
        Ok(report)
    }

    async fn link(&self, source: &Path, link_path: &Path, report: &mut SyncReport) {
        let linker = Arc::clone(&self.linker);
        let (src, dst) = (source.to_path_buf(), link_path.to_path_buf());
        let outcome =
            match tokio::task::spawn_blocking(move || link::link_or_copy(&*linker, &src, &dst))
                .await
            {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!("Link task for {} failed: {}", link_path.display(), e);
                    report.errors += 1;
                    return;
                }
            };

        let path = link_path.to_path_buf();
        let event = match outcome {
            LinkOutcome::Linked => {
                report.linked += 1;
                SyncEvent::Linked { path }
            }
            LinkOutcome::Copied { link_error } => {
                report.copied += 1;
                SyncEvent::Copied {
                    path,
                    link_error: link_error.to_string(),
                }
            }
            LinkOutcome::AlreadyLinked => SyncEvent::AlreadyLinked { path },
            LinkOutcome::Failed {
                link_error,
                copy_error,
            } => {
                report.errors += 1;
                SyncEvent::LinkFailed {
                    path,
                    link_error: link_error.to_string(),
                    copy_error: copy_error.to_string(),
                }
            }
        };
        self.observer.on_event(event);
    }
}
