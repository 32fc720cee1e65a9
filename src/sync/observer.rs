//! Run events and the sinks that consume them.
//!
//! Engines report what they do through [`SyncObserver`] instead of logging
//! directly, so tests can assert on the exact event sequence. The console
//! implementation turns events into `tracing` lines and drives the progress
//! bar.

use std::io::IsTerminal;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};

use super::report::SyncReport;
use crate::download::TimestampSource;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    InventoryReady {
        total: usize,
    },
    Purged {
        path: PathBuf,
    },
    PurgeFailed {
        path: PathBuf,
        error: String,
    },
    Skipped {
        path: PathBuf,
    },
    Downloading {
        path: PathBuf,
    },
    Downloaded {
        path: PathBuf,
        bytes: u64,
        timestamp: Option<(DateTime<Utc>, TimestampSource)>,
    },
    DownloadFailed {
        path: PathBuf,
        error: String,
    },
    InvalidFilename {
        filename: String,
    },
    Linked {
        path: PathBuf,
    },
    Copied {
        path: PathBuf,
        link_error: String,
    },
    AlreadyLinked {
        path: PathBuf,
    },
    LinkFailed {
        path: PathBuf,
        link_error: String,
        copy_error: String,
    },
    Finished {
        report: SyncReport,
    },
}

pub trait SyncObserver: Send + Sync {
    fn on_event(&self, event: SyncEvent);
}

/// Create a progress bar with a consistent template.
///
/// Returns `ProgressBar::hidden()` when the user passed `--no-progress-bar` or
/// stdout is not a TTY, so piped output and cron jobs stay clean.
fn create_progress_bar(no_progress_bar: bool) -> ProgressBar {
    if no_progress_bar || !std::io::stdout().is_terminal() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::with_template(
        "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
    ) {
        pb.set_style(style.progress_chars("=> "));
    }
    pb
}

/// Logs every event through `tracing` and advances a progress bar once per
/// inventory item.
pub struct ConsoleObserver {
    pb: ProgressBar,
}

impl ConsoleObserver {
    pub fn new(no_progress_bar: bool) -> Self {
        Self {
            pb: create_progress_bar(no_progress_bar),
        }
    }

    fn file_name(path: &std::path::Path) -> String {
        path.file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl SyncObserver for ConsoleObserver {
    fn on_event(&self, event: SyncEvent) {
        // indicatif needs `suspend` to coordinate writes with the bar redraw.
        let pb = &self.pb;
        match event {
            SyncEvent::InventoryReady { total } => {
                pb.set_length(total as u64);
                pb.suspend(|| tracing::info!("Found {} photos in the library", total));
            }
            SyncEvent::Purged { path } => {
                pb.suspend(|| tracing::info!("Purged {}", path.display()));
            }
            SyncEvent::PurgeFailed { path, error } => {
                pb.suspend(|| tracing::error!("Failed to purge {}: {}", path.display(), error));
            }
            SyncEvent::Skipped { path } => {
                pb.suspend(|| tracing::debug!("Skipped {}, already exists", path.display()));
                pb.inc(1);
            }
            SyncEvent::Downloading { path } => {
                pb.set_message(Self::file_name(&path));
                pb.suspend(|| tracing::info!("Downloading {}", path.display()));
            }
            SyncEvent::Downloaded {
                path,
                bytes,
                timestamp,
            } => {
                pb.suspend(|| match timestamp {
                    Some((at, source)) => tracing::debug!(
                        size_bytes = bytes,
                        ?source,
                        "Downloaded {} (mtime {})",
                        path.display(),
                        at
                    ),
                    None => tracing::debug!(size_bytes = bytes, "Downloaded {}", path.display()),
                });
                pb.inc(1);
            }
            SyncEvent::DownloadFailed { path, error } => {
                pb.suspend(|| {
                    tracing::error!("Error while downloading {}, cleaned up: {}", path.display(), error)
                });
            }
            SyncEvent::InvalidFilename { filename } => {
                pb.suspend(|| tracing::error!("Remote filename {:?} is not usable locally", filename));
                pb.inc(1);
            }
            SyncEvent::Linked { path } => {
                pb.suspend(|| tracing::info!("Linked {}", path.display()));
            }
            SyncEvent::Copied { path, link_error } => {
                pb.suspend(|| {
                    tracing::info!("Copied {} (hard link failed: {})", path.display(), link_error)
                });
            }
            SyncEvent::AlreadyLinked { path } => {
                pb.suspend(|| tracing::debug!("Already linked {}", path.display()));
            }
            SyncEvent::LinkFailed {
                path,
                link_error,
                copy_error,
            } => {
                pb.suspend(|| {
                    tracing::error!(
                        "Failed to link {} ({}), then failed to copy ({})",
                        path.display(),
                        link_error,
                        copy_error
                    )
                });
            }
            SyncEvent::Finished { report } => {
                pb.finish_and_clear();
                tracing::info!("── Summary ──");
                tracing::info!("  purged:     {}", report.purged);
                tracing::info!("  skipped:    {}", report.skipped);
                tracing::info!("  downloaded: {}", report.downloaded);
                tracing::info!("  linked:     {}", report.linked);
                tracing::info!("  copied:     {}", report.copied);
                if report.errors > 0 {
                    tracing::warn!("  errors:     {}", report.errors);
                }
            }
        }
    }
}

/// Captures events in order for assertions.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct RecordingObserver {
    events: std::sync::Mutex<Vec<SyncEvent>>,
}

#[cfg(test)]
impl RecordingObserver {
    pub(crate) fn events(&self) -> Vec<SyncEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl SyncObserver for RecordingObserver {
    fn on_event(&self, event: SyncEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_progress_bar_hidden_when_disabled() {
        let pb = create_progress_bar(true);
        assert!(pb.is_hidden());
    }

    #[test]
    fn test_create_progress_bar_respects_tty() {
        let pb = create_progress_bar(false);
        if std::io::stdout().is_terminal() {
            assert!(!pb.is_hidden());
        } else {
            assert!(pb.is_hidden());
        }
    }

    #[test]
    fn test_console_observer_tracks_progress() {
        let observer = ConsoleObserver::new(true);
        observer.on_event(SyncEvent::InventoryReady { total: 2 });
        observer.on_event(SyncEvent::Skipped {
            path: PathBuf::from("/photos/a.jpg"),
        });
        observer.on_event(SyncEvent::Downloaded {
            path: PathBuf::from("/photos/b.jpg"),
            bytes: 10,
            timestamp: None,
        });
        assert_eq!(observer.pb.length(), Some(2));
        assert_eq!(observer.pb.position(), 2);
    }

    #[test]
    fn test_recording_observer_keeps_order() {
        let observer = RecordingObserver::default();
        observer.on_event(SyncEvent::InventoryReady { total: 1 });
        observer.on_event(SyncEvent::Finished {
            report: SyncReport::default(),
        });
        let events = observer.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], SyncEvent::InventoryReady { total: 1 }));
        assert!(matches!(events[1], SyncEvent::Finished { .. }));
    }
}
