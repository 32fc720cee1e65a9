//! Removal of local files that no longer exist in the remote library.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::download::paths::is_hidden;
use crate::inventory::Inventory;
use crate::sync::error::SyncError;
use crate::sync::observer::{SyncEvent, SyncObserver};

/// File deletion primitive. Swappable so failed deletes can be exercised.
#[async_trait]
pub trait Remover: Send + Sync {
    async fn remove_file(&self, path: &Path) -> io::Result<()>;
}

pub struct FsRemover;

#[async_trait]
impl Remover for FsRemover {
    async fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path).await
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeSummary {
    pub purged: u64,
    pub failed: u64,
}

/// Delete every regular file in `dest_dir` whose name matches no inventory
/// item. Hidden entries, directories and symlinks are left alone.
///
/// The listing is taken in full before anything is removed. A failed delete
/// is reported and counted but does not stop the purge.
pub async fn purge_missing(
    dest_dir: &Path,
    inventory: &Inventory,
    remover: &dyn Remover,
    observer: &dyn SyncObserver,
) -> Result<PurgeSummary, SyncError> {
    let keep = inventory.local_names();
    let read_dir_err = |source| SyncError::ReadDir {
        path: dest_dir.to_path_buf(),
        source,
    };

    let mut entries = fs::read_dir(dest_dir).await.map_err(read_dir_err)?;
    let mut doomed: Vec<PathBuf> = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(read_dir_err)? {
        let name = entry.file_name().to_string_lossy().into_owned();
        tracing::debug!("Considering purge of {}", name);
        if is_hidden(&name) {
            continue;
        }
        // DirEntry::file_type does not follow symlinks.
        let file_type = match entry.file_type().await {
            Ok(ft) => ft,
            Err(e) => {
                tracing::warn!("Could not stat {}: {}", entry.path().display(), e);
                continue;
            }
        };
        if !file_type.is_file() || keep.contains(&name) {
            continue;
        }
        doomed.push(entry.path());
    }
    doomed.sort();

    let mut summary = PurgeSummary::default();
    for path in doomed {
        match remover.remove_file(&path).await {
            Ok(()) => {
                summary.purged += 1;
                observer.on_event(SyncEvent::Purged { path });
            }
            Err(e) => {
                summary.failed += 1;
                observer.on_event(SyncEvent::PurgeFailed {
                    path,
                    error: e.to_string(),
                });
            }
        }
    }
    Ok(summary)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::inventory::{DownloadHandle, PhotoDescriptor};
    use crate::sync::observer::RecordingObserver;
    use std::fs as stdfs;

    /// Refuses to delete files with the given name, as a read-only or busy
    /// file would.
    pub(crate) struct FailingRemover(pub(crate) &'static str);

    #[async_trait]
    impl Remover for FailingRemover {
        async fn remove_file(&self, path: &Path) -> io::Result<()> {
            if path.file_name().is_some_and(|n| n == self.0) {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"));
            }
            FsRemover.remove_file(path).await
        }
    }

    fn inventory(names: &[&str]) -> Inventory {
        Inventory::new(
            names
                .iter()
                .map(|n| PhotoDescriptor::new(*n, "2020-01-01T00:00:00Z", DownloadHandle::new(*n)))
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_purge_removes_only_missing_regular_files() {
        let dir = tempfile::tempdir().unwrap();
        stdfs::write(dir.path().join("a.jpg"), b"a").unwrap();
        stdfs::write(dir.path().join("c.jpg"), b"c").unwrap();
        stdfs::write(dir.path().join(".hidden.jpg"), b"h").unwrap();
        stdfs::create_dir(dir.path().join("subdir")).unwrap();
        let observer = RecordingObserver::default();

        let summary = purge_missing(dir.path(), &inventory(&["a.jpg", "b.jpg"]), &FsRemover, &observer)
            .await
            .unwrap();

        assert_eq!(summary, PurgeSummary { purged: 1, failed: 0 });
        assert!(dir.path().join("a.jpg").exists());
        assert!(!dir.path().join("c.jpg").exists());
        assert!(dir.path().join(".hidden.jpg").exists());
        assert!(dir.path().join("subdir").is_dir());
        assert_eq!(
            observer.events(),
            vec![SyncEvent::Purged {
                path: dir.path().join("c.jpg")
            }]
        );
    }

    #[tokio::test]
    async fn test_purge_with_empty_inventory_keeps_hidden_and_dirs() {
        let dir = tempfile::tempdir().unwrap();
        stdfs::write(dir.path().join("x.jpg"), b"x").unwrap();
        stdfs::write(dir.path().join("y.mov"), b"y").unwrap();
        stdfs::write(dir.path().join(".DS_Store"), b"").unwrap();
        stdfs::create_dir(dir.path().join(".thumbs")).unwrap();

        let summary = purge_missing(dir.path(), &Inventory::default(), &FsRemover, &RecordingObserver::default())
            .await
            .unwrap();

        assert_eq!(summary.purged, 2);
        let mut left: Vec<String> = stdfs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        left.sort();
        assert_eq!(left, [".DS_Store", ".thumbs"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_purge_skips_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let target = outside.path().join("real.jpg");
        stdfs::write(&target, b"r").unwrap();
        std::os::unix::fs::symlink(&target, dir.path().join("link.jpg")).unwrap();

        let summary = purge_missing(dir.path(), &Inventory::default(), &FsRemover, &RecordingObserver::default())
            .await
            .unwrap();

        assert_eq!(summary.purged, 0);
        assert!(dir.path().join("link.jpg").symlink_metadata().is_ok());
        assert!(target.exists());
    }

    #[tokio::test]
    async fn test_purge_matches_cleaned_remote_names() {
        let dir = tempfile::tempdir().unwrap();
        stdfs::write(dir.path().join("photo1.jpg"), b"p").unwrap();

        let summary = purge_missing(dir.path(), &inventory(&["photo:1.jpg"]), &FsRemover, &RecordingObserver::default())
            .await
            .unwrap();

        assert_eq!(summary.purged, 0);
        assert!(dir.path().join("photo1.jpg").exists());
    }

    #[tokio::test]
    async fn test_purge_missing_directory_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = purge_missing(&missing, &Inventory::default(), &FsRemover, &RecordingObserver::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::ReadDir { .. }));
    }

    #[tokio::test]
    async fn test_failed_delete_is_counted_and_purge_continues() {
        let dir = tempfile::tempdir().unwrap();
        stdfs::write(dir.path().join("c.jpg"), b"c").unwrap();
        stdfs::write(dir.path().join("d.jpg"), b"d").unwrap();
        let observer = RecordingObserver::default();

        let summary = purge_missing(
            dir.path(),
            &inventory(&["a.jpg"]),
            &FailingRemover("c.jpg"),
            &observer,
        )
        .await
        .unwrap();

        assert_eq!(summary, PurgeSummary { purged: 1, failed: 1 });
        assert!(dir.path().join("c.jpg").exists());
        assert!(!dir.path().join("d.jpg").exists());
        assert_eq!(
            observer.events(),
            vec![
                SyncEvent::PurgeFailed {
                    path: dir.path().join("c.jpg"),
                    error: "permission denied".to_string(),
                },
                SyncEvent::Purged {
                    path: dir.path().join("d.jpg")
                },
            ]
        );
    }
}
