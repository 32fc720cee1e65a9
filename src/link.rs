//! Secondary directory maintenance: hard link each synced photo, falling back
//! to a metadata-preserving copy when linking is not possible (for example
//! across filesystems).

use std::fs::FileTimes;
use std::io;
use std::path::Path;

/// Hard-link primitive. Swappable so the copy fallback can be exercised.
pub trait Linker: Send + Sync {
    fn hard_link(&self, original: &Path, link: &Path) -> io::Result<()>;
}

pub struct FsLinker;

impl Linker for FsLinker {
    fn hard_link(&self, original: &Path, link: &Path) -> io::Result<()> {
        std::fs::hard_link(original, link)
    }
}

#[derive(Debug)]
pub enum LinkOutcome {
    Linked,
    Copied { link_error: io::Error },
    AlreadyLinked,
    Failed {
        link_error: io::Error,
        copy_error: io::Error,
    },
}

/// Make `link_path` refer to the same bytes as `source`.
///
/// Anything already at `link_path` (file, directory or dangling symlink)
/// counts as linked and is left untouched. Blocking.
pub fn link_or_copy(linker: &dyn Linker, source: &Path, link_path: &Path) -> LinkOutcome {
    if link_path.symlink_metadata().is_ok() {
        return LinkOutcome::AlreadyLinked;
    }

    let link_error = match linker.hard_link(source, link_path) {
        Ok(()) => return LinkOutcome::Linked,
        Err(e) => e,
    };
    tracing::debug!(
        "Hard link {} -> {} failed: {}",
        link_path.display(),
        source.display(),
        link_error
    );

    match copy_preserving_times(source, link_path) {
        Ok(()) => LinkOutcome::Copied { link_error },
        Err(copy_error) => {
            // Don't leave a truncated copy that would later pass as linked.
            if let Err(e) = std::fs::remove_file(link_path) {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::warn!("Could not remove partial copy {}: {}", link_path.display(), e);
                }
            }
            LinkOutcome::Failed {
                link_error,
                copy_error,
            }
        }
    }
}

/// Byte copy that also carries over permissions and access/modification times.
fn copy_preserving_times(source: &Path, dest: &Path) -> io::Result<()> {
    std::fs::copy(source, dest)?;
    let meta = std::fs::metadata(source)?;
    let times = FileTimes::new()
        .set_accessed(meta.accessed()?)
        .set_modified(meta.modified()?);
    let file = std::fs::File::options().write(true).open(dest)?;
    file.set_times(times)
}
