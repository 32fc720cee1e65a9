use std::path::PathBuf;

use thiserror::Error;

use crate::download::error::DownloadError;

/// Errors that abort a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Failed to fetch the remote inventory: {0:#}")]
    Inventory(anyhow::Error),

    #[error("Failed to read directory {}: {source}", .path.display())]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Download of {filename} failed: {source}")]
    Download {
        filename: String,
        source: DownloadError,
    },
}
