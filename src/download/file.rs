use std::path::Path;

use futures_util::StreamExt;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use super::error::DownloadError;
use super::paths::part_path;
use crate::inventory::ByteStream;

/// Stream `body` into `target` through a hidden `.part` sibling.
///
/// The part file only replaces `target` once the stream has been drained and
/// flushed. On any failure it is removed, so an interrupted transfer leaves
/// nothing behind under either name. Returns the number of bytes written.
pub async fn write_stream(body: ByteStream, target: &Path) -> Result<u64, DownloadError> {
    let part = part_path(target);

    let written = match stream_to_part(body, &part).await {
        Ok(n) => n,
        Err(e) => {
            remove_part(&part).await;
            return Err(e);
        }
    };

    if let Err(e) = fs::rename(&part, target).await {
        remove_part(&part).await;
        return Err(e.into());
    }
    Ok(written)
}

async fn stream_to_part(mut body: ByteStream, part: &Path) -> Result<u64, DownloadError> {
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(part)
        .await?;

    let mut bytes_written: u64 = 0;
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| {
            tracing::warn!(
                "Body stream error for {} (bytes_so_far={}): {}",
                part.display(),
                bytes_written,
                e
            );
            match e {
                DownloadError::Http { source, .. } => DownloadError::Http {
                    source,
                    bytes_written,
                },
                other => other,
            }
        })?;
        file.write_all(&chunk).await?;
        bytes_written += chunk.len() as u64;
    }
    file.flush().await?;
    file.sync_all().await?;
    Ok(bytes_written)
}

async fn remove_part(part: &Path) {
    match fs::remove_file(part).await {
        Ok(()) => tracing::debug!("Removed partial download {}", part.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::error!("Failed to remove partial download {}: {}", part.display(), e),
    }
}
