use thiserror::Error;

/// Failure while fetching or writing a photo. Always fatal to the run.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("HTTP error {status}")]
    HttpStatus { status: u16 },

    #[error("HTTP error after {bytes_written} bytes: {source}")]
    Http {
        source: reqwest::Error,
        bytes_written: u64,
    },

    #[error("Disk error: {0}")]
    Disk(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<reqwest::Error> for DownloadError {
    fn from(source: reqwest::Error) -> Self {
        DownloadError::Http {
            source,
            bytes_written: 0,
        }
    }
}

/// Why no creation date could be read from a file's embedded metadata.
/// Never fatal; the caller falls back to the remote `created_at`.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("unrecognized media container")]
    UnknownFormat,

    #[error("no creation date field")]
    NoCreationDate,

    #[error("EXIF parse error: {0}")]
    Exif(#[from] exif::Error),

    #[error("MP4 parse error: {0}")]
    Mp4(#[from] mp4::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
