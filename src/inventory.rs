//! Remote inventory model and the seam through which the sync engine talks to
//! the photo service.
//!
//! The engine never sees a live album handle: a [`PhotoSource`] produces one
//! immutable [`Inventory`] per run and opens byte streams on demand.

use std::collections::HashSet;
use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, NaiveDateTime, Utc};
use futures_util::stream::BoxStream;

use crate::download::error::DownloadError;
use crate::download::paths::clean_filename;

/// Wire format of [`PhotoDescriptor::created_at`].
pub const CREATED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Raw payload of a single photo, yielded chunk by chunk.
pub type ByteStream = BoxStream<'static, Result<Bytes, DownloadError>>;

/// Opaque capability for fetching one photo's bytes. Only the source that
/// produced it knows how to interpret the contents.
#[derive(Clone, PartialEq, Eq)]
pub struct DownloadHandle(String);

impl DownloadHandle {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

// Handles are usually signed CDN URLs; keep them out of logs.
impl fmt::Debug for DownloadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DownloadHandle(<redacted>)")
    }
}

/// One remote photo as reported by the service.
#[derive(Debug, Clone)]
pub struct PhotoDescriptor {
    pub filename: String,
    pub created_at: String,
    pub handle: DownloadHandle,
}

impl PhotoDescriptor {
    pub fn new(
        filename: impl Into<String>,
        created_at: impl Into<String>,
        handle: DownloadHandle,
    ) -> Self {
        Self {
            filename: filename.into(),
            created_at: created_at.into(),
            handle,
        }
    }

    /// Name of the file on disk. This is the join key between local and
    /// remote state, for downloads, purges and links alike.
    pub fn local_name(&self) -> String {
        clean_filename(&self.filename)
    }
}

/// Parse a remote `created_at` string.
///
/// Accepts the service's `%Y-%m-%dT%H:%M:%SZ` form and, more leniently, any
/// RFC 3339 timestamp.
pub fn parse_created_at(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, CREATED_AT_FORMAT)
        .map(|naive| naive.and_utc())
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })
}

/// The full remote listing for one run, newest first. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    items: Vec<PhotoDescriptor>,
}

impl Inventory {
    /// Build an inventory, ordering items by `created_at` descending. The
    /// sort is stable, so items with equal dates keep the source order.
    pub fn new(mut items: Vec<PhotoDescriptor>) -> Self {
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn first(&self) -> Option<&PhotoDescriptor> {
        self.items.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PhotoDescriptor> {
        self.items.iter()
    }

    /// On-disk names of every item, for membership checks against a local
    /// directory listing.
    pub fn local_names(&self) -> HashSet<String> {
        self.items.iter().map(PhotoDescriptor::local_name).collect()
    }
}

impl<'a> IntoIterator for &'a Inventory {
    type Item = &'a PhotoDescriptor;
    type IntoIter = std::slice::Iter<'a, PhotoDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// A remote photo library as seen by the sync engine.
#[async_trait]
pub trait PhotoSource: Send + Sync {
    /// List every photo currently in the library.
    async fn fetch_inventory(&self) -> anyhow::Result<Inventory>;

    /// Start streaming the bytes behind `handle`.
    async fn open(&self, handle: &DownloadHandle) -> Result<ByteStream, DownloadError>;
}
