//! In-memory photo source for engine tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{stream, StreamExt};

use crate::download::error::DownloadError;
use crate::inventory::{ByteStream, DownloadHandle, Inventory, PhotoDescriptor, PhotoSource};

enum Payload {
    Complete(Vec<u8>),
    /// Yields these bytes, then a transport error.
    Truncated(Vec<u8>),
}

#[derive(Default)]
pub(crate) struct FakeSource {
    items: Vec<PhotoDescriptor>,
    payloads: HashMap<String, Payload>,
    opens: AtomicUsize,
}

impl FakeSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn push(mut self, filename: &str, created_at: &str, payload: Payload) -> Self {
        let key = format!("fake://{}/{}", self.items.len(), filename);
        self.items.push(PhotoDescriptor::new(
            filename,
            created_at,
            DownloadHandle::new(key.clone()),
        ));
        self.payloads.insert(key, payload);
        self
    }

    pub(crate) fn with_photo(self, filename: &str, created_at: &str, bytes: &[u8]) -> Self {
        self.push(filename, created_at, Payload::Complete(bytes.to_vec()))
    }

    pub(crate) fn with_failing_photo(self, filename: &str, created_at: &str, prefix: &[u8]) -> Self {
        self.push(filename, created_at, Payload::Truncated(prefix.to_vec()))
    }

    pub(crate) fn inventory(&self) -> Inventory {
        Inventory::new(self.items.clone())
    }

    /// Number of byte streams opened so far.
    pub(crate) fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

/// Split into two chunks so writers see more than one.
fn chunks(bytes: &[u8]) -> Vec<Result<Bytes, DownloadError>> {
    let mid = bytes.len() / 2;
    vec![
        Ok(Bytes::copy_from_slice(&bytes[..mid])),
        Ok(Bytes::copy_from_slice(&bytes[mid..])),
    ]
}

#[async_trait]
impl PhotoSource for FakeSource {
    async fn fetch_inventory(&self) -> anyhow::Result<Inventory> {
        Ok(self.inventory())
    }

    async fn open(&self, handle: &DownloadHandle) -> Result<ByteStream, DownloadError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let items = match self.payloads.get(handle.as_str()) {
            Some(Payload::Complete(bytes)) => chunks(bytes),
            Some(Payload::Truncated(prefix)) => {
                let mut items = chunks(prefix);
                items.push(Err(DownloadError::Other(anyhow::anyhow!(
                    "connection reset by peer"
                ))));
                items
            }
            None => return Err(DownloadError::HttpStatus { status: 404 }),
        };
        Ok(stream::iter(items).boxed())
    }
}
