use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use tracing::warn;

use super::cloudkit::Record;
use crate::inventory::{DownloadHandle, PhotoDescriptor, CREATED_AT_FORMAT};

/// A photo or video, joined from its `CPLMaster` and `CPLAsset` records.
#[derive(Debug, Clone)]
pub struct PhotoAsset {
    master: Record,
    asset: Record,
}

impl PhotoAsset {
    pub fn new(master: Record, asset: Record) -> Self {
        Self { master, asset }
    }

    /// The unique record name from the master record.
    pub fn id(&self) -> &str {
        &self.master.record_name
    }

    /// Decode the filename from the `filenameEnc` field.
    /// Returns `None` when the field is absent or undecodable.
    pub fn filename(&self) -> Option<String> {
        let enc = &self.master.fields["filenameEnc"];
        let value = enc["value"].as_str()?;
        match enc["type"].as_str().unwrap_or("STRING") {
            "STRING" => Some(value.to_string()),
            "ENCRYPTED_BYTES" => {
                let decoded = base64::engine::general_purpose::STANDARD
                    .decode(value)
                    .ok()?;
                String::from_utf8(decoded).ok()
            }
            other => {
                warn!("Unsupported filenameEnc type: {}", other);
                None
            }
        }
    }

    /// When the photo/video was taken, in UTC.
    pub fn asset_date(&self) -> Option<DateTime<Utc>> {
        self.asset.fields["assetDate"]["value"]
            .as_f64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms as i64).single())
    }

    /// Signed download URL of the original resource.
    pub fn original_url(&self) -> Option<&str> {
        self.master.fields["resOriginalRes"]["value"]["downloadURL"].as_str()
    }

    /// Convert into the engine's descriptor, or `None` if a required field is
    /// missing.
    pub fn to_descriptor(&self) -> Option<PhotoDescriptor> {
        let Some(filename) = self.filename() else {
            warn!("Skipping asset {}: no filename", self.id());
            return None;
        };
        let Some(url) = self.original_url() else {
            warn!("Skipping {} ({}): no original resource", filename, self.id());
            return None;
        };
        let Some(created) = self.asset_date() else {
            warn!("Skipping {} ({}): no asset date", filename, self.id());
            return None;
        };
        Some(PhotoDescriptor::new(
            filename,
            created.format(CREATED_AT_FORMAT).to_string(),
            DownloadHandle::new(url),
        ))
    }
}

impl std::fmt::Display for PhotoAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<PhotoAsset: id={}>", self.id())
    }
}
