use serde::Deserialize;
use serde_json::Value;

use crate::icloud::error::ICloudError;

/// Response from `/records/query`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    #[serde(default)]
    pub records: Vec<Record>,
    #[serde(default)]
    pub server_error_code: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl QueryResponse {
    /// CloudKit reports request-level failures in the body of a 200.
    pub fn into_result(self) -> Result<Self, ICloudError> {
        match self.server_error_code {
            Some(code) => Err(ICloudError::ApiResponse {
                reason: self.reason.unwrap_or_default(),
                code,
            }),
            None => Ok(self),
        }
    }
}

/// A CloudKit record. Fields are kept as dynamic JSON because Apple's schema
/// varies by record type and changes without notice.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    #[serde(default)]
    pub record_name: String,
    #[serde(default)]
    pub record_type: String,
    #[serde(default)]
    pub fields: Value,
}
