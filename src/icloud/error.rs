use thiserror::Error;

/// Errors from the CloudKit photos backend.
#[derive(Error, Debug)]
pub enum ICloudError {
    #[error("API response error: {reason} (code: {code})")]
    ApiResponse { reason: String, code: String },
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Photo library not finished indexing")]
    IndexingNotFinished,
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
