use thiserror::Error;

/// Errors from iCloud authentication. All are fatal.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Failed login: {0}")]
    FailedLogin(String),

    #[error("API error (HTTP {code}): {message}")]
    ApiError { code: u16, message: String },

    #[error("Two-factor authentication is required for this account; it is not supported")]
    TwoFactorRequired,

    #[error("Account belongs to the {0} domain; rerun with --domain {0}")]
    WrongDomain(String),

    #[error("Account data is missing {0}")]
    MissingField(&'static str),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("Invalid header value: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
