//! iCloud password authentication.
//!
//! A single `POST /login` against the setup service yields the account
//! payload and session cookies. Accounts that demand two-factor verification
//! are rejected rather than prompted for.

pub mod endpoints;
pub mod error;
pub mod responses;
pub mod session;

use std::collections::HashMap;

use serde_json::{json, Value};
use uuid::Uuid;

use crate::config::Credentials;
use self::endpoints::Endpoints;
use self::error::AuthError;
pub use self::responses::AccountLoginResponse;
use self::session::Session;

const CLIENT_BUILD_NUMBER: &str = "2522Project44";
const CLIENT_MASTERING_NUMBER: &str = "2522B2";

/// Result of a successful authentication, including the account data payload.
pub struct AuthResult {
    pub session: Session,
    pub data: AccountLoginResponse,
}

impl std::fmt::Debug for AuthResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthResult")
            .field("session", &"<redacted>")
            .field("data", &"<...>")
            .finish()
    }
}

impl AuthResult {
    pub fn ckdatabasews_url(&self) -> Result<&str, AuthError> {
        self.data
            .ckdatabasews_url()
            .ok_or(AuthError::MissingField("webservices.ckdatabasews.url"))
    }

    /// Query parameters every CloudKit request must carry.
    pub fn service_params(&self) -> HashMap<String, Value> {
        let mut params = HashMap::new();
        params.insert(
            "clientBuildNumber".to_string(),
            Value::String(CLIENT_BUILD_NUMBER.to_string()),
        );
        params.insert(
            "clientMasteringNumber".to_string(),
            Value::String(CLIENT_MASTERING_NUMBER.to_string()),
        );
        params.insert(
            "clientId".to_string(),
            Value::String(self.session.client_id().to_string()),
        );
        if let Some(dsid) = self.data.dsid() {
            params.insert("dsid".to_string(), Value::String(dsid.to_string()));
        }
        params
    }
}

/// Log in with an Apple ID and password.
pub async fn authenticate(
    credentials: &Credentials,
    endpoints: &Endpoints,
) -> Result<AuthResult, AuthError> {
    let session = Session::new(&endpoints.home, format!("auth-{}", Uuid::new_v4()))?;

    tracing::debug!("Authenticating as {}", credentials.username);
    let body = json!({
        "apple_id": credentials.username,
        "password": credentials.password,
        "extended_login": false,
    });
    let response = session
        .post_json(
            &endpoints.login(),
            &[
                ("clientBuildNumber", CLIENT_BUILD_NUMBER),
                ("clientMasteringNumber", CLIENT_MASTERING_NUMBER),
                ("clientId", session.client_id()),
            ],
            &body,
        )
        .await?;

    let status = response.status();
    if matches!(status.as_u16(), 401 | 403 | 421) {
        return Err(AuthError::FailedLogin(
            "Invalid Apple ID or password".to_string(),
        ));
    }
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(AuthError::ApiError {
            code: status.as_u16(),
            message,
        });
    }

    let data: AccountLoginResponse = response.json().await?;
    if let Some(domain) = &data.domain_to_use {
        return Err(AuthError::WrongDomain(domain.clone()));
    }
    if check_requires_2fa(&data) {
        return Err(AuthError::TwoFactorRequired);
    }

    tracing::info!("Authentication completed successfully");
    Ok(AuthResult { session, data })
}

/// Apple's HSA2 (two-step verification v2) requires all three conditions:
/// the account uses HSAv2, the browser isn't trusted yet, and the account
/// has a device capable of receiving verification codes.
fn check_requires_2fa(data: &AccountLoginResponse) -> bool {
    let (hsa_version, has_qualifying_device) = match &data.ds_info {
        Some(ds) => (ds.hsa_version, ds.has_i_cloud_qualifying_device),
        None => (0, false),
    };

    hsa_version == 2
        && (data.hsa_challenge_required || !data.hsa_trusted_browser)
        && has_qualifying_device
}
