use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, ORIGIN, REFERER, USER_AGENT};
use reqwest::{Client, Response};
use serde_json::Value;

use super::error::AuthError;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP session for one run. Cookies set during login live only in memory and
/// authorize every later CloudKit and download request made with the same
/// client.
pub struct Session {
    client: Client,
    client_id: String,
}

impl Session {
    pub fn new(home_endpoint: &str, client_id: String) -> Result<Self, AuthError> {
        // Origin/Referer headers are required by Apple's CORS checks
        let mut default_headers = HeaderMap::new();
        default_headers.insert(ORIGIN, HeaderValue::from_str(home_endpoint)?);
        default_headers.insert(
            REFERER,
            HeaderValue::from_str(&format!("{}/", home_endpoint))?,
        );
        default_headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));

        // No overall timeout: it would also cap the body of large video downloads.
        let client = Client::builder()
            .cookie_provider(Arc::new(reqwest::cookie::Jar::default()))
            .default_headers(default_headers)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self { client, client_id })
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Handle sharing this session's cookie jar.
    pub fn http_client(&self) -> Client {
        self.client.clone()
    }

    pub async fn post_json(
        &self,
        url: &str,
        query: &[(&str, &str)],
        body: &Value,
    ) -> Result<Response, AuthError> {
        let response = self
            .client
            .post(url)
            .query(query)
            .header(CONTENT_TYPE, "application/json")
            .body(serde_json::to_string(body)?)
            .send()
            .await?;
        Ok(response)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}
