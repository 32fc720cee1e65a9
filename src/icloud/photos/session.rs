use serde_json::Value;

/// Minimal async HTTP surface used by the photos service. Kept as a trait so
/// the service can run over any client carrying the login cookies.
#[async_trait::async_trait]
pub trait PhotosSession: Send + Sync {
    async fn post(
        &self,
        url: &str,
        body: &str,
        headers: &[(&str, &str)],
    ) -> anyhow::Result<Value>;

    async fn get(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> anyhow::Result<reqwest::Response>;
}

#[async_trait::async_trait]
impl PhotosSession for reqwest::Client {
    async fn post(
        &self,
        url: &str,
        body: &str,
        headers: &[(&str, &str)],
    ) -> anyhow::Result<Value> {
        let mut builder = reqwest::Client::post(self, url).body(body.to_owned());
        for &(k, v) in headers {
            builder = builder.header(k, v);
        }
        let resp = builder.send().await?.error_for_status()?;
        let json: Value = resp.json().await?;
        Ok(json)
    }

    async fn get(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> anyhow::Result<reqwest::Response> {
        let mut builder = reqwest::Client::get(self, url);
        for &(k, v) in headers {
            builder = builder.header(k, v);
        }
        let resp = builder.send().await?;
        Ok(resp)
    }
}
