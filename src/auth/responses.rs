use serde::Deserialize;

/// Response from `/login`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountLoginResponse {
    #[serde(default)]
    pub ds_info: Option<DsInfo>,
    #[serde(default)]
    pub webservices: Option<Webservices>,
    #[serde(default)]
    pub hsa_challenge_required: bool,
    #[serde(default)]
    pub hsa_trusted_browser: bool,
    #[serde(default)]
    pub domain_to_use: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DsInfo {
    #[serde(default)]
    pub hsa_version: i64,
    #[serde(default)]
    pub dsid: Option<String>,
    #[serde(default)]
    pub has_i_cloud_qualifying_device: bool,
}

#[derive(Debug, Deserialize)]
pub struct Webservices {
    #[serde(default)]
    pub ckdatabasews: Option<WebserviceEndpoint>,
}

#[derive(Debug, Deserialize)]
pub struct WebserviceEndpoint {
    pub url: String,
}

impl AccountLoginResponse {
    pub fn dsid(&self) -> Option<&str> {
        self.ds_info.as_ref()?.dsid.as_deref()
    }

    pub fn ckdatabasews_url(&self) -> Option<&str> {
        Some(self.webservices.as_ref()?.ckdatabasews.as_ref()?.url.as_str())
    }
}
