//! Photos service: reads the primary library of iCloud's CloudKit-based
//! photos backend and exposes it to the sync engine as a [`PhotoSource`].

mod album;
mod asset;
pub mod cloudkit;
pub mod queries;
pub mod session;

pub use album::PhotoAlbum;
pub use asset::PhotoAsset;
pub use session::PhotosSession;

use std::collections::HashMap;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::download::error::DownloadError;
use crate::icloud::error::ICloudError;
use crate::inventory::{ByteStream, DownloadHandle, Inventory, PhotoSource};

use self::queries::{encode_params, ALL_PHOTOS_LIST_TYPE, PAGE_SIZE};

pub struct PhotosService {
    service_endpoint: String,
    session: Box<dyn PhotosSession>,
    params: HashMap<String, Value>,
    zone_id: Value,
}

impl std::fmt::Debug for PhotosService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhotosService")
            .field("service_endpoint", &self.service_endpoint)
            .finish_non_exhaustive()
    }
}

impl PhotosService {
    /// Create a new `PhotosService`.
    ///
    /// This checks that the primary library has finished indexing.
    pub async fn new(
        service_root: &str,
        session: Box<dyn PhotosSession>,
        mut params: HashMap<String, Value>,
    ) -> Result<Self, ICloudError> {
        params.insert("remapEnums".to_string(), Value::Bool(true));
        params.insert("getCurrentSyncToken".to_string(), Value::Bool(true));

        let service = Self {
            service_endpoint: build_service_endpoint(service_root, "private"),
            session,
            params,
            zone_id: json!({"zoneName": "PrimarySync"}),
        };
        service.check_indexing_state().await?;
        Ok(service)
    }

    async fn check_indexing_state(&self) -> Result<(), ICloudError> {
        let url = format!(
            "{}/records/query?{}",
            self.service_endpoint,
            encode_params(&self.params)
        );
        let body = json!({
            "query": {"recordType": "CheckIndexingState"},
            "zoneID": &self.zone_id,
        });

        let response = self
            .session
            .post(&url, &body.to_string(), &[("Content-type", "text/plain")])
            .await
            .map_err(|e| ICloudError::Connection(format!("{e:#}")))?;

        let query: cloudkit::QueryResponse = serde_json::from_value(response)?;
        let query = query.into_result()?;
        let indexing_state = query
            .records
            .first()
            .and_then(|r| r.fields["state"]["value"].as_str())
            .unwrap_or("");
        debug!("Library indexing state: {:?}", indexing_state);
        if indexing_state != "FINISHED" {
            return Err(ICloudError::IndexingNotFinished);
        }
        Ok(())
    }

    /// Return the "All Photos" album from the primary library.
    pub fn all(&self) -> PhotoAlbum<'_> {
        PhotoAlbum::new(
            "All Photos",
            &self.params,
            self.session.as_ref(),
            &self.service_endpoint,
            ALL_PHOTOS_LIST_TYPE,
            PAGE_SIZE,
            &self.zone_id,
        )
    }
}

fn build_service_endpoint(service_root: &str, library_type: &str) -> String {
    format!("{service_root}/database/1/com.apple.photos.cloud/production/{library_type}")
}

#[async_trait]
impl PhotoSource for PhotosService {
    async fn fetch_inventory(&self) -> anyhow::Result<Inventory> {
        let album = self.all();
        let assets = album.photos().await?;
        info!("Found {} assets in {}", assets.len(), album.name());
        let items = assets.iter().filter_map(PhotoAsset::to_descriptor).collect();
        Ok(Inventory::new(items))
    }

    async fn open(&self, handle: &DownloadHandle) -> Result<ByteStream, DownloadError> {
        let response = self
            .session
            .get(handle.as_str(), &[])
            .await
            .map_err(|e| match e.downcast::<reqwest::Error>() {
                Ok(source) => DownloadError::from(source),
                Err(e) => DownloadError::Other(e),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::HttpStatus {
                status: status.as_u16(),
            });
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(DownloadError::from))
            .boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::TryStreamExt;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const QUERY_PATH: &str = "/database/1/com.apple.photos.cloud/production/private/records/query";

    fn master(name: &str, filename: &str, url: Option<&str>) -> Value {
        let mut fields = json!({"filenameEnc": {"value": filename, "type": "STRING"}});
        if let Some(url) = url {
            fields["resOriginalRes"] = json!({"value": {"downloadURL": url, "size": 3}});
        }
        json!({"recordName": name, "recordType": "CPLMaster", "fields": fields})
    }

    fn asset(master_name: &str, asset_date_ms: i64) -> Value {
        json!({
            "recordName": format!("asset-{master_name}"),
            "recordType": "CPLAsset",
            "fields": {
                "masterRef": {"value": {"recordName": master_name}},
                "assetDate": {"value": asset_date_ms}
            }
        })
    }

    fn params() -> HashMap<String, Value> {
        let mut params = HashMap::new();
        params.insert("dsid".to_string(), json!("42"));
        params
    }

    async fn mount_indexing_state(server: &MockServer, state: &str) {
        Mock::given(method("POST"))
            .and(path(QUERY_PATH))
            .and(body_partial_json(json!({"query": {"recordType": "CheckIndexingState"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "records": [{"recordType": "CheckIndexingState", "fields": {"state": {"value": state}}}]
            })))
            .mount(server)
            .await;
    }

    async fn mount_page(server: &MockServer, records: Vec<Value>) {
        Mock::given(method("POST"))
            .and(path(QUERY_PATH))
            .and(body_partial_json(json!({"query": {"recordType": ALL_PHOTOS_LIST_TYPE}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"records": records})))
            .up_to_n_times(1)
            .mount(server)
            .await;
    }

    async fn service(server: &MockServer) -> PhotosService {
        PhotosService::new(&server.uri(), Box::new(reqwest::Client::new()), params())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_new_sends_service_params() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(QUERY_PATH))
            .and(query_param("dsid", "42"))
            .and(query_param("remapEnums", "true"))
            .and(query_param("getCurrentSyncToken", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "records": [{"fields": {"state": {"value": "FINISHED"}}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        service(&server).await;
    }

    #[tokio::test]
    async fn test_new_rejects_library_still_indexing() {
        let server = MockServer::start().await;
        mount_indexing_state(&server, "RUNNING").await;

        let err = PhotosService::new(&server.uri(), Box::new(reqwest::Client::new()), params())
            .await
            .unwrap_err();
        assert!(matches!(err, ICloudError::IndexingNotFinished));
    }

    #[tokio::test]
    async fn test_new_surfaces_http_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = PhotosService::new(&server.uri(), Box::new(reqwest::Client::new()), params())
            .await
            .unwrap_err();
        assert!(matches!(err, ICloudError::Connection(_)));
    }

    #[tokio::test]
    async fn test_fetch_inventory_pages_and_pairs_records() {
        let server = MockServer::start().await;
        mount_indexing_state(&server, "FINISHED").await;
        // 2020-01-01T00:00:00Z and 2021-01-01T00:00:00Z
        mount_page(
            &server,
            vec![
                master("M1", "old.jpg", Some("https://cdn.example.com/1")),
                asset("M1", 1_577_836_800_000),
                master("M2", "new.jpg", Some("https://cdn.example.com/2")),
                asset("M2", 1_609_459_200_000),
            ],
        )
        .await;
        mount_page(
            &server,
            vec![
                master("M3", "no-url.jpg", None),
                asset("M3", 1_609_459_200_000),
                master("M4", "orphan.jpg", Some("https://cdn.example.com/4")),
            ],
        )
        .await;
        mount_page(&server, vec![]).await;

        let inventory = service(&server).await.fetch_inventory().await.unwrap();

        let items: Vec<(&str, &str)> = inventory
            .iter()
            .map(|p| (p.filename.as_str(), p.created_at.as_str()))
            .collect();
        assert_eq!(
            items,
            [
                ("new.jpg", "2021-01-01T00:00:00Z"),
                ("old.jpg", "2020-01-01T00:00:00Z"),
            ]
        );

        let ranks: Vec<u64> = server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter_map(|req| {
                let body: Value = serde_json::from_slice(&req.body).ok()?;
                body["query"]["filterBy"][0]["fieldValue"]["value"].as_u64()
            })
            .collect();
        assert_eq!(ranks, [0, 2, 4]);
    }

    #[tokio::test]
    async fn test_fetch_inventory_reports_server_error() {
        let server = MockServer::start().await;
        mount_indexing_state(&server, "FINISHED").await;
        Mock::given(method("POST"))
            .and(path(QUERY_PATH))
            .and(body_partial_json(json!({"query": {"recordType": ALL_PHOTOS_LIST_TYPE}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "serverErrorCode": "ZONE_NOT_FOUND",
                "reason": "zone does not exist"
            })))
            .mount(&server)
            .await;

        let err = service(&server).await.fetch_inventory().await.unwrap_err();
        assert!(err.to_string().contains("ZONE_NOT_FOUND"));
    }

    #[tokio::test]
    async fn test_open_streams_body() {
        let server = MockServer::start().await;
        mount_indexing_state(&server, "FINISHED").await;
        Mock::given(method("GET"))
            .and(path("/cdn/photo"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpegdata".to_vec()))
            .mount(&server)
            .await;

        let service = service(&server).await;
        let handle = DownloadHandle::new(format!("{}/cdn/photo", server.uri()));
        let chunks: Vec<bytes::Bytes> = service.open(&handle).await.unwrap().try_collect().await.unwrap();
        assert_eq!(chunks.concat(), b"jpegdata");
    }

    #[tokio::test]
    async fn test_open_maps_http_status() {
        let server = MockServer::start().await;
        mount_indexing_state(&server, "FINISHED").await;
        Mock::given(method("GET"))
            .and(path("/cdn/gone"))
            .respond_with(ResponseTemplate::new(410))
            .mount(&server)
            .await;

        let service = service(&server).await;
        let handle = DownloadHandle::new(format!("{}/cdn/gone", server.uri()));
        let err = service.open(&handle).await.err().unwrap();
        assert!(matches!(err, DownloadError::HttpStatus { status: 410 }));
    }
}
