use std::collections::HashMap;

use serde_json::{json, Value};
use tracing::debug;

use super::asset::PhotoAsset;
use super::cloudkit::{QueryResponse, Record};
use super::queries::{encode_params, DESIRED_KEYS_VALUES};
use super::session::PhotosSession;

/// A paged CloudKit listing. Borrows the owning service's session and
/// parameters; it lives only as long as one listing pass.
pub struct PhotoAlbum<'a> {
    name: &'a str,
    params: &'a HashMap<String, Value>,
    session: &'a dyn PhotosSession,
    service_endpoint: &'a str,
    list_type: &'a str,
    page_size: usize,
    zone_id: &'a Value,
}

impl<'a> PhotoAlbum<'a> {
    pub fn new(
        name: &'a str,
        params: &'a HashMap<String, Value>,
        session: &'a dyn PhotosSession,
        service_endpoint: &'a str,
        list_type: &'a str,
        page_size: usize,
        zone_id: &'a Value,
    ) -> Self {
        Self {
            name,
            params,
            session,
            service_endpoint,
            list_type,
            page_size,
            zone_id,
        }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    /// Fetch all photos in this album, handling pagination.
    pub async fn photos(&self) -> anyhow::Result<Vec<PhotoAsset>> {
        let mut all_assets: Vec<PhotoAsset> = Vec::new();
        let mut offset: u64 = 0;
        let url = format!(
            "{}/records/query?{}",
            self.service_endpoint,
            encode_params(self.params)
        );

        loop {
            let body = self.list_query(offset);
            let response = self
                .session
                .post(&url, &body.to_string(), &[("Content-type", "text/plain")])
                .await?;
            let response: QueryResponse = serde_json::from_value(response)?;
            let records = response.into_result()?.records;

            debug!(
                "Album '{}': got {} records at offset {}",
                self.name,
                records.len(),
                offset
            );

            let mut asset_records: HashMap<String, Record> = HashMap::new();
            let mut master_records: Vec<Record> = Vec::new();

            for rec in records {
                match rec.record_type.as_str() {
                    "CPLAsset" => {
                        if let Some(master_id) =
                            rec.fields["masterRef"]["value"]["recordName"].as_str()
                        {
                            asset_records.insert(master_id.to_string(), rec);
                        }
                    }
                    "CPLMaster" => master_records.push(rec),
                    _ => {}
                }
            }

            if master_records.is_empty() {
                break;
            }

            // The rank advances per master, paired or not.
            offset += master_records.len() as u64;
            for master in master_records {
                match asset_records.remove(&master.record_name) {
                    Some(asset) => all_assets.push(PhotoAsset::new(master, asset)),
                    None => debug!("Master {} has no asset record", master.record_name),
                }
            }
        }

        Ok(all_assets)
    }

    fn list_query(&self, offset: u64) -> Value {
        json!({
            "query": {
                "filterBy": [
                    {
                        "fieldName": "startRank",
                        "fieldValue": {"type": "INT64", "value": offset},
                        "comparator": "EQUALS",
                    },
                    {
                        "fieldName": "direction",
                        "fieldValue": {"type": "STRING", "value": "ASCENDING"},
                        "comparator": "EQUALS",
                    },
                ],
                "recordType": self.list_type,
            },
            "resultsLimit": self.page_size * 2,
            "desiredKeys": &*DESIRED_KEYS_VALUES,
            "zoneID": self.zone_id,
        })
    }
}

impl std::fmt::Debug for PhotoAlbum<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<PhotoAlbum: '{}'>", self.name)
    }
}
