use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::LazyLock;

use serde_json::Value;

/// Record type backing the "All Photos" view: every asset except hidden and
/// recently deleted ones, ordered by asset date.
pub(crate) const ALL_PHOTOS_LIST_TYPE: &str = "CPLAssetAndMasterByAssetDateWithoutHiddenOrDeleted";

/// Assets per page. Each asset arrives as a master plus an asset record, so
/// the request limit is twice this.
pub(crate) const PAGE_SIZE: usize = 100;

/// CloudKit field names requested in every listing query.
pub(crate) const DESIRED_KEYS: &[&str] = &[
    "recordName",
    "recordType",
    "recordChangeTag",
    "masterRef",
    "filenameEnc",
    "itemType",
    "resOriginalRes",
    "resOriginalFileType",
    "assetDate",
    "addedDate",
    "isDeleted",
    "isHidden",
];

pub(crate) static DESIRED_KEYS_VALUES: LazyLock<Vec<Value>> = LazyLock::new(|| {
    DESIRED_KEYS
        .iter()
        .map(|k| Value::String((*k).to_string()))
        .collect()
});

pub(crate) fn encode_params(params: &HashMap<String, Value>) -> String {
    let mut pairs: Vec<String> = params
        .iter()
        .map(|(k, v)| {
            let val: Cow<'_, str> = match v {
                Value::String(s) => Cow::Borrowed(s.as_str()),
                Value::Bool(b) => Cow::Owned(b.to_string()),
                Value::Number(n) => Cow::Owned(n.to_string()),
                other => Cow::Owned(other.to_string()),
            };
            format!("{}={}", urlencoding::encode(k), urlencoding::encode(&val))
        })
        .collect();
    pairs.sort();
    pairs.join("&")
}
