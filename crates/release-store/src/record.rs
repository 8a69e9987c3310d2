//! The persisted release row.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::codec::{decode_release, encode_release};
use crate::error::StoreResult;
use crate::key::ReleaseKey;
use crate::labels::{LabelColumns, LabelField};
use crate::release::Release;

/// Owner recorded on rows written by this subsystem unless configured otherwise.
pub const DEFAULT_OWNER: &str = "TILLER";

/// One row of the `releases` table.
///
/// `key`, `name`, `version`, `owner` and `created_at` are fixed at creation;
/// updates only touch `body`, `status` and `modified_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseRecord {
    pub key: String,
    pub body: String,
    pub name: String,
    pub version: u32,
    pub status: String,
    pub owner: String,
    /// Epoch seconds
    pub created_at: i64,
    /// Epoch seconds, absent until the first update
    #[serde(default)]
    pub modified_at: Option<i64>,
}

impl ReleaseRecord {
    /// Build a fresh row for `key`, encoding `release` and stamping `created_at`.
    pub fn new(key: &ReleaseKey, release: &Release, owner: &str) -> StoreResult<Self> {
        Ok(Self {
            key: key.to_string(),
            body: encode_release(release)?,
            name: key.name().to_string(),
            version: key.version(),
            status: release.status().as_str().to_string(),
            owner: owner.to_string(),
            created_at: Utc::now().timestamp(),
            modified_at: None,
        })
    }

    pub fn decode(&self) -> StoreResult<Release> {
        decode_release(&self.body)
    }

    /// The row as written to the backend, with label fields stored under
    /// their configured columns. An unset `modified_at` is left out.
    pub fn to_row(&self, columns: &LabelColumns) -> serde_json::Value {
        let mut row = serde_json::Map::new();
        row.insert("key".to_string(), self.key.clone().into());
        row.insert("body".to_string(), self.body.clone().into());
        for field in LabelField::ALL {
            if let Some(value) = field.value_of(self) {
                row.insert(columns.column(field).to_string(), value.to_json());
            }
        }
        serde_json::Value::Object(row)
    }
}

/// Current time as epoch seconds, used for `modified_at`.
pub(crate) fn now_epoch() -> i64 {
    Utc::now().timestamp()
}
