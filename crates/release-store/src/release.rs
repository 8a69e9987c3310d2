//! The release domain object persisted by the drivers.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::key::ReleaseKey;

/// Lifecycle status of a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    #[default]
    Unknown,
    Deployed,
    Deleted,
    Superseded,
    Failed,
    Deleting,
    PendingInstall,
    PendingUpgrade,
    PendingRollback,
}

impl Status {
    pub const ALL: [Status; 9] = [
        Status::Unknown,
        Status::Deployed,
        Status::Deleted,
        Status::Superseded,
        Status::Failed,
        Status::Deleting,
        Status::PendingInstall,
        Status::PendingUpgrade,
        Status::PendingRollback,
    ];

    /// Status code as stored in the `status` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Unknown => "UNKNOWN",
            Status::Deployed => "DEPLOYED",
            Status::Deleted => "DELETED",
            Status::Superseded => "SUPERSEDED",
            Status::Failed => "FAILED",
            Status::Deleting => "DELETING",
            Status::PendingInstall => "PENDING_INSTALL",
            Status::PendingUpgrade => "PENDING_UPGRADE",
            Status::PendingRollback => "PENDING_ROLLBACK",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Status::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown release status: {s}"))
    }
}

/// Deployment bookkeeping for a release
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Info {
    pub status: Status,
    pub first_deployed: Option<DateTime<Utc>>,
    pub last_deployed: Option<DateTime<Utc>>,
    pub deleted: Option<DateTime<Utc>>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub notes: String,
}

/// Chart the release was rendered from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartRef {
    pub name: String,
    pub version: String,
}

/// One deployed version of a named unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Release {
    pub name: String,
    pub version: u32,
    #[serde(default)]
    pub namespace: String,
    pub info: Info,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartRef>,
    #[serde(default)]
    pub config: serde_json::Value,
    #[serde(default)]
    pub manifest: String,
}

impl Release {
    /// A bare release with the given status and no chart, config or manifest.
    pub fn new(name: impl Into<String>, version: u32, status: Status) -> Self {
        Self {
            name: name.into(),
            version,
            namespace: "default".to_string(),
            info: Info {
                status,
                ..Info::default()
            },
            chart: None,
            config: serde_json::Value::Null,
            manifest: String::new(),
        }
    }

    pub fn status(&self) -> Status {
        self.info.status
    }

    /// Storage key derived from the release's own name and version.
    pub fn key(&self) -> crate::StoreResult<ReleaseKey> {
        ReleaseKey::new(self.name.clone(), self.version)
    }
}
