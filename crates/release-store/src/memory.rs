//! In-memory release driver
//!
//! Keeps encoded [`ReleaseRecord`] rows in a mutex-guarded map and honours
//! the same contract as the SurrealDB driver, so callers and tests can swap
//! it in without a database.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::{instrument, warn};

use crate::codec::encode_release;
use crate::config::DriverOptions;
use crate::driver::{Driver, ReleasePredicate};
use crate::error::{StoreError, StoreResult};
use crate::key::ReleaseKey;
use crate::labels::{LabelField, LabelFilter};
use crate::record::{now_epoch, ReleaseRecord};
use crate::release::Release;

/// Name reported by [`MemoryDriver`].
pub const MEMORY_DRIVER_NAME: &str = "Memory";

/// In-memory driver backed by a `BTreeMap<key, ReleaseRecord>`.
#[derive(Debug, Default)]
pub struct MemoryDriver {
    records: Mutex<BTreeMap<String, ReleaseRecord>>,
    options: DriverOptions,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: DriverOptions) -> Self {
        Self {
            records: Mutex::default(),
            options,
        }
    }

    /// Number of rows held, across all owners.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.records()?.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.records()?.is_empty())
    }

    fn records(&self) -> StoreResult<MutexGuard<'_, BTreeMap<String, ReleaseRecord>>> {
        self.records
            .lock()
            .map_err(|_| StoreError::Backend("memory driver lock poisoned".to_string()))
    }

    fn owned<'a>(&self, record: Option<&'a ReleaseRecord>) -> Option<&'a ReleaseRecord> {
        record.filter(|r| r.owner == self.options.owner)
    }

    fn decode_all<'a>(rows: impl Iterator<Item = &'a ReleaseRecord>) -> Vec<Release> {
        rows.filter_map(|record| match record.decode() {
            Ok(release) => Some(release),
            Err(e) => {
                warn!(key = %record.key, error = %e, "skipping undecodable release");
                None
            }
        })
        .collect()
    }
}

#[async_trait]
impl Driver for MemoryDriver {
    fn name(&self) -> &'static str {
        MEMORY_DRIVER_NAME
    }

    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> StoreResult<Release> {
        let key = ReleaseKey::parse(key)?;
        let records = self.records()?;
        self.owned(records.get(&key.to_string()))
            .ok_or_else(|| StoreError::ReleaseNotFound {
                key: key.to_string(),
            })?
            .decode()
    }

    #[instrument(skip_all)]
    async fn list(&self, filter: &ReleasePredicate<'_>) -> StoreResult<Vec<Release>> {
        let records = self.records()?;
        let owner = &self.options.owner;
        let mut releases = Self::decode_all(records.values().filter(|r| &r.owner == owner));
        releases.retain(|release| filter(release));
        Ok(releases)
    }

    #[instrument(skip(self, labels), fields(labels = %labels))]
    async fn query(&self, labels: &LabelFilter) -> StoreResult<Vec<Release>> {
        let unknown = self.options.unknown_labels;
        // Validate the filter before touching the rows.
        labels.resolve(unknown)?;

        let records = self.records()?;
        let mut matching = Vec::new();
        for record in records.values().filter(|r| r.owner == self.options.owner) {
            if labels.matches(record, unknown)? {
                matching.push(record);
            }
        }

        let releases = Self::decode_all(matching.into_iter());
        if releases.is_empty() {
            return Err(StoreError::ReleaseNotFound {
                key: labels
                    .get(LabelField::Name)
                    .map(str::to_string)
                    .unwrap_or_else(|| labels.to_string()),
            });
        }
        Ok(releases)
    }

    #[instrument(skip(self, release))]
    async fn create(&self, key: &str, release: &Release) -> StoreResult<()> {
        let key = ReleaseKey::parse(key)?;
        let record = ReleaseRecord::new(&key, release, &self.options.owner)?;

        let mut records = self.records()?;
        if records.contains_key(&record.key) {
            return Err(StoreError::ReleaseExists {
                key: record.key,
            });
        }
        records.insert(record.key.clone(), record);
        Ok(())
    }

    #[instrument(skip(self, release))]
    async fn update(&self, key: &str, release: &Release) -> StoreResult<()> {
        let key = ReleaseKey::parse(key)?;
        let body = encode_release(release)?;

        let mut records = self.records()?;
        let record = records
            .get_mut(&key.to_string())
            .filter(|r| r.owner == self.options.owner)
            .ok_or_else(|| StoreError::ReleaseNotFound {
                key: key.to_string(),
            })?;
        record.body = body;
        record.status = release.status().as_str().to_string();
        record.modified_at = Some(now_epoch());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, key: &str) -> StoreResult<Option<Release>> {
        let key = ReleaseKey::parse(key)?.to_string();
        let mut records = self.records()?;
        if self.owned(records.get(&key)).is_none() {
            return Err(StoreError::ReleaseNotFound { key });
        }
        let Some(removed) = records.remove(&key) else {
            return Err(StoreError::ReleaseNotFound { key });
        };
        match removed.decode() {
            Ok(release) => Ok(Some(release)),
            Err(e) => {
                warn!(key = %key, error = %e, "deleted release had an undecodable body");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::Status;

    fn corrupt_record(name: &str, version: u32) -> ReleaseRecord {
        let key = ReleaseKey::new(name, version).unwrap();
        let release = Release::new(name, version, Status::Deployed);
        let mut record = ReleaseRecord::new(&key, &release, "TILLER").unwrap();
        record.body = "%%% not a release %%%".to_string();
        record
    }

    async fn seeded() -> MemoryDriver {
        let driver = MemoryDriver::new();
        for version in 1..=4 {
            driver
                .create(
                    &format!("app.v{version}"),
                    &Release::new("app", version, Status::Superseded),
                )
                .await
                .unwrap();
        }
        let corrupt = corrupt_record("app", 5);
        driver
            .records()
            .unwrap()
            .insert(corrupt.key.clone(), corrupt);
        driver
    }

    #[tokio::test]
    async fn list_and_query_skip_corrupt_rows() {
        let driver = seeded().await;
        assert_eq!(driver.len().unwrap(), 5);

        assert_eq!(driver.list(&|_| true).await.unwrap().len(), 4);
        let queried = driver
            .query(&LabelFilter::new().with("NAME", "app"))
            .await
            .unwrap();
        assert_eq!(queried.len(), 4);

        let err = driver
            .query(&LabelFilter::new().with("VERSION", "5"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn get_surfaces_decode_errors() {
        let driver = seeded().await;
        let err = driver.get("app.v5").await.unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)), "unexpected error: {err:?}");
    }

    #[tokio::test]
    async fn delete_of_corrupt_row_still_removes_it() {
        let driver = seeded().await;

        assert_eq!(driver.delete("app.v5").await.unwrap(), None);
        assert!(driver.get("app.v5").await.unwrap_err().is_not_found());
        assert_eq!(driver.len().unwrap(), 4);
    }
}
