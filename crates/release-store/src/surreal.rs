//! SurrealDB-backed release driver
//!
//! Rows live in the schemafull `releases` table (see [`crate::migrations`]).
//! Each operation is a single SurrealQL statement or transaction with bound
//! parameters. The record id of a row is its key, and label fields are stored
//! under the columns configured in [`LabelColumns`].

use std::sync::OnceLock;

use async_trait::async_trait;
use futures::lock::Mutex;
use serde::Deserialize;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info, instrument, warn};

use crate::codec::{decode_release, encode_release};
use crate::config::{connect, ConnectionConfig, DriverOptions};
use crate::driver::{Driver, ReleasePredicate};
use crate::error::{StoreError, StoreResult};
use crate::key::ReleaseKey;
use crate::labels::{LabelColumns, LabelField, LabelFilter, LabelTranslator, Predicate};
use crate::migrations;
use crate::record::{now_epoch, ReleaseRecord};
use crate::release::Release;

/// Name reported by [`SurrealDriver`].
pub const SURREAL_DRIVER_NAME: &str = "SurrealDB";

/// Insert-if-absent. The existence check and the insert commit together or
/// not at all.
const CREATE_RELEASE: &str = r#"
    BEGIN TRANSACTION;
    IF record::exists(type::thing('releases', $key)) {
        THROW 'release key already exists';
    };
    CREATE type::thing('releases', $key) CONTENT $row;
    COMMIT TRANSACTION;
"#;

/// Creates issued from this process never interleave with each other.
fn create_lock() -> &'static Mutex<()> {
    static CREATE_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    CREATE_LOCK.get_or_init(|| Mutex::new(()))
}

#[derive(Deserialize)]
struct KeyRow {
    key: String,
}

#[derive(Deserialize)]
struct BodyRow {
    key: String,
    body: String,
}

/// SurrealDB-backed implementation of [`Driver`].
#[derive(Clone)]
pub struct SurrealDriver {
    db: Surreal<Any>,
    owner: String,
    translator: LabelTranslator,
    select_sql: String,
}

impl SurrealDriver {
    /// Wrap an established connection. The schema is expected to exist.
    pub fn new(db: Surreal<Any>) -> Self {
        Self::with_options(db, DriverOptions::default())
    }

    /// Wrap an established connection whose schema was created with
    /// `options.columns` (see [`migrations::init_schema_with`]).
    pub fn with_options(db: Surreal<Any>, options: DriverOptions) -> Self {
        let select_sql = select_sql(&options.columns);
        Self {
            db,
            owner: options.owner,
            translator: LabelTranslator::new(options.columns, options.unknown_labels),
            select_sql,
        }
    }

    /// Create an in-memory instance for testing.
    ///
    /// Connects to `mem://` and runs `init_schema`.
    pub async fn in_memory() -> StoreResult<Self> {
        Self::in_memory_with(DriverOptions::default()).await
    }

    /// In-memory instance with the schema laid out for `options`.
    pub async fn in_memory_with(options: DriverOptions) -> StoreResult<Self> {
        let db = connect(&ConnectionConfig::in_memory()).await?;
        migrations::init_schema_with(&db, &options.columns).await?;

        info!("SurrealDriver connected (in-memory)");
        Ok(Self::with_options(db, options))
    }

    /// Connect with `config`, bootstrap the schema and apply `options`.
    pub async fn connect(config: &ConnectionConfig, options: DriverOptions) -> StoreResult<Self> {
        let db = connect(config).await?;
        migrations::init_schema_with(&db, &options.columns).await?;
        Ok(Self::with_options(db, options))
    }

    /// Underlying connection handle.
    pub fn db(&self) -> &Surreal<Any> {
        &self.db
    }

    // -- private helpers -----------------------------------------------------

    fn column(&self, field: LabelField) -> &str {
        self.translator.columns().column(field)
    }

    /// Run `SELECT ... WHERE <predicate>` and return the raw rows.
    async fn select(&self, predicate: Predicate) -> StoreResult<Vec<ReleaseRecord>> {
        let sql = format!("{} WHERE {}", self.select_sql, predicate.where_clause());
        debug!(%sql, "selecting releases");

        let mut query = self.db.query(sql);
        for (param, value) in predicate.bindings() {
            query = query.bind((param.clone(), value.clone()));
        }

        let mut res = query.await?;
        let rows: Vec<ReleaseRecord> = res.take(0)?;
        Ok(rows)
    }

    /// `<owner column> = $owner`, the scope of every statement this driver issues.
    fn owner_predicate(&self) -> Predicate {
        let mut predicate = Predicate::default();
        predicate.push_eq(
            self.column(LabelField::Owner),
            "owner",
            serde_json::Value::String(self.owner.clone()),
        );
        predicate
    }

    /// `<owner column> = $owner AND key = $key`
    fn key_predicate(&self, key: &ReleaseKey) -> Predicate {
        let mut predicate = self.owner_predicate();
        predicate.push_eq("key", "key", serde_json::Value::String(key.to_string()));
        predicate
    }

    async fn exists(&self, key: &ReleaseKey) -> StoreResult<bool> {
        Ok(!self.select(self.key_predicate(key)).await?.is_empty())
    }

    /// Decode rows, dropping (and logging) the ones whose body is corrupt.
    fn decode_rows(rows: Vec<ReleaseRecord>) -> Vec<Release> {
        rows.into_iter()
            .filter_map(|record| match record.decode() {
                Ok(release) => Some(release),
                Err(e) => {
                    warn!(key = %record.key, error = %e, "skipping undecodable release");
                    None
                }
            })
            .collect()
    }
}

/// Projection that reads mapped columns back under the row's field names.
fn select_sql(columns: &LabelColumns) -> String {
    let fields: Vec<String> = LabelField::ALL
        .into_iter()
        .map(|field| {
            let column = columns.column(field);
            let name = field.default_column();
            if column == name {
                column.to_string()
            } else {
                format!("{column} AS {name}")
            }
        })
        .collect();
    format!("SELECT key, body, {} FROM releases", fields.join(", "))
}

/// Whether a backend error says the key or a unique index entry is taken.
fn is_unique_violation(err: &surrealdb::Error) -> bool {
    let message = err.to_string();
    message.contains("already exists") || message.contains("already contains")
}

/// Optimistic transaction conflict: another writer touched the same keys first.
fn is_write_conflict(err: &surrealdb::Error) -> bool {
    let message = err.to_string();
    message.contains("read or write conflict") || message.contains("can be retried")
}

#[async_trait]
impl Driver for SurrealDriver {
    fn name(&self) -> &'static str {
        SURREAL_DRIVER_NAME
    }

    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> StoreResult<Release> {
        let key = ReleaseKey::parse(key)?;
        let rows = self.select(self.key_predicate(&key)).await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::ReleaseNotFound {
                key: key.to_string(),
            })?
            .decode()
    }

    #[instrument(skip_all)]
    async fn list(&self, filter: &ReleasePredicate<'_>) -> StoreResult<Vec<Release>> {
        let rows = self.select(self.owner_predicate()).await?;
        debug!(rows = rows.len(), "listing releases");

        let mut releases = Self::decode_rows(rows);
        releases.retain(|release| filter(release));
        Ok(releases)
    }

    #[instrument(skip(self, labels), fields(labels = %labels))]
    async fn query(&self, labels: &LabelFilter) -> StoreResult<Vec<Release>> {
        let predicate = self.translator.translate_into(self.owner_predicate(), labels)?;
        let releases = Self::decode_rows(self.select(predicate).await?);

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
        let record = ReleaseRecord::new(&key, release, &self.owner)?;
        let row = record.to_row(self.translator.columns());

        let _guard = create_lock().lock().await;
        debug!(key = %key, "creating release");

        let mut errors: Vec<(usize, surrealdb::Error)> = match self
            .db
            .query(CREATE_RELEASE)
            .bind(("key", record.key))
            .bind(("row", row))
            .await
        {
            Ok(mut response) => response.take_errors().into_iter().collect(),
            Err(e) => vec![(0, e)],
        };
        errors.sort_by_key(|(index, _)| *index);

        if errors.is_empty() {
            return Ok(());
        }
        let exists = StoreError::ReleaseExists {
            key: key.to_string(),
        };
        if errors.iter().any(|(_, e)| is_unique_violation(e)) {
            return Err(exists);
        }
        // A writer outside this process won the race; the row decides which one.
        if errors.iter().any(|(_, e)| is_write_conflict(e)) && self.exists(&key).await? {
            return Err(exists);
        }
        match errors.into_iter().next() {
            Some((_, e)) => Err(e.into()),
            None => Ok(()),
        }
    }

    #[instrument(skip(self, release))]
    async fn update(&self, key: &str, release: &Release) -> StoreResult<()> {
        let key = ReleaseKey::parse(key)?;
        let body = encode_release(release)?;

        debug!(key = %key, "updating release");

        let sql = format!(
            "UPDATE releases SET body = $body, {status} = $status, {modified_at} = $modified_at \
             WHERE key = $key AND {owner} = $owner RETURN AFTER",
            status = self.column(LabelField::Status),
            modified_at = self.column(LabelField::ModifiedAt),
            owner = self.column(LabelField::Owner),
        );
        let mut res = self
            .db
            .query(sql)
            .bind(("body", body))
            .bind(("status", release.status().as_str().to_string()))
            .bind(("modified_at", now_epoch()))
            .bind(("key", key.to_string()))
            .bind(("owner", self.owner.clone()))
            .await?;

        let updated: Vec<KeyRow> = res.take(0)?;
        if updated.is_empty() {
            return Err(StoreError::ReleaseNotFound {
                key: key.to_string(),
            });
        }
        debug!(key = %updated[0].key, "release updated");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, key: &str) -> StoreResult<Option<Release>> {
        let key = ReleaseKey::parse(key)?;

        debug!(key = %key, "deleting release");

        let sql = format!(
            "DELETE FROM releases WHERE key = $key AND {owner} = $owner RETURN BEFORE",
            owner = self.column(LabelField::Owner),
        );
        let mut res = self
            .db
            .query(sql)
            .bind(("key", key.to_string()))
            .bind(("owner", self.owner.clone()))
            .await?;

        let deleted: Vec<BodyRow> = res.take(0)?;
        let removed = deleted
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::ReleaseNotFound {
                key: key.to_string(),
            })?;

        match decode_release(&removed.body) {
            Ok(release) => Ok(Some(release)),
            Err(e) => {
                warn!(key = %removed.key, error = %e, "deleted release had an undecodable body");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_driver_connects() {
        let driver = SurrealDriver::in_memory().await;
        assert!(driver.is_ok(), "Failed to connect: {:?}", driver.err());
        assert_eq!(driver.unwrap().name(), "SurrealDB");
    }

    async fn raw_create(driver: &SurrealDriver, record: &ReleaseRecord) -> surrealdb::Result<()> {
        driver
            .db()
            .query("CREATE type::thing('releases', $key) CONTENT $row")
            .bind(("key", record.key.clone()))
            .bind(("row", record.clone()))
            .await?
            .check()?;
        Ok(())
    }

    #[tokio::test]
    async fn test_unique_violation_detection() {
        let driver = SurrealDriver::in_memory().await.unwrap();
        let release = Release::new("dup", 1, crate::release::Status::Deployed);
        let record = ReleaseRecord::new(&release.key().unwrap(), &release, "TILLER").unwrap();

        raw_create(&driver, &record).await.unwrap();
        let err = raw_create(&driver, &record).await.unwrap_err();

        assert!(is_unique_violation(&err), "unexpected error: {err}");
        assert!(!is_write_conflict(&err));
    }

    #[test]
    fn select_aliases_remapped_columns() {
        assert_eq!(
            select_sql(&LabelColumns::default()),
            "SELECT key, body, name, version, status, owner, created_at, modified_at FROM releases"
        );

        let columns = LabelColumns::default()
            .with_column(LabelField::Owner, "team")
            .unwrap();
        assert!(select_sql(&columns).contains("team AS owner"));
    }
}
