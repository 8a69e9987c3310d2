//! Connection and driver configuration
//!
//! `ConnectionConfig` describes how to reach SurrealDB (local `mem://`,
//! `surrealkv://` or a remote `ws://`/`wss://` endpoint). `DriverOptions`
//! carries the per-driver settings: owner tag, label columns and the
//! unknown-label policy.

use surrealdb::engine::any::Any;
use surrealdb::opt::auth::{Database, Root};
use surrealdb::Surreal;
use tracing::{info, instrument};

use crate::error::{StoreError, StoreResult};
use crate::labels::{LabelColumns, UnknownLabels};
use crate::record::DEFAULT_OWNER;

const DEFAULT_NAMESPACE: &str = "release_store";
const DEFAULT_DATABASE: &str = "main";

/// Credentials for an authenticated connection
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    /// Root user (true) or database user (false)
    pub is_root: bool,
}

/// How to reach the SurrealDB instance holding the `releases` table
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Endpoint URL (e.g. "mem://", "surrealkv://.releases", "wss://host")
    pub endpoint: String,
    /// Namespace (default: "release_store")
    pub namespace: String,
    /// Database name (default: "main")
    pub database: String,
    /// Sign-in credentials; `None` for local engines
    pub credentials: Option<Credentials>,
}

impl ConnectionConfig {
    /// Connect to `endpoint` without authentication
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            credentials: None,
        }
    }

    /// Embedded in-memory engine
    pub fn in_memory() -> Self {
        Self::new("mem://")
    }

    /// Set custom namespace
    pub fn with_namespace(mut self, ns: impl Into<String>) -> Self {
        self.namespace = ns.into();
        self
    }

    /// Set custom database
    pub fn with_database(mut self, db: impl Into<String>) -> Self {
        self.database = db.into();
        self
    }

    /// Authenticate as a database user
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some(Credentials {
            username: username.into(),
            password: password.into(),
            is_root: false,
        });
        self
    }

    /// Set whether the configured user is a root user
    pub fn with_root(mut self, is_root: bool) -> Self {
        if let Some(credentials) = self.credentials.as_mut() {
            credentials.is_root = is_root;
        }
        self
    }

    /// Create from environment variables
    ///
    /// Reads:
    /// - SURREALDB_ENDPOINT (required)
    /// - SURREALDB_USERNAME / SURREALDB_PASSWORD (optional, both or neither)
    /// - SURREALDB_NAMESPACE (optional, default: "release_store")
    /// - SURREALDB_DATABASE (optional, default: "main")
    /// - SURREALDB_ROOT (optional, default: "false")
    pub fn from_env() -> StoreResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> StoreResult<Self> {
        let endpoint = lookup("SURREALDB_ENDPOINT")
            .ok_or_else(|| StoreError::InvalidConfig("SURREALDB_ENDPOINT not set".to_string()))?;

        let mut config = Self::new(endpoint);
        if let Some(namespace) = lookup("SURREALDB_NAMESPACE") {
            config = config.with_namespace(namespace);
        }
        if let Some(database) = lookup("SURREALDB_DATABASE") {
            config = config.with_database(database);
        }

        match (lookup("SURREALDB_USERNAME"), lookup("SURREALDB_PASSWORD")) {
            (Some(username), Some(password)) => {
                let is_root = lookup("SURREALDB_ROOT")
                    .map(|v| v.eq_ignore_ascii_case("true"))
                    .unwrap_or(false);
                config = config.with_credentials(username, password).with_root(is_root);
            }
            (None, None) => {}
            _ => {
                return Err(StoreError::InvalidConfig(
                    "SURREALDB_USERNAME and SURREALDB_PASSWORD must be set together".to_string(),
                ))
            }
        }

        Ok(config)
    }
}

/// Open a connection, sign in if credentials are configured and select
/// the namespace and database.
///
/// The returned handle belongs to the caller; drivers only hold clones.
#[instrument(
    skip(config),
    fields(
        endpoint = %config.endpoint,
        namespace = %config.namespace,
        database = %config.database,
    )
)]
pub async fn connect(config: &ConnectionConfig) -> StoreResult<Surreal<Any>> {
    let db = surrealdb::engine::any::connect(config.endpoint.as_str())
        .await
        .map_err(|e| {
            StoreError::Connection(format!("failed to connect to {}: {e}", config.endpoint))
        })?;

    if let Some(credentials) = &config.credentials {
        if credentials.is_root {
            db.signin(Root {
                username: &credentials.username,
                password: &credentials.password,
            })
            .await
            .map_err(|e| StoreError::Connection(format!("root authentication failed: {e}")))?;
        } else {
            db.signin(Database {
                namespace: &config.namespace,
                database: &config.database,
                username: &credentials.username,
                password: &credentials.password,
            })
            .await
            .map_err(|e| {
                StoreError::Connection(format!("database authentication failed: {e}"))
            })?;
        }
    }

    db.use_ns(config.namespace.as_str())
        .use_db(config.database.as_str())
        .await
        .map_err(|e| {
            StoreError::Connection(format!("failed to select namespace/database: {e}"))
        })?;

    info!("connected to SurrealDB");
    Ok(db)
}

/// Per-driver settings
#[derive(Debug, Clone)]
pub struct DriverOptions {
    /// Value written to and filtered on in the `owner` column
    pub owner: String,
    /// Label field to column mapping used by `query`
    pub columns: LabelColumns,
    /// Handling of filter names outside the fixed label set
    pub unknown_labels: UnknownLabels,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            owner: DEFAULT_OWNER.to_string(),
            columns: LabelColumns::default(),
            unknown_labels: UnknownLabels::default(),
        }
    }
}

impl DriverOptions {
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }

    pub fn with_columns(mut self, columns: LabelColumns) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_unknown_labels(mut self, policy: UnknownLabels) -> Self {
        self.unknown_labels = policy;
        self
    }

    /// Defaults overridden by RELEASE_STORE_OWNER and
    /// RELEASE_STORE_UNKNOWN_LABELS (`ignore` | `reject`).
    pub fn from_env() -> StoreResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> StoreResult<Self> {
        let mut options = Self::default();
        if let Some(owner) = lookup("RELEASE_STORE_OWNER") {
            if owner.trim().is_empty() {
                return Err(StoreError::InvalidConfig(
                    "RELEASE_STORE_OWNER must not be empty".to_string(),
                ));
            }
            options.owner = owner;
        }
        if let Some(policy) = lookup("RELEASE_STORE_UNKNOWN_LABELS") {
            options.unknown_labels = policy.parse()?;
        }
        Ok(options)
    }
}
