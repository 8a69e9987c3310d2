//! SurrealDB schema bootstrap
//!
//! Defines the `releases` table, its typed columns and indexes. Every
//! statement uses `IF NOT EXISTS`, so running it again is a no-op.

use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::labels::{LabelColumns, LabelField};

/// Table holding one row per release version.
pub const RELEASES_TABLE: &str = "releases";

/// Initialize the release storage schema with the default column names
///
/// Schema:
/// ```text
/// TABLE releases {
///   id:          releases:⟨key⟩ (record id, unique)
///   key:         STRING (unique)
///   body:        STRING (base64 zstd JSON release)
///   name:        STRING (indexed)
///   version:     INT (indexed, unique together with name)
///   status:      STRING (indexed)
///   owner:       STRING (indexed)
///   created_at:  INT epoch seconds (indexed)
///   modified_at: INT? epoch seconds (indexed)
/// }
/// ```
pub async fn init_schema(db: &Surreal<Any>) -> StoreResult<()> {
    init_schema_with(db, &LabelColumns::default()).await
}

/// Initialize the release storage schema, naming label columns per `columns`.
pub async fn init_schema_with(db: &Surreal<Any>, columns: &LabelColumns) -> StoreResult<()> {
    info!("Initializing release storage schema");
    init_releases_table(db, columns).await?;
    info!("Release storage schema ready");
    Ok(())
}

fn column_type(field: LabelField) -> &'static str {
    match field {
        LabelField::Name | LabelField::Status | LabelField::Owner => "string",
        LabelField::Version | LabelField::CreatedAt => "int",
        LabelField::ModifiedAt => "option<int>",
    }
}

/// SurrealQL for the `releases` table. Column names are validated
/// identifiers (see [`LabelColumns::with_column`]).
fn releases_table_sql(columns: &LabelColumns) -> String {
    let mut sql = String::from(
        "DEFINE TABLE IF NOT EXISTS releases SCHEMAFULL;\n\
         DEFINE FIELD IF NOT EXISTS key ON releases TYPE string;\n\
         DEFINE FIELD IF NOT EXISTS body ON releases TYPE string;\n",
    );
    for field in LabelField::ALL {
        sql.push_str(&format!(
            "DEFINE FIELD IF NOT EXISTS {} ON releases TYPE {};\n",
            columns.column(field),
            column_type(field)
        ));
    }

    // Point lookups and the create-once guarantee
    sql.push_str("DEFINE INDEX IF NOT EXISTS idx_release_key ON releases FIELDS key UNIQUE;\n");
    sql.push_str(&format!(
        "DEFINE INDEX IF NOT EXISTS idx_release_name_version ON releases FIELDS {}, {} UNIQUE;\n",
        columns.column(LabelField::Name),
        columns.column(LabelField::Version)
    ));

    // Label query columns
    for field in LabelField::ALL {
        let column = columns.column(field);
        sql.push_str(&format!(
            "DEFINE INDEX IF NOT EXISTS idx_release_{column} ON releases FIELDS {column};\n"
        ));
    }
    sql
}

async fn init_releases_table(db: &Surreal<Any>, columns: &LabelColumns) -> StoreResult<()> {
    debug!("Initializing releases table");

    db.query(releases_table_sql(columns))
        .await
        .and_then(|response| response.check())
        .map_err(|e| StoreError::SchemaSetup(e.to_string()))?;

    info!("✓ releases table initialized");
    Ok(())
}
