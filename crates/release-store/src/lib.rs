//! Release-Store: pluggable persistence for versioned release records
//!
//! Every deploy or upgrade of a named unit of work produces a new release
//! version. This crate stores those versions behind one [`Driver`] contract:
//! fetch by key, scan with an in-process predicate, or query by a fixed set
//! of indexed labels.
//!
//! ## Key Components
//!
//! - [`ReleaseKey`]: `<name>.v<version>` addressing
//! - [`codec`]: release ⇄ opaque storage body
//! - [`LabelTranslator`]: label filters → bound backend predicates
//! - [`SurrealDriver`]: relational driver over a SurrealDB `releases` table
//! - [`MemoryDriver`]: in-memory driver with the same contract

pub mod codec;
mod config;
pub mod driver;
mod error;
mod key;
pub mod labels;
pub mod memory;
pub mod migrations;
mod record;
mod release;
pub mod surreal;

pub use codec::{decode_release, encode_release};
pub use config::{connect, ConnectionConfig, Credentials, DriverOptions};
pub use driver::{Driver, ReleasePredicate};
pub use error::{StoreError, StoreResult};
pub use key::{ReleaseKey, KEY_SEPARATOR};
pub use labels::{LabelColumns, LabelField, LabelFilter, LabelTranslator, Predicate, UnknownLabels};
pub use memory::MemoryDriver;
pub use record::{ReleaseRecord, DEFAULT_OWNER};
pub use release::{ChartRef, Info, Release, Status};
pub use surreal::SurrealDriver;
