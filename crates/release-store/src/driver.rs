//! Driver contract for release storage backends
//!
//! Every backend (SurrealDB, in-memory, ...) implements [`Driver`]; callers
//! depend on the trait only and can swap backends freely.
//!
//! Contract:
//! - Keys are `<name>.v<version>`; malformed keys fail with
//!   `StoreError::InvalidKey` before the backend is touched.
//! - `create` succeeds at most once per key, even under concurrent callers;
//!   the losers get `StoreError::ReleaseExists`.
//! - `update` and `delete` on a missing key fail with
//!   `StoreError::ReleaseNotFound` and change nothing.
//! - `list` and `query` skip rows whose body cannot be decoded. `get` does not.
//! - `list` returns an empty vector when nothing matches; `query` returns
//!   `StoreError::ReleaseNotFound`.

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::labels::LabelFilter;
use crate::release::Release;

/// In-process filter applied by [`Driver::list`].
pub type ReleasePredicate<'a> = dyn Fn(&Release) -> bool + Send + Sync + 'a;

/// Release storage driver.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Stable identifier for diagnostics; has no effect on behaviour.
    fn name(&self) -> &'static str;

    /// Fetch the release stored under `key`.
    async fn get(&self, key: &str) -> StoreResult<Release>;

    /// All decodable releases for which `filter` returns true, in no particular order.
    async fn list(&self, filter: &ReleasePredicate<'_>) -> StoreResult<Vec<Release>>;

    /// Releases whose indexed labels equal every recognised entry of `labels`.
    async fn query(&self, labels: &LabelFilter) -> StoreResult<Vec<Release>>;

    /// Store a new release. Fails with `ReleaseExists` if `key` is taken.
    async fn create(&self, key: &str, release: &Release) -> StoreResult<()>;

    /// Replace the stored body and status of an existing release.
    async fn update(&self, key: &str, release: &Release) -> StoreResult<()>;

    /// Remove a release permanently.
    ///
    /// Returns the removed release when its stored body still decodes.
    async fn delete(&self, key: &str) -> StoreResult<Option<Release>>;
}
