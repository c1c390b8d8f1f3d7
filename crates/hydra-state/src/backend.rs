//! Persistence primitives consumed by [`AppRepository`](crate::AppRepository).
//!
//! Every lookup is an exact match on `appId`. Implementations only move
//! whole records; merging and compaction happen above this layer.

use crate::error::HydraResult;
use crate::types::AppRecord;

/// A collection of app records keyed by `appId`.
pub trait RecordBackend: Send + Sync {
    /// Insert a new record. Yields `None` when nothing was inserted: the
    /// record has no identity or one with the same `appId` already exists.
    fn insert(&self, record: &AppRecord) -> HydraResult<Option<AppRecord>>;

    fn find_one(&self, app_id: &str) -> HydraResult<Option<AppRecord>>;

    fn find_all(&self) -> HydraResult<Vec<AppRecord>>;

    /// Replace the record stored under `app_id`.
    fn update(&self, app_id: &str, record: &AppRecord) -> HydraResult<()>;

    /// Delete by identity. Returns true if it existed.
    fn remove(&self, app_id: &str) -> HydraResult<bool>;
}
