//! AppRepository — upsert-style façade over a [`RecordBackend`].
//!
//! - `create` inserts a default-filled record if it has an identity.
//! - `update` merges into the persisted record, or creates it if absent.
//! - `get_from_id` / `get_all` compact schedules on read and persist the
//!   compacted form in the background.
//!
//! All read-merge-write sequences for one `appId` are serialized through
//! [`KeyedLocks`]. Background write-backs re-read under that lock and only
//! re-apply compaction, so they never undo a concurrent update.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::backend::RecordBackend;
use crate::clock::{Clock, SystemClock};
use crate::error::HydraResult;
use crate::locks::KeyedLocks;
use crate::schedule::Timestamp;
use crate::store::RedbBackend;
use crate::types::AppRecord;

/// Result of [`AppRepository::update`].
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// No record existed; the input was inserted as-is.
    Created(AppRecord),
    /// Merged into the persisted record; carries the stored result.
    Merged(AppRecord),
    /// Nothing persisted: no identity, or the insert yielded nothing.
    Rejected,
}

impl UpdateOutcome {
    pub fn record(&self) -> Option<&AppRecord> {
        match self {
            UpdateOutcome::Created(record) | UpdateOutcome::Merged(record) => Some(record),
            UpdateOutcome::Rejected => None,
        }
    }
}

/// Shared handle to the app record store. Cheap to clone.
#[derive(Clone)]
pub struct AppRepository {
    backend: Arc<dyn RecordBackend>,
    clock: Arc<dyn Clock>,
    locks: Arc<KeyedLocks>,
    write_backs: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl AppRepository {
    pub fn new(backend: Arc<dyn RecordBackend>) -> Self {
        Self::with_clock(backend, Arc::new(SystemClock))
    }

    pub fn with_clock(backend: Arc<dyn RecordBackend>, clock: Arc<dyn Clock>) -> Self {
        Self {
            backend,
            clock,
            locks: Arc::new(KeyedLocks::new()),
            write_backs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Repository over a fresh in-memory redb database.
    pub fn in_memory() -> HydraResult<Self> {
        Ok(Self::new(Arc::new(RedbBackend::open_in_memory()?)))
    }

    // ── Writes ─────────────────────────────────────────────────────

    /// Insert `record` unless it lacks an identity or the id is taken.
    pub async fn create(&self, record: AppRecord) -> HydraResult<Option<AppRecord>> {
        let Some(app_id) = record.app_id.clone() else {
            debug!("create rejected, record has no appId");
            return Ok(None);
        };
        let _guard = self.locks.acquire(&app_id).await;
        self.insert_locked(&app_id, record)
    }

    fn insert_locked(&self, app_id: &str, record: AppRecord) -> HydraResult<Option<AppRecord>> {
        let inserted = self.backend.insert(&record)?;
        match &inserted {
            Some(_) => info!(%app_id, "app record created"),
            None => debug!(%app_id, "insert yielded nothing"),
        }
        Ok(inserted)
    }

    /// Merge a partial record into the stored one, creating it if absent.
    ///
    /// Schedules are merged then compacted against the current time. Servers
    /// are reconciled by address with last-writer-wins on metrics.
    pub async fn update(&self, record: AppRecord) -> HydraResult<UpdateOutcome> {
        let Some(app_id) = record.app_id.clone() else {
            debug!("update rejected, record has no appId");
            return Ok(UpdateOutcome::Rejected);
        };
        let _guard = self.locks.acquire(&app_id).await;

        let Some(mut current) = self.backend.find_one(&app_id)? else {
            return Ok(match self.insert_locked(&app_id, record)? {
                Some(created) => UpdateOutcome::Created(created),
                None => UpdateOutcome::Rejected,
            });
        };

        let reconciled = current.merge_from(record);
        let now = self.clock.now_millis();
        current.prune(now);
        self.backend.update(&app_id, &current)?;
        debug!(
            %app_id,
            servers = reconciled.len(),
            total_servers = current.servers.len(),
            now,
            "app record merged"
        );
        Ok(UpdateOutcome::Merged(current))
    }

    /// Fire-and-forget form of [`AppRepository::update`].
    pub fn spawn_update(&self, record: AppRecord) -> JoinHandle<HydraResult<UpdateOutcome>> {
        let repo = self.clone();
        tokio::spawn(async move { repo.update(record).await })
    }

    /// Delete by identity. `Ok(false)` if there was nothing to delete.
    pub async fn remove(&self, app_id: &str) -> HydraResult<bool> {
        let existed = {
            let _guard = self.locks.acquire(app_id).await;
            self.backend.remove(app_id)?
        };
        self.locks.forget(app_id).await;
        Ok(existed)
    }

    // ── Reads ──────────────────────────────────────────────────────

    /// The stored record exactly as persisted, without compaction.
    pub async fn read_raw(&self, app_id: &str) -> HydraResult<Option<AppRecord>> {
        self.backend.find_one(app_id)
    }

    /// Every stored record exactly as persisted, without compaction.
    pub async fn read_all_raw(&self) -> HydraResult<Vec<AppRecord>> {
        self.backend.find_all()
    }

    /// Read one record with its schedules compacted to the present.
    ///
    /// If compaction changed anything, the compacted form is persisted by a
    /// background task; its failure is logged, never returned here.
    pub async fn get_from_id(&self, app_id: &str) -> HydraResult<Option<AppRecord>> {
        let Some(mut record) = self.read_raw(app_id).await? else {
            return Ok(None);
        };
        let now = self.clock.now_millis();
        if record.prune(now) {
            self.schedule_write_back(app_id.to_string(), now).await;
        }
        Ok(Some(record))
    }

    /// Read every record with compaction, as [`AppRepository::get_from_id`].
    pub async fn get_all(&self) -> HydraResult<Vec<AppRecord>> {
        let mut records = self.read_all_raw().await?;
        let now = self.clock.now_millis();
        for record in &mut records {
            if record.prune(now) {
                if let Some(app_id) = record.app_id.clone() {
                    self.schedule_write_back(app_id, now).await;
                }
            }
        }
        Ok(records)
    }

    // ── Compaction ─────────────────────────────────────────────────

    /// Compact and persist every stored record now. Returns how many
    /// records were rewritten.
    pub async fn compact_all(&self) -> HydraResult<usize> {
        let now = self.clock.now_millis();
        let mut rewritten = 0;
        for record in self.read_all_raw().await? {
            let Some(app_id) = record.app_id else {
                continue;
            };
            if self.compact(&app_id, now).await? {
                rewritten += 1;
            }
        }
        info!(rewritten, now, "compaction pass finished");
        Ok(rewritten)
    }

    /// Re-read `app_id` under its lock and persist it if pruning at `now`
    /// removes anything.
    async fn compact(&self, app_id: &str, now: Timestamp) -> HydraResult<bool> {
        let _guard = self.locks.acquire(app_id).await;
        let Some(mut fresh) = self.backend.find_one(app_id)? else {
            return Ok(false);
        };
        if !fresh.prune(now) {
            return Ok(false);
        }
        self.backend.update(app_id, &fresh)?;
        debug!(%app_id, now, "compacted record persisted");
        Ok(true)
    }

    async fn schedule_write_back(&self, app_id: String, now: Timestamp) {
        let repo = self.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = repo.compact(&app_id, now).await {
                warn!(%app_id, error = %e, "compaction write-back failed");
            }
        });
        let mut pending = self.write_backs.lock().await;
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }

    /// Wait for every background write-back scheduled so far.
    pub async fn flush_write_backs(&self) {
        let pending = std::mem::take(&mut *self.write_backs.lock().await);
        for handle in pending {
            if let Err(e) = handle.await {
                warn!(error = %e, "write-back task did not complete");
            }
        }
    }
}
