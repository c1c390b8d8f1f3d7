//! The `apps` table: one JSON document per `appId`.
//!
//! Each primitive is its own redb transaction. `insert` checks for an
//! existing key and writes inside the same write transaction, so two
//! creates for one id cannot both succeed. Reads never see a record
//! half-written.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

use crate::backend::RecordBackend;
use crate::error::{HydraError, HydraResult};
use crate::tables::APPS;
use crate::types::AppRecord;

/// `map_err!(Read)` builds a closure turning a redb/serde error into that variant.
macro_rules! map_err {
    ($variant:ident) => {
        |e| HydraError::$variant(e.to_string())
    };
}

/// [`RecordBackend`] over one redb database. Clones share the database.
#[derive(Clone)]
pub struct RedbBackend {
    db: Arc<Database>,
}

impl RedbBackend {
    /// Open the database file at `path`, creating it and the `apps` table
    /// on first use.
    pub fn open(path: &Path) -> HydraResult<Self> {
        let apps = Self::with_apps_table(Database::create(path).map_err(map_err!(Open))?)?;
        debug!(?path, "record store opened");
        Ok(apps)
    }

    /// A database that lives only as long as this handle and its clones.
    pub fn open_in_memory() -> HydraResult<Self> {
        let db = Database::builder()
            .create_with_backend(redb::backends::InMemoryBackend::new())
            .map_err(map_err!(Open))?;
        Self::with_apps_table(db)
    }

    /// Wrap `db`, creating the `apps` table if this is a fresh database.
    fn with_apps_table(db: Database) -> HydraResult<Self> {
        let txn = db.begin_write().map_err(map_err!(Transaction))?;
        txn.open_table(APPS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Unconditional put of `record` under `app_id`.
    fn write(&self, app_id: &str, record: &AppRecord) -> HydraResult<()> {
        let value = serde_json::to_vec(record).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(APPS).map_err(map_err!(Table))?;
            table
                .insert(app_id, value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }
}

impl RecordBackend for RedbBackend {
    fn insert(&self, record: &AppRecord) -> HydraResult<Option<AppRecord>> {
        let Some(app_id) = record.app_id.as_deref() else {
            return Ok(None);
        };
        let value = serde_json::to_vec(record).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(APPS).map_err(map_err!(Table))?;
            if table.get(app_id).map_err(map_err!(Read))?.is_some() {
                debug!(%app_id, "insert skipped, app id taken");
                // Dropping the transaction aborts it.
                return Ok(None);
            }
            table
                .insert(app_id, value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%app_id, "app record inserted");
        Ok(Some(record.clone()))
    }

    fn find_one(&self, app_id: &str) -> HydraResult<Option<AppRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(APPS).map_err(map_err!(Table))?;
        match table.get(app_id).map_err(map_err!(Read))? {
            Some(guard) => {
                let record: AppRecord =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    fn find_all(&self) -> HydraResult<Vec<AppRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(APPS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let record: AppRecord =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(record);
        }
        Ok(results)
    }

    fn update(&self, app_id: &str, record: &AppRecord) -> HydraResult<()> {
        self.write(app_id, record)?;
        debug!(%app_id, "app record stored");
        Ok(())
    }

    fn remove(&self, app_id: &str) -> HydraResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut table = txn.open_table(APPS).map_err(map_err!(Table))?;
            existed = table.remove(app_id).map_err(map_err!(Write))?.is_some();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%app_id, existed, "app record removed");
        Ok(existed)
    }
}
