//! hydra-state — the Hydra app record store.
//!
//! Tracks, per application, schedules of upcoming strategy changes and the
//! status of every server behind it. Partial updates are merged into the
//! persisted record and schedules are compacted so only the value in effect
//! plus pending transitions are kept.
//!
//! # Architecture
//!
//! ```text
//! AppRepository (create / update / get_from_id / get_all / remove)
//!   ├── KeyedLocks       per-appId read-merge-write serialization
//!   ├── Clock            `now` for compaction
//!   └── RecordBackend    insert / find_one / find_all / update / remove
//!         └── RedbBackend  JSON values in the `apps` redb table
//!
//! AppRecord::merge_from ── TimeSchedule::merge (x2)
//!                       └─ reconcile_server ── ServerRecord::merge_from
//! AppRecord::prune      ── TimeSchedule::prune (x2 + one per server)
//! ```

pub mod backend;
pub mod clock;
pub mod error;
pub mod locks;
pub mod merge;
pub mod repository;
pub mod schedule;
pub mod store;
pub mod tables;
pub mod types;

pub use backend::RecordBackend;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{HydraError, HydraResult};
pub use locks::KeyedLocks;
pub use merge::{Reconciled, reconcile_server};
pub use repository::{AppRepository, UpdateOutcome};
pub use schedule::{TimeSchedule, Timestamp};
pub use store::RedbBackend;
pub use types::*;
