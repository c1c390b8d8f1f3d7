//! Record-level merge and compaction.
//!
//! Incoming partial records are folded into persisted ones:
//!
//! - Every schedule merges key-wise (incoming wins on equal timestamps).
//! - Servers are matched by address; unmatched servers are appended.
//! - Metric fields of a matched server follow last-writer-wins on the
//!   reporter's own `timeStamp`, never on arrival order.
//!
//! Compaction (`prune`) collapses each schedule's past down to the entry
//! currently in effect.

use crate::schedule::Timestamp;
use crate::types::{AppRecord, ServerRecord, ServerStatus};

/// What happened to one incoming server during reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    /// Matched an existing server. `metrics_applied` is false when the
    /// incoming snapshot was not newer than the persisted one.
    Merged { metrics_applied: bool },
    /// No server with that address existed; appended verbatim.
    Appended,
}

impl ServerStatus {
    /// Overwrite metric fields present in `incoming`. Caller checks recency.
    fn apply_metrics(&mut self, incoming: &ServerStatus) {
        if let Some(cpu) = incoming.cpu_load {
            self.cpu_load = Some(cpu);
        }
        if let Some(mem) = incoming.mem_load {
            self.mem_load = Some(mem);
        }
        self.time_stamp = incoming.time_stamp;
    }
}

impl ServerRecord {
    /// Merge another report for the same server into this one.
    ///
    /// The availability schedule always merges. Metrics and descriptors are
    /// only taken when the incoming snapshot is strictly newer; equal or
    /// older snapshots are stale.
    pub fn merge_from(&mut self, incoming: ServerRecord) -> bool {
        let ServerRecord {
            server: _,
            cost,
            cloud,
            status,
        } = incoming;

        let newer = status.time_stamp > self.status.time_stamp;
        if newer {
            self.status.apply_metrics(&status);
            if cost.is_some() {
                self.cost = cost;
            }
            if cloud.is_some() {
                self.cloud = cloud;
            }
        }
        self.status.state_events.merge(status.state_events);
        newer
    }
}

/// Match `incoming` against `servers` by address, merging or appending.
pub fn reconcile_server(servers: &mut Vec<ServerRecord>, incoming: ServerRecord) -> Reconciled {
    match servers.iter().position(|s| s.server == incoming.server) {
        Some(idx) => Reconciled::Merged {
            metrics_applied: servers[idx].merge_from(incoming),
        },
        None => {
            servers.push(incoming);
            Reconciled::Appended
        }
    }
}

impl AppRecord {
    /// Fold a partial update for the same app into this record.
    ///
    /// Identity is left untouched. Does not prune; see [`AppRecord::prune`].
    pub fn merge_from(&mut self, incoming: AppRecord) -> Vec<Reconciled> {
        let AppRecord {
            app_id: _,
            local_strategy_events,
            cloud_strategy_events,
            servers,
        } = incoming;

        self.local_strategy_events.merge(local_strategy_events);
        self.cloud_strategy_events.merge(cloud_strategy_events);
        servers
            .into_iter()
            .map(|server| reconcile_server(&mut self.servers, server))
            .collect()
    }

    /// Compact every schedule in the record relative to `now`.
    ///
    /// Returns true if any schedule lost entries.
    pub fn prune(&mut self, now: Timestamp) -> bool {
        let mut changed = self.local_strategy_events.prune(now);
        changed |= self.cloud_strategy_events.prune(now);
        for server in &mut self.servers {
            changed |= server.status.state_events.prune(now);
        }
        changed
    }
}
