//! Record types persisted by the Hydra store.
//!
//! Field names follow the camelCase wire form used by reporting agents.
//! Every collection defaults to empty when missing, so a partial update
//! deserializes into a fully default-filled record.

use serde::{Deserialize, Serialize};

use hydra_core::{CloudStrategy, LocalStrategy, ServerState};

use crate::schedule::{TimeSchedule, Timestamp};

/// Unique identifier of an application; the only lookup key in the store.
pub type AppId = String;

/// Public address of a server; its identity within an application.
pub type ServerAddress = String;

// ── App ───────────────────────────────────────────────────────────

/// Per-application schedules and server fleet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppRecord {
    /// Records without an id cannot be persisted.
    #[serde(default)]
    pub app_id: Option<AppId>,
    #[serde(default)]
    pub local_strategy_events: TimeSchedule<LocalStrategy>,
    #[serde(default)]
    pub cloud_strategy_events: TimeSchedule<CloudStrategy>,
    /// Discovery order.
    #[serde(default)]
    pub servers: Vec<ServerRecord>,
}

impl AppRecord {
    pub fn new(app_id: impl Into<AppId>) -> Self {
        Self {
            app_id: Some(app_id.into()),
            ..Self::default()
        }
    }

    pub fn with_local_strategy(mut self, at: Timestamp, strategy: LocalStrategy) -> Self {
        self.local_strategy_events.insert(at, strategy);
        self
    }

    pub fn with_cloud_strategy(mut self, at: Timestamp, strategy: CloudStrategy) -> Self {
        self.cloud_strategy_events.insert(at, strategy);
        self
    }

    pub fn with_server(mut self, server: ServerRecord) -> Self {
        self.servers.push(server);
        self
    }

    pub fn server(&self, address: &str) -> Option<&ServerRecord> {
        self.servers.iter().find(|s| s.server == address)
    }
}

// ── Server ────────────────────────────────────────────────────────

/// One server backing an application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerRecord {
    pub server: ServerAddress,
    /// Relative cost of routing to this server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<u32>,
    /// Cloud provider hosting the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud: Option<String>,
    #[serde(default)]
    pub status: ServerStatus,
}

/// Latest metric snapshot plus the availability schedule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStatus {
    /// CPU load, 0–100.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_load: Option<f64>,
    /// Memory load, 0–100.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mem_load: Option<f64>,
    /// When the reporter produced this snapshot (epoch ms).
    #[serde(default)]
    pub time_stamp: Timestamp,
    #[serde(default)]
    pub state_events: TimeSchedule<ServerState>,
}

impl ServerRecord {
    pub fn new(server: impl Into<ServerAddress>) -> Self {
        Self {
            server: server.into(),
            ..Self::default()
        }
    }

    /// Set the metric snapshot taken at `time_stamp`.
    pub fn with_load(mut self, time_stamp: Timestamp, cpu_load: f64, mem_load: f64) -> Self {
        self.status.time_stamp = time_stamp;
        self.status.cpu_load = Some(cpu_load);
        self.status.mem_load = Some(mem_load);
        self
    }

    pub fn with_state(mut self, at: Timestamp, state: ServerState) -> Self {
        self.status.state_events.insert(at, state);
        self
    }
}
