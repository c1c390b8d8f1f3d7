//! Agent-side status reports.
//!
//! A reporting agent probes every server of its application and posts one
//! partial app record per round. This module turns probe results into that
//! record; probing itself happens outside Hydra.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use tracing::{debug, warn};

use hydra_core::{HydraConfig, ReporterConfig, ServerState};
use hydra_state::{AppRecord, AppRepository, Clock, ServerRecord, SystemClock, Timestamp};

use super::records::print_outcome;

/// What a server's status endpoint answers.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Probe {
    pub state: ServerState,
    pub cpu_load: f64,
    pub mem_load: f64,
}

impl Probe {
    /// Stand-in for a server that could not be probed.
    fn unreachable() -> Self {
        Self {
            state: ServerState::Unavailable,
            cpu_load: 0.0,
            mem_load: 0.0,
        }
    }
}

/// Build one reporting round for `reporter` at `now`.
pub fn build_report(
    reporter: &ReporterConfig,
    probes: &HashMap<String, Probe>,
    now: Timestamp,
) -> AppRecord {
    let mut record = AppRecord::new(reporter.app_id.clone())
        .with_local_strategy(now, reporter.local_strategy)
        .with_cloud_strategy(now, reporter.cloud_strategy);

    for configured in &reporter.servers {
        let probe = match probes.get(&configured.public) {
            Some(probe) => probe.clone(),
            None => {
                warn!(server = %configured.public, "no probe result, reporting unavailable");
                Probe::unreachable()
            }
        };
        let mut server = ServerRecord::new(configured.public.clone())
            .with_load(now, probe.cpu_load, probe.mem_load)
            .with_state(now, probe.state);
        server.cost = reporter.cost;
        server.cloud = reporter.cloud.clone();
        record.servers.push(server);
    }

    debug!(app_id = %reporter.app_id, servers = record.servers.len(), now, "report built");
    record
}

pub async fn report(
    repo: &AppRepository,
    config: &HydraConfig,
    probes_path: &Path,
    dry_run: bool,
) -> anyhow::Result<()> {
    let reporter = config
        .reporter
        .as_ref()
        .context("hydra.toml has no [reporter] section")?;
    let content = std::fs::read_to_string(probes_path)
        .with_context(|| format!("reading probes from {}", probes_path.display()))?;
    let probes: HashMap<String, Probe> = serde_json::from_str(&content)?;

    let record = build_report(reporter, &probes, SystemClock.now_millis());
    if dry_run {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }
    print_outcome(repo.update(record).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hydra_core::{CloudStrategy, LocalStrategy, ReportedServer};
    use hydra_state::{ManualClock, RedbBackend, TimeSchedule, UpdateOutcome};
    use std::sync::Arc;

    fn reporter() -> ReporterConfig {
        ReporterConfig {
            app_id: "shop".to_string(),
            local_strategy: LocalStrategy::ServerLoad,
            cloud_strategy: CloudStrategy::Cheapest,
            cost: Some(3),
            cloud: Some("aws".to_string()),
            servers: vec![
                ReportedServer {
                    public: "http://a/app".to_string(),
                    private: Some("http://a:7777/status".to_string()),
                },
                ReportedServer {
                    public: "http://b/app".to_string(),
                    private: None,
                },
            ],
        }
    }

    fn probes() -> HashMap<String, Probe> {
        serde_json::from_str(
            r#"{"http://a/app": {"state": 0, "cpuLoad": 41.5, "memLoad": 63.0}}"#,
        )
        .unwrap()
    }

    #[test]
    fn report_stamps_everything_with_now() {
        let record = build_report(&reporter(), &probes(), 7_000);

        assert_eq!(record.app_id.as_deref(), Some("shop"));
        assert_eq!(
            record.local_strategy_events,
            TimeSchedule::from([(7_000, LocalStrategy::ServerLoad)])
        );
        assert_eq!(
            record.cloud_strategy_events,
            TimeSchedule::from([(7_000, CloudStrategy::Cheapest)])
        );

        let a = record.server("http://a/app").unwrap();
        assert_eq!(a.status.time_stamp, 7_000);
        assert_eq!(a.status.cpu_load, Some(41.5));
        assert_eq!(a.status.state_events.get(7_000), Some(&ServerState::Ready));
        assert_eq!(a.cost, Some(3));
        assert_eq!(a.cloud.as_deref(), Some("aws"));
    }

    #[test]
    fn missing_probe_reports_unavailable() {
        let record = build_report(&reporter(), &probes(), 7_000);

        let b = record.server("http://b/app").unwrap();
        assert_eq!(b.status.state_events.get(7_000), Some(&ServerState::Unavailable));
        assert_eq!(b.status.cpu_load, Some(0.0));
        assert_eq!(b.status.mem_load, Some(0.0));
    }

    #[tokio::test]
    async fn successive_reports_keep_one_current_state() {
        let clock = Arc::new(ManualClock::new(1_000));
        let backend = Arc::new(RedbBackend::open_in_memory().unwrap());
        let repo = AppRepository::with_clock(backend, clock.clone());

        for round in 1..=3u64 {
            clock.set(round * 1_000);
            let outcome = repo
                .update(build_report(&reporter(), &probes(), round * 1_000))
                .await
                .unwrap();
            assert!(!matches!(outcome, UpdateOutcome::Rejected));
        }

        clock.set(3_500);
        let app = repo.get_from_id("shop").await.unwrap().unwrap();
        assert_eq!(app.servers.len(), 2);
        assert_eq!(app.local_strategy_events.keys().collect::<Vec<_>>(), vec![3_000]);
        assert_eq!(
            app.server("http://a/app").unwrap().status.state_events.keys().collect::<Vec<_>>(),
            vec![3_000]
        );
    }
}
