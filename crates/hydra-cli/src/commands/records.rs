use std::fmt::Display;
use std::path::Path;

use hydra_core::HydraConfig;
use hydra_state::{
    AppRecord, AppRepository, Clock, SystemClock, TimeSchedule, Timestamp, UpdateOutcome,
};

/// Read an app record (possibly partial) from a JSON file.
pub fn read_record(path: &Path) -> anyhow::Result<AppRecord> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn create(repo: &AppRepository, file: &Path) -> anyhow::Result<()> {
    let record = read_record(file)?;
    match repo.create(record).await? {
        Some(created) => print_json(&created),
        None => anyhow::bail!("record not created: missing appId or appId already exists"),
    }
}

pub async fn get(repo: &AppRepository, app_id: &str, raw: bool) -> anyhow::Result<()> {
    let record = if raw {
        repo.read_raw(app_id).await?
    } else {
        repo.get_from_id(app_id).await?
    };
    match record {
        Some(record) => print_json(&record),
        None => anyhow::bail!("app not found: {app_id}"),
    }
}

pub async fn status(repo: &AppRepository, app_id: &str) -> anyhow::Result<()> {
    let Some(record) = repo.get_from_id(app_id).await? else {
        anyhow::bail!("app not found: {app_id}");
    };
    print!("{}", render_status(&record, SystemClock.now_millis()));
    Ok(())
}

/// What is in effect at `now` for every schedule, followed by what is
/// scheduled after it.
pub fn render_status(record: &AppRecord, now: Timestamp) -> String {
    let mut lines = vec![format!(
        "app {}",
        record.app_id.as_deref().unwrap_or("<no appId>")
    )];
    schedule_lines(&mut lines, "local strategy", &record.local_strategy_events, now);
    schedule_lines(&mut lines, "cloud strategy", &record.cloud_strategy_events, now);
    for server in &record.servers {
        let label = format!("server {}", server.server);
        schedule_lines(&mut lines, &label, &server.status.state_events, now);
        lines.push(format!(
            "  load cpu {} mem {} reported at {}",
            load(server.status.cpu_load),
            load(server.status.mem_load),
            server.status.time_stamp
        ));
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn schedule_lines<V: Display>(
    lines: &mut Vec<String>,
    label: &str,
    schedule: &TimeSchedule<V>,
    now: Timestamp,
) {
    match schedule.current(now) {
        Some((at, value)) => lines.push(format!("{label}: {value} (since {at})")),
        None => lines.push(format!("{label}: none")),
    }
    for (at, value) in schedule.pending(now) {
        lines.push(format!("  then {value} at {at}"));
    }
}

fn load(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

pub async fn list(repo: &AppRepository, raw: bool) -> anyhow::Result<()> {
    let records = if raw {
        repo.read_all_raw().await?
    } else {
        repo.get_all().await?
    };
    print_json(&records)
}

pub async fn update(repo: &AppRepository, file: &Path) -> anyhow::Result<()> {
    let record = read_record(file)?;
    print_outcome(repo.update(record).await?)
}

pub fn print_outcome(outcome: UpdateOutcome) -> anyhow::Result<()> {
    match outcome {
        UpdateOutcome::Created(record) => {
            eprintln!("✓ created");
            print_json(&record)
        }
        UpdateOutcome::Merged(record) => {
            eprintln!("✓ merged");
            print_json(&record)
        }
        UpdateOutcome::Rejected => anyhow::bail!("update rejected: record has no appId"),
    }
}

pub async fn remove(repo: &AppRepository, app_id: &str) -> anyhow::Result<()> {
    if repo.remove(app_id).await? {
        println!("✓ removed {app_id}");
    } else {
        println!("nothing to remove for {app_id}");
    }
    Ok(())
}

pub async fn compact(repo: &AppRepository) -> anyhow::Result<()> {
    let rewritten = repo.compact_all().await?;
    println!("✓ compacted {rewritten} record(s)");
    Ok(())
}

pub fn init(app_id: &str) -> anyhow::Result<()> {
    print!("{}", HydraConfig::scaffold(app_id).to_toml_string()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_partial_record_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("update.json");
        std::fs::write(&path, r#"{"appId":"billing","localStrategyEvents":{"10":1}}"#).unwrap();

        let record = read_record(&path).unwrap();
        assert_eq!(record.app_id.as_deref(), Some("billing"));
        assert_eq!(record.local_strategy_events.len(), 1);
        assert!(record.servers.is_empty());
    }

    #[test]
    fn read_record_rejects_unknown_strategy_code() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"appId":"billing","cloudStrategyEvents":{"10":42}}"#).unwrap();

        assert!(read_record(&path).is_err());
    }

    #[tokio::test]
    async fn create_then_update_through_files() {
        let dir = tempfile::tempdir().unwrap();
        let repo = AppRepository::in_memory().unwrap();

        let create_path = dir.path().join("create.json");
        std::fs::write(&create_path, r#"{"appId":"billing"}"#).unwrap();
        create(&repo, &create_path).await.unwrap();
        assert!(create(&repo, &create_path).await.is_err());

        let update_path = dir.path().join("update.json");
        std::fs::write(&update_path, r#"{"appId":"billing","servers":[{"server":"h1"}]}"#)
            .unwrap();
        update(&repo, &update_path).await.unwrap();

        let stored = repo.read_raw("billing").await.unwrap().unwrap();
        assert_eq!(stored.servers.len(), 1);
    }

    #[test]
    fn status_shows_current_and_upcoming_entries() {
        use hydra_core::{LocalStrategy, ServerState};
        use hydra_state::ServerRecord;

        let record = AppRecord::new("billing")
            .with_local_strategy(10, LocalStrategy::RoundRobin)
            .with_local_strategy(500, LocalStrategy::ServerLoad)
            .with_server(
                ServerRecord::new("h1")
                    .with_load(90, 41.5, 63.0)
                    .with_state(90, ServerState::Ready)
                    .with_state(100, ServerState::Unavailable),
            )
            .with_server(ServerRecord::new("h2"));

        let rendered = render_status(&record, 100);
        assert_eq!(
            rendered.lines().collect::<Vec<_>>(),
            vec![
                "app billing",
                "local strategy: ROUND_ROBIN (since 10)",
                "  then SERVER_LOAD at 500",
                "cloud strategy: none",
                "server h1: UNAVAILABLE (since 100)",
                "  load cpu 41.5 mem 63 reported at 90",
                "server h2: none",
                "  load cpu - mem - reported at 0",
            ]
        );
    }

    #[tokio::test]
    async fn status_of_unknown_app_fails() {
        let repo = AppRepository::in_memory().unwrap();
        assert!(status(&repo, "nope").await.is_err());
    }

    #[tokio::test]
    async fn get_unknown_app_fails() {
        let repo = AppRepository::in_memory().unwrap();
        assert!(get(&repo, "nope", false).await.is_err());
    }
}
