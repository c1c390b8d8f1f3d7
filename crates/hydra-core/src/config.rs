//! hydra.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::types::{CloudStrategy, LocalStrategy};

/// Default tracing filter when neither `RUST_LOG` nor `[log] filter` is set.
pub const DEFAULT_LOG_FILTER: &str = "info,hydra=debug";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HydraConfig {
    #[serde(default)]
    pub store: StoreConfig,
    pub log: Option<LogConfig>,
    pub reporter: Option<ReporterConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the redb file. Absent means an in-memory store.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub filter: Option<String>,
}

/// Describes one application as seen by its reporting agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReporterConfig {
    pub app_id: String,
    pub local_strategy: LocalStrategy,
    pub cloud_strategy: CloudStrategy,
    pub cost: Option<u32>,
    pub cloud: Option<String>,
    #[serde(default)]
    pub servers: Vec<ReportedServer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportedServer {
    /// Address clients are balanced to; also the server's identity.
    pub public: String,
    /// Address the agent probes for status.
    pub private: Option<String>,
}

impl HydraConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: HydraConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn log_filter(&self) -> &str {
        self.log
            .as_ref()
            .and_then(|l| l.filter.as_deref())
            .unwrap_or(DEFAULT_LOG_FILTER)
    }

    /// Scaffold a hydra.toml with one reporting server for `app_id`.
    pub fn scaffold(app_id: &str) -> Self {
        HydraConfig {
            store: StoreConfig {
                path: Some(PathBuf::from("hydra.redb")),
            },
            log: Some(LogConfig {
                filter: Some(DEFAULT_LOG_FILTER.to_string()),
            }),
            reporter: Some(ReporterConfig {
                app_id: app_id.to_string(),
                local_strategy: LocalStrategy::RoundRobin,
                cloud_strategy: CloudStrategy::Indifferent,
                cost: Some(1),
                cloud: None,
                servers: vec![ReportedServer {
                    public: "http://localhost:8080/app".to_string(),
                    private: Some("http://localhost:7777/status".to_string()),
                }],
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaffold() {
        let config = HydraConfig::scaffold("my-app");
        let toml_str = config.to_toml_string().unwrap();
        assert!(toml_str.contains("my-app"));
        assert!(toml_str.contains("hydra.redb"));

        let reparsed: HydraConfig = toml::from_str(&toml_str).unwrap();
        let reporter = reparsed.reporter.unwrap();
        assert_eq!(reporter.local_strategy, LocalStrategy::RoundRobin);
        assert_eq!(reporter.servers.len(), 1);
    }

    #[test]
    fn test_parse_minimal() {
        let config: HydraConfig = toml::from_str("").unwrap();
        assert!(config.store.path.is_none());
        assert!(config.reporter.is_none());
        assert_eq!(config.log_filter(), DEFAULT_LOG_FILTER);
    }

    #[test]
    fn test_parse_reporter() {
        let toml_str = r#"
[store]
path = "/var/lib/hydra/apps.redb"

[log]
filter = "warn"

[reporter]
app_id = "billing"
local_strategy = 2
cloud_strategy = 3
cloud = "aws"

[[reporter.servers]]
public = "http://10.0.0.1/app"
private = "http://10.0.0.1:7777/status"

[[reporter.servers]]
public = "http://10.0.0.2/app"
"#;
        let config: HydraConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.log_filter(), "warn");
        let reporter = config.reporter.unwrap();
        assert_eq!(reporter.local_strategy, LocalStrategy::ServerLoad);
        assert_eq!(reporter.cloud_strategy, CloudStrategy::CloudLoad);
        assert_eq!(reporter.cost, None);
        assert_eq!(reporter.servers[1].private, None);
    }

    #[test]
    fn test_reject_unknown_strategy() {
        let toml_str = r#"
[reporter]
app_id = "billing"
local_strategy = 9
cloud_strategy = 0
"#;
        assert!(toml::from_str::<HydraConfig>(toml_str).is_err());
    }
}
