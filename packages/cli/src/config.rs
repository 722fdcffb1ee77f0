use convo_editor::SessionConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_CONFIG_NAME: &str = "convo.config.json";

/// Convo configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Tracing filter used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Session tunables
    #[serde(default)]
    pub session: SessionConfig,
}

fn default_log_filter() -> String {
    "warn".to_string()
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            session: SessionConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use convo_editor::ResyncStrategy;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "logFilter": "convo_editor=debug",
            "session": {
                "clientId": "desktop",
                "maxPendingEchoes": 64,
                "resyncStrategy": "trustSeed"
            }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.log_filter, "convo_editor=debug");
        assert_eq!(config.session.client_id, "desktop");
        assert_eq!(config.session.max_pending_echoes, 64);
        assert_eq!(config.session.resync_strategy, ResyncStrategy::TrustSeed);
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_filter, "warn");
        assert_eq!(config.session, SessionConfig::default());
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        let cwd = dir.path().to_str().unwrap();

        let missing = Config::load(cwd).unwrap();
        assert_eq!(missing.log_filter, "warn");

        std::fs::write(
            dir.path().join(DEFAULT_CONFIG_NAME),
            r#"{ "session": { "maxPendingEchoes": 8 } }"#,
        )
        .unwrap();
        let loaded = Config::load(cwd).unwrap();
        assert_eq!(loaded.session.max_pending_echoes, 8);
        assert_eq!(loaded.session.client_id, "client");
    }
}
