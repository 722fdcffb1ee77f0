//! Session settings

use serde::{Deserialize, Serialize};

use crate::message_buffer::ResyncStrategy;

/// Tunables for a [`ChatSession`](crate::ChatSession)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    /// Prefix of every request id this session issues.
    pub client_id: String,

    /// Locally issued mutations remembered for echo suppression. The oldest
    /// is forgotten when the limit is reached.
    pub max_pending_echoes: usize,

    pub resync_strategy: ResyncStrategy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            client_id: "client".to_string(),
            max_pending_echoes: 1024,
            resync_strategy: ResyncStrategy::Replay,
        }
    }
}

impl SessionConfig {
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: SessionConfig =
            serde_json::from_str(r#"{ "resyncStrategy": "trustSeed" }"#).unwrap();

        assert_eq!(config.resync_strategy, ResyncStrategy::TrustSeed);
        assert_eq!(config.max_pending_echoes, 1024);
        assert_eq!(config.client_id, "client");
    }
}
