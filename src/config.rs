use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::network::ReconnectPolicy;

pub const DEFAULT_CONFIG_PATH: &str = "config/chat.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// WebSocket address of the chat server.
    pub server_url: String,
    /// Endpoint returning prior messages for the signed-in user.
    pub history_url: String,
    /// SQLite file holding the storefront login.
    pub credentials_db: String,
    pub typing_idle_ms: u64,
    pub reconnect: ReconnectConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_attempts: Option<u32>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://localhost:5000/chat".to_string(),
            history_url: "http://localhost:5000/api/chat/messages".to_string(),
            credentials_db: "data/credentials.db".to_string(),
            typing_idle_ms: 2000,
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1000,
            max_delay_ms: 5000,
            max_attempts: None,
        }
    }
}

impl AppConfig {
    pub fn typing_idle(&self) -> Duration {
        Duration::from_millis(self.typing_idle_ms)
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            initial_delay: Duration::from_millis(self.reconnect.initial_delay_ms),
            max_delay: Duration::from_millis(self.reconnect.max_delay_ms),
            max_attempts: self.reconnect.max_attempts,
        }
    }

    /// Applies `CHAT_*` overrides (typically from `.env`).
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let overrides = [
            ("CHAT_SERVER_URL", &mut self.server_url),
            ("CHAT_HISTORY_URL", &mut self.history_url),
            ("CHAT_CREDENTIALS_DB", &mut self.credentials_db),
        ];
        for (name, field) in overrides {
            if let Some(value) = lookup(name).filter(|value| !value.trim().is_empty()) {
                log::debug!("{name} overrides config file");
                *field = value;
            }
        }
    }
}

pub fn load_config(path: &str) -> AppConfig {
    let path = Path::new(path);
    let mut config = match fs::read_to_string(path) {
        Ok(content) => parse_config(&content).unwrap_or_else(|err| {
            log::warn!("Failed to parse config file {}: {err}", path.display());
            AppConfig::default()
        }),
        Err(err) => {
            log::info!(
                "Config file {} not found ({err}); using defaults",
                path.display()
            );
            AppConfig::default()
        }
    };

    config.apply_env(|name| std::env::var(name).ok());
    config
}

fn parse_config(content: &str) -> serde_json::Result<AppConfig> {
    serde_json::from_str(content)
}
