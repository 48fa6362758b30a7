//! Load configuration via `config` crate with env-override support.

use std::{ops::Deref, sync::Arc};

use serde::Deserialize;

use super::types::Res;

/// Default knowledge server endpoint to use.
fn default_knowledge_endpoint() -> String {
    "http://localhost:5000".to_string()
}

/// Default number of workers processing mention events.
fn default_worker_count() -> usize {
    10
}

/// Default work queue capacity, sized to absorb bursts rather than steady load.
fn default_queue_capacity() -> usize {
    200
}

/// Configuration for the answer-bot application.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ConfigInner {
    /// Slack app token (`SLACK_APP_TOKEN`).
    pub slack_app_token: String,
    /// Slack bot token (`SLACK_BOT_TOKEN`).
    pub slack_bot_token: String,
    /// Knowledge server endpoint URL (`KNOWLEDGE_ENDPOINT`).
    #[serde(default = "default_knowledge_endpoint")]
    pub knowledge_endpoint: String,
    /// Database endpoint URL (`DB_ENDPOINT`).
    pub db_endpoint: String,
    /// Database username (`DB_USERNAME`).
    pub db_username: String,
    /// Database password (`DB_PASSWORD`).
    pub db_password: String,
    /// Number of concurrent event workers (`WORKER_COUNT`).
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// Capacity of the bounded work queue (`QUEUE_CAPACITY`).
    /// Submissions beyond capacity are dropped rather than blocking ingress.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Config {
    pub fn load(explicit_path: Option<&std::path::Path>) -> Res<Self> {
        let mut cfg = config::Config::builder().add_source(config::Environment::default().prefix("ANSWER_BOT"));

        if let Some(p) = explicit_path {
            cfg = cfg.add_source(config::File::from(p.to_path_buf()));
        } else if std::path::Path::new(".hidden/config.toml").exists() {
            cfg = cfg.add_source(config::File::with_name(".hidden/config.toml"));
        }

        let result = Config {
            inner: Arc::new(cfg.build()?.try_deserialize()?),
        };

        if result.worker_count < 1 {
            return Err(anyhow::anyhow!("Worker count must be at least 1."));
        }

        if result.queue_capacity < 1 {
            return Err(anyhow::anyhow!("Queue capacity must be at least 1."));
        }

        Ok(result)
    }
}
