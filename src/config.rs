//! Runtime configuration records.
//!
//! These are plain data: they are built once (by hand or decoded with serde by whatever
//! wiring layer sits above the runtime) and handed by reference to
//! [`ActorSystem`](crate::lifecycle::ActorSystem) and [`Dispatcher`](crate::framework::Dispatcher).
//! Nothing here reads files or environment variables.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which execution substrate a dispatcher uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatcherKind {
    /// Multi-threaded pool sized by `core_pool_size`.
    #[default]
    ThreadPool,
    /// A single reactor thread; every actor is processed on it in turn.
    Reactor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    pub kind: DispatcherKind,
    /// Worker threads driving actor mailboxes.
    pub core_pool_size: usize,
    /// Upper bound on threads the pool may spawn for blocking work.
    pub max_pool_size: usize,
    /// Per-mailbox bound on ordinary messages. `None` is unbounded.
    pub queue_capacity: Option<usize>,
    /// Poll the shared injection queue on every scheduler tick.
    pub fair: bool,
    /// How long an idle pool thread is kept around.
    pub keep_alive: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            kind: DispatcherKind::ThreadPool,
            core_pool_size: 4,
            max_pool_size: 16,
            queue_capacity: None,
            fair: false,
            keep_alive: Duration::from_secs(60),
        }
    }
}

impl DispatcherConfig {
    pub fn reactor() -> Self {
        Self {
            kind: DispatcherKind::Reactor,
            core_pool_size: 1,
            ..Self::default()
        }
    }

    /// Number of worker threads actually used for this kind.
    pub fn worker_threads(&self) -> usize {
        match self.kind {
            DispatcherKind::ThreadPool => self.core_pool_size.max(1),
            DispatcherKind::Reactor => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub name: String,
    pub dispatcher: DispatcherConfig,
    /// Timeout used by `ask` callers that do not pick their own.
    pub default_ask_timeout: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            name: "actor-runtime".to_string(),
            dispatcher: DispatcherConfig::default(),
            default_ask_timeout: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_partial_config_with_defaults() {
        let json = r#"{
            "name": "billing",
            "dispatcher": { "kind": "reactor", "queue_capacity": 128, "fair": true }
        }"#;
        let config: RuntimeConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.name, "billing");
        assert_eq!(config.dispatcher.kind, DispatcherKind::Reactor);
        assert_eq!(config.dispatcher.queue_capacity, Some(128));
        assert!(config.dispatcher.fair);
        assert_eq!(config.dispatcher.keep_alive, Duration::from_secs(60));
        assert_eq!(config.default_ask_timeout, Duration::from_secs(5));
    }

    #[test]
    fn reactor_always_uses_one_worker() {
        let mut config = DispatcherConfig::reactor();
        config.core_pool_size = 8;
        assert_eq!(config.worker_threads(), 1);
        assert_eq!(DispatcherConfig::default().worker_threads(), 4);
    }
}
