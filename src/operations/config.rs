use crate::core::AgentId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How a top-level invocation hands its completion to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CompletionDispatchMode {
    /// The caller waits for the completion run; its failure reaches the caller.
    #[default]
    Blocking,
    /// The completion runs on a spawned task; failures are only logged.
    Detached,
}

/// Level at which successful operations are logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OperationLogLevel {
    #[default]
    Off,
    Trace,
    Debug,
    Info,
}

/// Configuration of the operation stages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationsConfig {
    /// Agent recorded on every operation committed by this process
    pub agent_id: AgentId,

    /// Success logging of the operation scope handler
    pub scope_log_level: OperationLogLevel,

    /// Success logging of the completion producer
    pub completion_log_level: OperationLogLevel,

    pub completion_dispatch: CompletionDispatchMode,

    /// Interval of polling change-log monitors
    pub change_log_poll_interval_ms: u64,

    /// Capacity of the local completion broadcast channel
    pub notifier_channel_capacity: usize,

    /// Records read per batch by the change-log watcher
    pub change_log_batch_size: usize,
}

impl Default for OperationsConfig {
    fn default() -> Self {
        Self {
            agent_id: AgentId::default(),
            scope_log_level: OperationLogLevel::Off,
            completion_log_level: OperationLogLevel::Off,
            completion_dispatch: CompletionDispatchMode::Blocking,
            change_log_poll_interval_ms: 250,
            notifier_channel_capacity: 1024,
            change_log_batch_size: 256,
        }
    }
}

impl OperationsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the agent id
    pub fn agent_id(mut self, agent_id: AgentId) -> Self {
        self.agent_id = agent_id;
        self
    }

    pub fn scope_log_level(mut self, level: OperationLogLevel) -> Self {
        self.scope_log_level = level;
        self
    }

    pub fn completion_log_level(mut self, level: OperationLogLevel) -> Self {
        self.completion_log_level = level;
        self
    }

    pub fn completion_dispatch(mut self, mode: CompletionDispatchMode) -> Self {
        self.completion_dispatch = mode;
        self
    }

    /// Rounded up to whole milliseconds; only `Duration::ZERO` maps to 0.
    pub fn change_log_poll_interval(mut self, interval: Duration) -> Self {
        let millis = interval.as_nanos().div_ceil(1_000_000);
        self.change_log_poll_interval_ms = u64::try_from(millis).unwrap_or(u64::MAX);
        self
    }

    pub fn notifier_channel_capacity(mut self, capacity: usize) -> Self {
        self.notifier_channel_capacity = capacity;
        self
    }

    pub fn change_log_batch_size(mut self, size: usize) -> Self {
        self.change_log_batch_size = size;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.change_log_poll_interval_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.agent_id.as_str().is_empty() {
            return Err("agent_id must not be empty".to_string());
        }

        if self.change_log_poll_interval_ms == 0 {
            return Err("change_log_poll_interval_ms must be greater than 0".to_string());
        }

        if self.notifier_channel_capacity == 0 {
            return Err("notifier_channel_capacity must be greater than 0".to_string());
        }

        if self.change_log_batch_size == 0 {
            return Err("change_log_batch_size must be greater than 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OperationsConfig::default();
        assert_eq!(config.completion_dispatch, CompletionDispatchMode::Blocking);
        assert_eq!(config.scope_log_level, OperationLogLevel::Off);
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = OperationsConfig::new()
            .agent_id(AgentId::new("worker-1"))
            .completion_dispatch(CompletionDispatchMode::Detached)
            .scope_log_level(OperationLogLevel::Info)
            .change_log_poll_interval(Duration::from_millis(40));

        assert_eq!(config.agent_id.as_str(), "worker-1");
        assert_eq!(config.completion_dispatch, CompletionDispatchMode::Detached);
        assert_eq!(config.change_log_poll_interval_ms, 40);
    }

    #[test]
    fn test_sub_millisecond_interval_rounds_up() {
        let config = OperationsConfig::new().change_log_poll_interval(Duration::from_micros(300));
        assert_eq!(config.poll_interval(), Duration::from_millis(1));
        assert!(config.validate().is_ok());

        let config = OperationsConfig::new().change_log_poll_interval(Duration::from_micros(2500));
        assert_eq!(config.change_log_poll_interval_ms, 3);
    }

    #[test]
    fn test_config_validation() {
        let config = OperationsConfig::new().change_log_poll_interval(Duration::ZERO);
        assert!(config.validate().is_err());

        let config = OperationsConfig::new().agent_id(AgentId::new(""));
        assert!(config.validate().is_err());

        let config = OperationsConfig::new().notifier_channel_capacity(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_config_deserializes_with_defaults() {
        let config: OperationsConfig = serde_json::from_str(
            r#"{"agent_id": "node-b", "completion_dispatch": "Detached"}"#,
        )
        .unwrap();
        assert_eq!(config.agent_id.as_str(), "node-b");
        assert_eq!(config.completion_dispatch, CompletionDispatchMode::Detached);
        assert_eq!(config.change_log_batch_size, 256);
    }
}
