use crate::command::Command;
use crate::core::{AgentId, OperationId};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Items captured from the invocation context at commit time.
pub type OperationItems = BTreeMap<String, Value>;

/// Metadata of one committed mutation.
#[derive(Debug, Clone)]
pub struct Operation {
    id: OperationId,
    agent_id: AgentId,
    command: Arc<dyn Command>,
    start_time: DateTime<Utc>,
    commit_time: Option<DateTime<Utc>>,
    items: OperationItems,
}

impl Operation {
    pub fn new(agent_id: AgentId, command: Arc<dyn Command>) -> Self {
        Self {
            id: OperationId::new(),
            agent_id,
            command,
            start_time: Utc::now(),
            commit_time: None,
            items: OperationItems::new(),
        }
    }

    pub fn id(&self) -> OperationId {
        self.id
    }

    pub fn agent_id(&self) -> &AgentId {
        &self.agent_id
    }

    pub fn command(&self) -> &Arc<dyn Command> {
        &self.command
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// Set right before the scope commits.
    pub fn commit_time(&self) -> Option<DateTime<Utc>> {
        self.commit_time
    }

    pub fn items(&self) -> &OperationItems {
        &self.items
    }

    pub fn item(&self, key: &str) -> Option<&Value> {
        self.items.get(key)
    }

    /// Replaces the captured items with a snapshot of `items`.
    pub(crate) fn capture_items(&mut self, items: &OperationItems) {
        self.items = items.clone();
    }

    pub(crate) fn mark_committed(&mut self, at: DateTime<Utc>) {
        self.commit_time = Some(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug)]
    struct Touch;

    impl Command for Touch {}

    #[test]
    fn test_capture_replaces_previous_snapshot() {
        let mut operation = Operation::new(AgentId::new("a"), Arc::new(Touch));
        let mut items = OperationItems::new();
        items.insert("user".into(), json!(1));
        operation.capture_items(&items);

        items.clear();
        items.insert("account".into(), json!(2));
        operation.capture_items(&items);

        assert!(operation.item("user").is_none());
        assert_eq!(operation.item("account"), Some(&json!(2)));
        assert!(operation.commit_time().is_none());
        assert_eq!(operation.command().name(), "Touch");
    }
}
