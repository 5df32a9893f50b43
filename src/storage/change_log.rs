use crate::core::{AgentId, OpError, OperationId, Result};
use crate::operations::{Operation, OperationItems};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One committed operation as persisted in the change log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeLogRecord {
    pub sequence: u64,
    pub operation_id: OperationId,
    pub agent_id: AgentId,
    pub command_name: String,
    pub command: Value,
    pub commit_time: DateTime<Utc>,
    pub items: OperationItems,
}

impl ChangeLogRecord {
    pub fn from_operation(sequence: u64, operation: &Operation) -> Result<Self> {
        let commit_time = operation.commit_time().ok_or_else(|| {
            OpError::StoreError(format!(
                "Operation {} has no commit time",
                operation.id()
            ))
        })?;
        Ok(Self {
            sequence,
            operation_id: operation.id(),
            agent_id: operation.agent_id().clone(),
            command_name: operation.command().name().to_string(),
            command: operation.command().payload(),
            commit_time,
            items: operation.items().clone(),
        })
    }

    pub fn is_from(&self, agent_id: &AgentId) -> bool {
        &self.agent_id == agent_id
    }
}
