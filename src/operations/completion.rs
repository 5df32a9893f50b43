use super::Operation;
use crate::command::Command;
use serde_json::json;
use std::sync::Arc;

/// "Operation X completed": a meta-command dispatched once per committed
/// top-level invocation.
pub trait CompletionCommand: Command {
    /// The command whose execution completed.
    fn command(&self) -> &Arc<dyn Command>;

    /// The committed operation, when the command ran inside a used scope.
    fn operation(&self) -> Option<&Operation>;
}

#[derive(Debug, Clone)]
pub struct Completion {
    command: Arc<dyn Command>,
    operation: Option<Operation>,
}

impl Completion {
    pub fn new(command: Arc<dyn Command>, operation: Option<Operation>) -> Self {
        Self { command, operation }
    }

    pub fn from_operation(operation: Operation) -> Self {
        Self {
            command: operation.command().clone(),
            operation: Some(operation),
        }
    }
}

impl Command for Completion {
    fn name(&self) -> &'static str {
        "Completion"
    }

    fn is_meta(&self) -> bool {
        true
    }

    fn payload(&self) -> serde_json::Value {
        json!({
            "command": self.command.name(),
            "operation_id": self.operation.as_ref().map(|op| op.id().to_string()),
        })
    }
}

impl CompletionCommand for Completion {
    fn command(&self) -> &Arc<dyn Command> {
        &self.command
    }

    fn operation(&self) -> Option<&Operation> {
        self.operation.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::AgentId;

    #[derive(Debug)]
    struct Archive;

    impl Command for Archive {}

    #[test]
    fn test_completion_is_meta_and_wraps_command() {
        let operation = Operation::new(AgentId::new("a"), Arc::new(Archive));
        let id = operation.id();
        let completion = Completion::from_operation(operation);

        assert!(completion.is_meta());
        assert_eq!(completion.name(), "Completion");
        assert_eq!(CompletionCommand::command(&completion).name(), "Archive");
        assert_eq!(completion.operation().map(|op| op.id()), Some(id));
        assert_eq!(completion.payload()["command"], "Archive");
    }

    #[test]
    fn test_completion_without_operation() {
        let completion = Completion::new(Arc::new(Archive), None);
        assert!(completion.operation().is_none());
        assert!(completion.payload()["operation_id"].is_null());
    }
}
