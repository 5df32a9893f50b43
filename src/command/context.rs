use super::{Command, Commander};
use crate::core::{OpError, Result};
use crate::operations::{Completion, Operation, OperationItems, OperationScope};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Whether a pipeline run is a real mutation attempt or a replay that only
/// recomputes derived values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    #[default]
    Normal,
    Invalidating,
}

/// What a nested invocation can see of the invocation that dispatched it.
#[derive(Debug)]
pub struct OuterContext {
    command: Arc<dyn Command>,
    scope: Option<Arc<OperationScope>>,
    parent: Option<Arc<OuterContext>>,
}

impl OuterContext {
    pub fn command(&self) -> &Arc<dyn Command> {
        &self.command
    }

    /// Scope of the enclosing top-level invocation, if it has one.
    pub fn scope(&self) -> Option<&Arc<OperationScope>> {
        self.scope.as_ref()
    }

    pub fn parent(&self) -> Option<&OuterContext> {
        self.parent.as_deref()
    }

    /// Number of invocations between this one and the top level.
    pub fn depth(&self) -> usize {
        1 + self.parent.as_ref().map_or(0, |p| p.depth())
    }
}

/// Objects passed between pipeline stages of one invocation.
///
/// Every field has exactly one writer:
/// - `scope`, `operation`, `completion`, `rollback_failure`: the operation
///   scope handler
/// - `captured`: business handlers (and nested invocations, merged back on
///   success)
#[derive(Debug, Default)]
pub struct ContextItems {
    scope: Option<Arc<OperationScope>>,
    operation: Option<Operation>,
    completion: Option<Arc<Completion>>,
    captured: OperationItems,
    rollback_failure: Option<String>,
}

impl ContextItems {
    pub fn scope(&self) -> Option<&Arc<OperationScope>> {
        self.scope.as_ref()
    }

    pub fn operation(&self) -> Option<&Operation> {
        self.operation.as_ref()
    }

    pub fn completion(&self) -> Option<&Arc<Completion>> {
        self.completion.as_ref()
    }

    /// Items the handlers marked as relevant for invalidation.
    pub fn captured(&self) -> &OperationItems {
        &self.captured
    }

    /// Rollback error swallowed after a failed operation.
    pub fn rollback_failure(&self) -> Option<&str> {
        self.rollback_failure.as_deref()
    }

    pub fn capture(&mut self, key: impl Into<String>, value: Value) {
        self.captured.insert(key.into(), value);
    }

    pub(crate) fn set_scope(&mut self, scope: Arc<OperationScope>) {
        self.scope = Some(scope);
    }

    pub(crate) fn set_operation(&mut self, operation: Operation) {
        self.operation = Some(operation);
    }

    pub(crate) fn operation_mut(&mut self) -> Option<&mut Operation> {
        self.operation.as_mut()
    }

    pub(crate) fn set_completion(&mut self, completion: Arc<Completion>) {
        self.completion = Some(completion);
    }

    pub(crate) fn set_rollback_failure(&mut self, failure: String) {
        self.rollback_failure = Some(failure);
    }
}

/// Execution context of exactly one command invocation.
pub struct CommandContext {
    commander: Commander,
    command: Arc<dyn Command>,
    outer: Option<Arc<OuterContext>>,
    mode: ExecutionMode,
    cancellation: CancellationToken,
    items: ContextItems,
}

impl CommandContext {
    pub(crate) fn top_level(
        commander: Commander,
        command: Arc<dyn Command>,
        mode: ExecutionMode,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            commander,
            command,
            outer: None,
            mode,
            cancellation,
            items: ContextItems::default(),
        }
    }

    pub fn command(&self) -> &Arc<dyn Command> {
        &self.command
    }

    pub fn commander(&self) -> &Commander {
        &self.commander
    }

    /// `Some` for nested invocations.
    pub fn outer(&self) -> Option<&OuterContext> {
        self.outer.as_deref()
    }

    pub fn is_top_level(&self) -> bool {
        self.outer.is_none()
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn is_invalidating(&self) -> bool {
        self.mode == ExecutionMode::Invalidating
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Fails with [`OpError::Cancelled`] once cancellation was requested.
    pub fn check_cancelled(&self) -> Result<()> {
        if self.cancellation.is_cancelled() {
            return Err(OpError::Cancelled);
        }
        Ok(())
    }

    pub fn items(&self) -> &ContextItems {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut ContextItems {
        &mut self.items
    }

    /// Records an item for the operation's invalidation payload.
    pub fn capture(&mut self, key: impl Into<String>, value: Value) {
        self.items.capture(key, value);
    }

    /// The scope this invocation mutates through: its own, or the one of the
    /// enclosing top-level invocation.
    pub fn operation_scope(&self) -> Option<&Arc<OperationScope>> {
        self.items
            .scope()
            .or_else(|| self.outer.as_ref().and_then(|outer| outer.scope()))
    }

    pub fn require_operation_scope(&self) -> Result<Arc<OperationScope>> {
        self.operation_scope().cloned().ok_or_else(|| {
            OpError::ScopeError(format!(
                "Command '{}' requires an operation scope, but none is active",
                self.command.name()
            ))
        })
    }

    /// Dispatches `command` as a nested invocation of this one.
    pub async fn call<C: Command>(&mut self, command: C) -> Result<()> {
        self.call_arc(Arc::new(command)).await
    }

    pub async fn call_arc(&mut self, command: Arc<dyn Command>) -> Result<()> {
        let outer = Arc::new(OuterContext {
            command: self.command.clone(),
            scope: self.operation_scope().cloned(),
            parent: self.outer.clone(),
        });
        let mut nested = CommandContext {
            commander: self.commander.clone(),
            command,
            outer: Some(outer),
            mode: self.mode,
            cancellation: self.cancellation.clone(),
            items: ContextItems::default(),
        };

        let commander = self.commander.clone();
        commander.invoke(&mut nested).await?;
        self.items.captured.append(&mut nested.items.captured);
        Ok(())
    }
}

impl std::fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandContext")
            .field("command", &self.command)
            .field("outer", &self.outer.as_ref().map(|o| o.command.name()))
            .field("mode", &self.mode)
            .field("items", &self.items)
            .finish()
    }
}
