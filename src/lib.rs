// ============================================================================
// opscope Library
// ============================================================================

pub mod auth;
pub mod command;
pub mod core;
pub mod monitor;
pub mod operations;
pub mod storage;
pub mod transaction;

// Re-export main types for convenience
pub use command::{
    Command, CommandContext, CommandFilter, CommandHandler, Commander, CommanderBuilder,
    ExecutionMode, Next, stage_order,
};
pub use core::{AgentId, OpError, OperationId, Result};
pub use monitor::{ChangeLogMonitor, LocalChangeLogMonitor, PollingChangeLogMonitor};
pub use operations::{
    Completion, CompletionCommand, CompletionDispatchMode, ContextModeClassifier,
    InvalidatingCompletionHandler, InvalidationModeClassifier, LocalCompletionNotifier,
    LocalCompletionProducer, Operation, OperationCompletionNotifier, OperationFramework,
    OperationScope, OperationScopeHandler, OperationsConfig,
};
pub use storage::{ChangeLogReader, ChangeLogRecord, InMemoryStore, OperationStore, StoreTransaction};

// ============================================================================
// Quick start
// ============================================================================

/// Builds a commander with the operation stages installed over `store`.
///
/// # Examples
///
/// ```
/// use opscope::{Command, CommandContext, CommandHandler, InMemoryStore, Result, commander_with_operations};
/// use async_trait::async_trait;
/// use serde_json::json;
/// use std::sync::Arc;
///
/// #[derive(Debug)]
/// struct Deposit { amount: i64 }
///
/// impl Command for Deposit {}
///
/// struct DepositHandler;
///
/// #[async_trait]
/// impl CommandHandler<Deposit> for DepositHandler {
///     async fn handle(&self, command: &Deposit, ctx: &mut CommandContext) -> Result<()> {
///         let scope = ctx.require_operation_scope()?;
///         scope.put("balance", json!(command.amount)).await
///     }
/// }
///
/// # #[tokio::main]
/// # async fn main() -> Result<()> {
/// let store = InMemoryStore::new();
/// let commander = commander_with_operations(Arc::new(store.clone()))
///     .add_handler::<Deposit, _>(DepositHandler)
///     .build();
///
/// commander.call(Deposit { amount: 10 }).await?;
/// assert_eq!(store.read("balance").await, Some(json!(10)));
/// # Ok(())
/// # }
/// ```
pub fn commander_with_operations(store: std::sync::Arc<dyn OperationStore>) -> CommanderBuilder {
    OperationFramework::new(store).install(Commander::builder())
}
