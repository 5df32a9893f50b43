use super::{
    Completion, InvalidationModeClassifier, Operation, OperationCompletionNotifier,
    OperationLogLevel, OperationScope, OperationsConfig, log_operation, requires_operation,
    scope::ScopeLease,
};
use crate::command::{CommandContext, CommandFilter, Next};
use crate::core::{AgentId, OpError, Result};
use crate::storage::OperationStore;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, warn};

/// Wraps every top-level, non-meta, non-invalidating invocation in an
/// [`OperationScope`] and commits or rolls it back.
///
/// After a commit that staged changes, the committed [`Operation`] is
/// handed to the completion notifier and a [`Completion`] is left in the
/// context for the completion producer.
pub struct OperationScopeHandler {
    store: Arc<dyn OperationStore>,
    notifier: Option<Arc<dyn OperationCompletionNotifier>>,
    classifier: Arc<dyn InvalidationModeClassifier>,
    agent_id: AgentId,
    log_level: OperationLogLevel,
}

impl OperationScopeHandler {
    pub fn new(
        store: Arc<dyn OperationStore>,
        notifier: Option<Arc<dyn OperationCompletionNotifier>>,
        classifier: Arc<dyn InvalidationModeClassifier>,
        config: &OperationsConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            classifier,
            agent_id: config.agent_id.clone(),
            log_level: config.scope_log_level,
        }
    }

    async fn run_and_commit(
        &self,
        ctx: &mut CommandContext,
        scope: &OperationScope,
        next: Next<'_>,
    ) -> Result<()> {
        next.run(ctx).await?;
        ctx.check_cancelled()?;

        let captured = ctx.items().captured().clone();
        let operation = ctx.items_mut().operation_mut().ok_or_else(|| {
            OpError::InternalError("Operation was removed from the context".to_string())
        })?;
        operation.capture_items(&captured);
        operation.mark_committed(Utc::now());
        scope.commit(operation).await
    }

    async fn notify(&self, operation: &Operation) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        if let Err(err) = notifier.notify_completed(operation).await {
            warn!(
                operation = %operation.id(),
                command = %operation.command().name(),
                error = %err,
                "operation completion notifier failed"
            );
        }
    }
}

#[async_trait]
impl CommandFilter for OperationScopeHandler {
    fn name(&self) -> &'static str {
        "operation_scope"
    }

    async fn on_command(&self, ctx: &mut CommandContext, next: Next<'_>) -> Result<()> {
        if !requires_operation(ctx, self.classifier.as_ref()) {
            return next.run(ctx).await;
        }

        if ctx.items().scope().is_some() {
            return Err(OpError::InternalError(format!(
                "Operation scope is already provided for '{}'. Duplicate handler?",
                ctx.command().name()
            )));
        }

        let command = ctx.command().clone();
        let scope = Arc::new(OperationScope::new(self.store.begin().await?));
        let _lease = ScopeLease::new(scope.clone());
        ctx.items_mut().set_scope(scope.clone());
        ctx.items_mut()
            .set_operation(Operation::new(self.agent_id.clone(), command.clone()));

        match self.run_and_commit(ctx, &scope, next).await {
            Ok(()) => {}
            Err(err) if err.is_cancelled() => return Err(err),
            Err(err) => {
                error!(command = ?command, error = %err, "operation failed");
                if let Err(rollback_err) = scope.rollback().await {
                    warn!(
                        command = %command.name(),
                        error = %rollback_err,
                        "operation rollback failed"
                    );
                    ctx.items_mut()
                        .set_rollback_failure(rollback_err.to_string());
                }
                return Err(err);
            }
        }

        if !scope.is_used() {
            return Ok(());
        }

        let operation = ctx.items().operation().cloned().ok_or_else(|| {
            OpError::InternalError("Operation was removed from the context".to_string())
        })?;
        log_operation(self.log_level, command.as_ref(), "operation succeeded");
        ctx.items_mut()
            .set_completion(Arc::new(Completion::from_operation(operation.clone())));
        self.notify(&operation).await;
        Ok(())
    }
}
