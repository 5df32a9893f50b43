use super::{
    Completion, CompletionDispatchMode, InvalidationModeClassifier, OperationLogLevel,
    OperationsConfig, log_operation, requires_operation,
};
use crate::command::{Command, CommandContext, CommandFilter, Next};
use crate::core::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Dispatches one [`Completion`] after a top-level invocation finished.
///
/// Registered outside the operation scope handler, so the scope is already
/// committed (or the invocation already failed) when this stage resumes.
pub struct LocalCompletionProducer {
    classifier: Arc<dyn InvalidationModeClassifier>,
    dispatch: CompletionDispatchMode,
    log_level: OperationLogLevel,
}

impl LocalCompletionProducer {
    pub fn new(classifier: Arc<dyn InvalidationModeClassifier>, config: &OperationsConfig) -> Self {
        Self {
            classifier,
            dispatch: config.completion_dispatch,
            log_level: config.completion_log_level,
        }
    }
}

#[async_trait]
impl CommandFilter for LocalCompletionProducer {
    fn name(&self) -> &'static str {
        "local_completion_producer"
    }

    async fn on_command(&self, ctx: &mut CommandContext, next: Next<'_>) -> Result<()> {
        next.run(ctx).await?;

        if !requires_operation(ctx, self.classifier.as_ref()) {
            return Ok(());
        }

        let completion = match (ctx.items().completion(), ctx.items().scope()) {
            (Some(completion), _) => completion.clone(),
            // A scope that staged nothing has nothing to complete.
            (None, Some(_)) => return Ok(()),
            (None, None) => Arc::new(Completion::new(ctx.command().clone(), None)),
        };
        let completion: Arc<dyn Command> = completion;
        log_operation(self.log_level, ctx.command().as_ref(), "dispatching completion");

        // Completions outlive the caller's cancellation.
        let commander = ctx.commander().clone();
        match self.dispatch {
            CompletionDispatchMode::Blocking => {
                commander
                    .call_with(completion, CancellationToken::new())
                    .await
            }
            CompletionDispatchMode::Detached => {
                let command = ctx.command().name();
                tokio::spawn(async move {
                    if let Err(err) = commander
                        .call_with(completion, CancellationToken::new())
                        .await
                    {
                        warn!(command = %command, error = %err, "detached completion failed");
                    }
                });
                Ok(())
            }
        }
    }
}
