use super::{Completion, CompletionCommand};
use crate::command::{CommandContext, CommandHandler};
use crate::core::Result;
use async_trait::async_trait;
use tracing::trace;

/// Default completion handler: records the completion and does nothing else.
#[derive(Debug, Default, Clone, Copy)]
pub struct CompletionLogHandler;

#[async_trait]
impl CommandHandler<Completion> for CompletionLogHandler {
    async fn handle(&self, completion: &Completion, _ctx: &mut CommandContext) -> Result<()> {
        trace!(
            command = %completion.command().name(),
            operation = ?completion.operation().map(|op| op.id()),
            "operation completed"
        );
        Ok(())
    }
}

/// Runs the invalidation pass: replays the completed command through the
/// pipeline in invalidating mode so its handlers can invalidate whatever
/// they derived from the state it changed.
#[derive(Debug, Default, Clone, Copy)]
pub struct InvalidatingCompletionHandler;

#[async_trait]
impl CommandHandler<Completion> for InvalidatingCompletionHandler {
    async fn handle(&self, completion: &Completion, ctx: &mut CommandContext) -> Result<()> {
        let command = completion.command();
        if command.is_meta() {
            return Ok(());
        }
        ctx.commander().call_invalidating(command.clone()).await
    }
}
