use crate::command::{CommandContext, ExecutionMode};

/// Tells a real execution apart from an invalidation-only replay.
///
/// Both operation stages share one instance so their wrap decisions always
/// agree for the same invocation.
pub trait InvalidationModeClassifier: Send + Sync {
    fn is_invalidating(&self, ctx: &CommandContext) -> bool;
}

/// Reads the mode threaded through the invocation context.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContextModeClassifier;

impl InvalidationModeClassifier for ContextModeClassifier {
    fn is_invalidating(&self, ctx: &CommandContext) -> bool {
        ctx.mode() == ExecutionMode::Invalidating
    }
}

/// Top-level, non-meta, non-invalidating invocations get a scope and a
/// completion; everything else passes straight through.
pub fn requires_operation(
    ctx: &CommandContext,
    classifier: &dyn InvalidationModeClassifier,
) -> bool {
    ctx.is_top_level() && !ctx.command().is_meta() && !classifier.is_invalidating(ctx)
}
