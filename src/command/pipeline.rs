use super::{Command, CommandContext, ExecutionMode};
use crate::core::{OpError, Result};
use crate::operations::{Completion, CompletionLogHandler};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::any::TypeId;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info_span};

/// Positions of the built-in stages. Lower values wrap higher ones.
pub mod stage_order {
    pub const COMPLETION_PRODUCER: i32 = -10_000;
    pub const OPERATION_SCOPE: i32 = -1_000;
    pub const DEFAULT: i32 = 0;
}

/// A pipeline stage that runs around the remaining stages.
#[async_trait]
pub trait CommandFilter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Must call `next.run(ctx)` exactly once unless it short-circuits.
    async fn on_command(&self, ctx: &mut CommandContext, next: Next<'_>) -> Result<()>;
}

/// Business logic for one command type.
#[async_trait]
pub trait CommandHandler<C: Command>: Send + Sync {
    async fn handle(&self, command: &C, ctx: &mut CommandContext) -> Result<()>;
}

#[async_trait]
trait ErasedHandler: Send + Sync {
    async fn handle(&self, ctx: &mut CommandContext) -> Result<()>;
}

struct TypedHandler<C, H> {
    handler: H,
    _command: PhantomData<fn() -> C>,
}

#[async_trait]
impl<C, H> ErasedHandler for TypedHandler<C, H>
where
    C: Command,
    H: CommandHandler<C>,
{
    async fn handle(&self, ctx: &mut CommandContext) -> Result<()> {
        let command = ctx.command().clone();
        let typed = command.downcast_ref::<C>().ok_or_else(|| {
            OpError::InternalError(format!(
                "Handler for '{}' received '{}'",
                std::any::type_name::<C>(),
                command.name()
            ))
        })?;
        self.handler.handle(typed, ctx).await
    }
}

struct RegisteredFilter {
    order: i32,
    filter: Arc<dyn CommandFilter>,
}

/// Continuation handed to a filter: the stages after it plus the handler.
pub struct Next<'a> {
    filters: &'a [RegisteredFilter],
    handler: Option<&'a Arc<dyn ErasedHandler>>,
}

impl<'a> Next<'a> {
    pub fn run<'b>(self, ctx: &'b mut CommandContext) -> BoxFuture<'b, Result<()>>
    where
        'a: 'b,
    {
        Box::pin(async move {
            match self.filters.split_first() {
                Some((first, rest)) => {
                    let next = Next {
                        filters: rest,
                        handler: self.handler,
                    };
                    first.filter.on_command(ctx, next).await
                }
                None => match self.handler {
                    Some(handler) => handler.handle(ctx).await,
                    None => Err(OpError::NoHandler(ctx.command().name().to_string())),
                },
            }
        })
    }
}

struct CommanderInner {
    filters: Vec<RegisteredFilter>,
    handlers: HashMap<TypeId, Arc<dyn ErasedHandler>>,
}

/// Dispatches commands through a fixed, ordered set of filters to their
/// handlers. Cheap to clone.
#[derive(Clone)]
pub struct Commander {
    inner: Arc<CommanderInner>,
}

impl Commander {
    pub fn builder() -> CommanderBuilder {
        CommanderBuilder::default()
    }

    /// Runs `command` as a top-level invocation.
    pub async fn call<C: Command>(&self, command: C) -> Result<()> {
        self.call_with(Arc::new(command), CancellationToken::new())
            .await
    }

    pub async fn call_with(
        &self,
        command: Arc<dyn Command>,
        cancellation: CancellationToken,
    ) -> Result<()> {
        let mut ctx = self.context_for(command, cancellation);
        self.invoke(&mut ctx).await
    }

    /// Re-runs `command` purely to recompute derived values.
    pub async fn call_invalidating(&self, command: Arc<dyn Command>) -> Result<()> {
        let mut ctx = CommandContext::top_level(
            self.clone(),
            command,
            ExecutionMode::Invalidating,
            CancellationToken::new(),
        );
        self.invoke(&mut ctx).await
    }

    /// Builds a top-level context; pair with [`Commander::invoke`] to inspect
    /// the context after the run.
    pub fn context_for(
        &self,
        command: Arc<dyn Command>,
        cancellation: CancellationToken,
    ) -> CommandContext {
        CommandContext::top_level(self.clone(), command, ExecutionMode::Normal, cancellation)
    }

    pub async fn invoke(&self, ctx: &mut CommandContext) -> Result<()> {
        let handler = self
            .inner
            .handlers
            .get(&ctx.command().command_type_id());
        let span = info_span!(
            "command",
            command = %ctx.command().name(),
            top_level = ctx.is_top_level(),
            mode = ?ctx.mode()
        );
        let next = Next {
            filters: &self.inner.filters,
            handler,
        };
        next.run(ctx).instrument(span).await
    }

    /// Names of the registered filters, outermost first.
    pub fn filter_names(&self) -> Vec<&'static str> {
        self.inner.filters.iter().map(|f| f.filter.name()).collect()
    }

    pub fn has_handler<C: Command>(&self) -> bool {
        self.inner.handlers.contains_key(&TypeId::of::<C>())
    }
}

/// Composes a [`Commander`] at startup.
#[derive(Default)]
pub struct CommanderBuilder {
    filters: Vec<RegisteredFilter>,
    handlers: HashMap<TypeId, Arc<dyn ErasedHandler>>,
}

impl CommanderBuilder {
    /// Adds a filter at `order`; filters with equal order keep insertion order.
    pub fn add_filter<F>(mut self, order: i32, filter: F) -> Self
    where
        F: CommandFilter + 'static,
    {
        self.filters.push(RegisteredFilter {
            order,
            filter: Arc::new(filter),
        });
        self
    }

    /// Registers the handler for `C`, replacing any previous one.
    pub fn add_handler<C, H>(mut self, handler: H) -> Self
    where
        C: Command,
        H: CommandHandler<C> + 'static,
    {
        self.handlers.insert(
            TypeId::of::<C>(),
            Arc::new(TypedHandler {
                handler,
                _command: PhantomData,
            }),
        );
        self
    }

    pub fn build(mut self) -> Commander {
        self.filters.sort_by_key(|f| f.order);
        if !self.handlers.contains_key(&TypeId::of::<Completion>()) {
            self = self.add_handler::<Completion, _>(CompletionLogHandler);
        }
        Commander {
            inner: Arc::new(CommanderInner {
                filters: self.filters,
                handlers: self.handlers,
            }),
        }
    }
}
