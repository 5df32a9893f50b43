//! Command dispatch: commands, per-invocation contexts and the ordered
//! filter pipeline that hosts the operation stages.

pub mod command;
pub mod context;
pub mod pipeline;

pub use command::Command;
pub use context::{CommandContext, ContextItems, ExecutionMode, OuterContext};
pub use pipeline::{
    CommandFilter, CommandHandler, Commander, CommanderBuilder, Next, stage_order,
};
