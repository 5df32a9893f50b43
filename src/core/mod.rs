pub mod error;
pub mod types;

pub use error::{OpError, Result};
pub use types::{AgentId, OperationId};
