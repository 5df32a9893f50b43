use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpError {
    /// Pipeline misconfiguration. Never retried.
    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("No handler registered for command '{0}'")]
    NoHandler(String),

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Scope error: {0}")]
    ScopeError(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Errors raised by business logic, passed through untouched.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl OpError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, OpError::Cancelled)
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, OpError::InternalError(_))
    }

    /// Downcasts a business error carried in [`OpError::Other`].
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::fmt::Display + std::fmt::Debug + Send + Sync + 'static,
    {
        match self {
            OpError::Other(err) => err.downcast_ref::<E>(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, OpError>;
