use std::any::{Any, TypeId};
use std::fmt::Debug;

/// Object-safe access to the concrete command behind a `dyn Command`.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A request to mutate shared state.
///
/// Commands are immutable once dispatched and travel through the pipeline as
/// `Arc<dyn Command>`; handlers are resolved by the concrete type.
pub trait Command: AsAny + Debug + Send + Sync + 'static {
    /// Stable short name used in logs and in the change log.
    fn name(&self) -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }

    /// Second-order commands are never wrapped in an operation scope and
    /// never produce a completion of their own.
    fn is_meta(&self) -> bool {
        false
    }

    /// JSON form recorded in the change log when the command commits.
    fn payload(&self) -> serde_json::Value {
        serde_json::Value::Null
    }
}

impl dyn Command {
    pub fn downcast_ref<C: Command>(&self) -> Option<&C> {
        self.as_any().downcast_ref::<C>()
    }

    pub fn is<C: Command>(&self) -> bool {
        self.command_type_id() == TypeId::of::<C>()
    }

    pub(crate) fn command_type_id(&self) -> TypeId {
        self.as_any().type_id()
    }
}
