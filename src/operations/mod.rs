//! Operation boundary: scopes around top-level commands, the committed
//! operation record, and the completion signalled once it committed.

pub mod classifier;
pub mod completion;
pub mod completion_producer;
pub mod config;
pub mod invalidation;
pub mod notifier;
pub mod operation;
pub mod scope;
pub mod scope_handler;

pub use classifier::{ContextModeClassifier, InvalidationModeClassifier, requires_operation};
pub use completion::{Completion, CompletionCommand};
pub use completion_producer::LocalCompletionProducer;
pub use config::{CompletionDispatchMode, OperationLogLevel, OperationsConfig};
pub use invalidation::{CompletionLogHandler, InvalidatingCompletionHandler};
pub use notifier::{CompositeNotifier, LocalCompletionNotifier, OperationCompletionNotifier};
pub use operation::{Operation, OperationItems};
pub use scope::{OperationScope, ScopeState};
pub use scope_handler::OperationScopeHandler;

use crate::command::{Command, CommanderBuilder, stage_order};
use crate::core::{OpError, Result};
use crate::storage::OperationStore;
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Installs the operation stages into a [`CommanderBuilder`] with a shared
/// classifier, at their standard positions.
pub struct OperationFramework {
    store: Arc<dyn OperationStore>,
    notifier: Option<Arc<dyn OperationCompletionNotifier>>,
    classifier: Arc<dyn InvalidationModeClassifier>,
    config: OperationsConfig,
}

impl OperationFramework {
    pub fn new(store: Arc<dyn OperationStore>) -> Self {
        Self {
            store,
            notifier: None,
            classifier: Arc::new(ContextModeClassifier),
            config: OperationsConfig::default(),
        }
    }

    pub fn with_config(mut self, config: OperationsConfig) -> Result<Self> {
        config.validate().map_err(OpError::InternalError)?;
        self.config = config;
        Ok(self)
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn OperationCompletionNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn InvalidationModeClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn config(&self) -> &OperationsConfig {
        &self.config
    }

    pub fn install(self, builder: CommanderBuilder) -> CommanderBuilder {
        let producer = LocalCompletionProducer::new(self.classifier.clone(), &self.config);
        let scope_handler =
            OperationScopeHandler::new(self.store, self.notifier, self.classifier, &self.config);
        builder
            .add_filter(stage_order::COMPLETION_PRODUCER, producer)
            .add_filter(stage_order::OPERATION_SCOPE, scope_handler)
    }
}

pub(crate) fn log_operation(level: OperationLogLevel, command: &dyn Command, message: &str) {
    match level {
        OperationLogLevel::Off => {}
        OperationLogLevel::Trace => trace!(command = %command.name(), "{}", message),
        OperationLogLevel::Debug => debug!(command = %command.name(), "{}", message),
        OperationLogLevel::Info => info!(command = %command.name(), "{}", message),
    }
}
