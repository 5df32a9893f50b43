use super::Operation;
use crate::core::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Sink told about every operation whose scope committed with changes.
#[async_trait]
pub trait OperationCompletionNotifier: Send + Sync {
    async fn notify_completed(&self, operation: &Operation) -> Result<()>;
}

/// Publishes completed operations to in-process subscribers.
///
/// Subscribers that fall behind the channel capacity lose the oldest
/// operations (see [`broadcast::error::RecvError::Lagged`]).
#[derive(Debug, Clone)]
pub struct LocalCompletionNotifier {
    sender: broadcast::Sender<Operation>,
}

impl LocalCompletionNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Operation> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for LocalCompletionNotifier {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl OperationCompletionNotifier for LocalCompletionNotifier {
    async fn notify_completed(&self, operation: &Operation) -> Result<()> {
        // No subscribers is not an error.
        let _ = self.sender.send(operation.clone());
        Ok(())
    }
}

/// Fans a completion out to several notifiers, in order. Every notifier is
/// called; the first error is returned after all of them ran.
#[derive(Default, Clone)]
pub struct CompositeNotifier {
    notifiers: Vec<Arc<dyn OperationCompletionNotifier>>,
}

impl CompositeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, notifier: Arc<dyn OperationCompletionNotifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }
}

#[async_trait]
impl OperationCompletionNotifier for CompositeNotifier {
    async fn notify_completed(&self, operation: &Operation) -> Result<()> {
        let mut first_error = None;
        for notifier in &self.notifiers {
            if let Err(err) = notifier.notify_completed(operation).await {
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
