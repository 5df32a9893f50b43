use super::ChangeLogMonitor;
use crate::core::{OpError, Result};
use async_trait::async_trait;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Monitor fed directly by the commits of an in-process store.
///
/// Obtained from `InMemoryStore::change_monitor`. Clones start from the
/// version their source had observed.
#[derive(Debug, Clone)]
pub struct LocalChangeLogMonitor {
    receiver: watch::Receiver<u64>,
}

impl LocalChangeLogMonitor {
    pub(crate) fn new(receiver: watch::Receiver<u64>) -> Self {
        Self { receiver }
    }

    /// Sequence of the newest record this monitor has seen announced.
    pub fn last_sequence(&self) -> u64 {
        *self.receiver.borrow()
    }
}

#[async_trait]
impl ChangeLogMonitor for LocalChangeLogMonitor {
    async fn wait_for_changes(&mut self, cancellation: &CancellationToken) -> Result<()> {
        tokio::select! {
            biased;
            _ = cancellation.cancelled() => Err(OpError::Cancelled),
            changed = self.receiver.changed() => changed
                .map_err(|_| OpError::StoreError("Change log closed".to_string())),
        }
    }
}
