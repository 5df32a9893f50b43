use super::ChangeLogMonitor;
use crate::core::{OpError, Result};
use crate::storage::ChangeLogReader;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Monitor for stores written by other processes: polls the newest
/// change-log sequence at a fixed interval.
#[derive(Clone)]
pub struct PollingChangeLogMonitor {
    reader: Arc<dyn ChangeLogReader>,
    interval: Duration,
    last_seen: u64,
}

impl PollingChangeLogMonitor {
    /// Starts at the log's current end; only later commits wake it.
    pub async fn new(reader: Arc<dyn ChangeLogReader>, interval: Duration) -> Result<Self> {
        let last_seen = reader.last_sequence().await?;
        Ok(Self {
            reader,
            interval: interval.max(Duration::from_millis(1)),
            last_seen,
        })
    }

    pub fn last_seen(&self) -> u64 {
        self.last_seen
    }
}

#[async_trait]
impl ChangeLogMonitor for PollingChangeLogMonitor {
    async fn wait_for_changes(&mut self, cancellation: &CancellationToken) -> Result<()> {
        loop {
            if cancellation.is_cancelled() {
                return Err(OpError::Cancelled);
            }

            let current = self.reader.last_sequence().await?;
            if current > self.last_seen {
                self.last_seen = current;
                return Ok(());
            }

            tokio::select! {
                biased;
                _ = cancellation.cancelled() => return Err(OpError::Cancelled),
                _ = sleep(self.interval) => {}
            }
        }
    }
}
