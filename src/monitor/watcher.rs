use super::ChangeLogMonitor;
use crate::core::{AgentId, OpError, Result};
use crate::operations::OperationsConfig;
use crate::storage::{ChangeLogReader, ChangeLogRecord};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Background worker that turns change-log wake-ups into a stream of the
/// records other agents committed.
pub struct ChangeLogWatcher {
    records: broadcast::Sender<ChangeLogRecord>,
    stop: CancellationToken,
    join_handle: Option<JoinHandle<()>>,
}

impl ChangeLogWatcher {
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeLogRecord> {
        self.records.subscribe()
    }

    /// Signals the worker to stop and waits for it to finish.
    pub async fn stop(mut self) -> Result<()> {
        self.stop.cancel();
        if let Some(join_handle) = self.join_handle.take() {
            join_handle
                .await
                .map_err(|err| OpError::InternalError(format!("change log watcher join: {}", err)))?;
        }
        Ok(())
    }
}

impl Drop for ChangeLogWatcher {
    fn drop(&mut self) {
        self.stop.cancel();
        if let Some(join_handle) = self.join_handle.take() {
            join_handle.abort();
        }
    }
}

/// Spawns a watcher that starts at the log's current end.
///
/// Records committed by `config.agent_id` are skipped: this process already
/// completed them locally.
pub async fn spawn_change_log_watcher<M>(
    reader: Arc<dyn ChangeLogReader>,
    mut monitor: M,
    config: &OperationsConfig,
) -> Result<ChangeLogWatcher>
where
    M: ChangeLogMonitor + 'static,
{
    config.validate().map_err(OpError::InternalError)?;
    let mut cursor = reader.last_sequence().await?;
    let (records, _) = broadcast::channel(config.notifier_channel_capacity);
    let stop = CancellationToken::new();

    let agent_id: AgentId = config.agent_id.clone();
    let batch_size = config.change_log_batch_size;
    let retry_delay = config.poll_interval();
    let sender = records.clone();
    let worker_stop = stop.clone();

    let join_handle = tokio::spawn(async move {
        'watch: loop {
            match monitor.wait_for_changes(&worker_stop).await {
                Ok(()) => {}
                Err(OpError::Cancelled) => break,
                Err(err) => {
                    warn!(error = %err, "change log monitor failed");
                    tokio::select! {
                        _ = worker_stop.cancelled() => break,
                        _ = sleep(retry_delay) => continue,
                    }
                }
            }

            loop {
                let batch = match reader.read_since(cursor, batch_size).await {
                    Ok(batch) => batch,
                    Err(err) => {
                        // The wake-up is already consumed: retry the read.
                        warn!(error = %err, cursor, "change log read failed");
                        tokio::select! {
                            _ = worker_stop.cancelled() => break 'watch,
                            _ = sleep(retry_delay) => continue,
                        }
                    }
                };
                let Some(last) = batch.last() else {
                    break;
                };
                cursor = last.sequence;
                let full_batch = batch.len() == batch_size;

                for record in batch {
                    if record.is_from(&agent_id) {
                        continue;
                    }
                    debug!(
                        sequence = record.sequence,
                        agent = %record.agent_id,
                        command = %record.command_name,
                        "external operation observed"
                    );
                    let _ = sender.send(record);
                }

                if !full_batch {
                    break;
                }
            }
        }
    });

    Ok(ChangeLogWatcher {
        records,
        stop,
        join_handle: Some(join_handle),
    })
}
