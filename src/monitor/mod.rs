//! Change-log monitors: wake-up signals telling a process that operations
//! were committed, by itself or by any other process sharing the store.

pub mod local;
pub mod polling;
pub mod watcher;

pub use local::LocalChangeLogMonitor;
pub use polling::PollingChangeLogMonitor;
pub use watcher::{ChangeLogWatcher, spawn_change_log_watcher};

use crate::core::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Liveness signal for new change-log records; carries no payload and no
/// ordering guarantee.
///
/// A monitor value is one waiter: it tracks what it has already observed.
/// Concurrent waiters each use their own clone, so no waiter can consume a
/// change on behalf of another.
#[async_trait]
pub trait ChangeLogMonitor: Send {
    /// Completes once at least one record was committed since the previous
    /// successful return (or since the monitor was created). Fails with
    /// `OpError::Cancelled` as soon as `cancellation` fires.
    async fn wait_for_changes(&mut self, cancellation: &CancellationToken) -> Result<()>;
}
