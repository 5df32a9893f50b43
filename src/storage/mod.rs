//! Storage collaborator contracts: transactions that back operation scopes
//! and the change log that records every committed operation.

pub mod change_log;
pub mod memory;

pub use change_log::ChangeLogRecord;
pub use memory::InMemoryStore;

use crate::core::Result;
use crate::operations::Operation;
use crate::transaction::TransactionId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Hands out transactions, one per operation scope.
#[async_trait]
pub trait OperationStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>>;
}

/// A store transaction bound to one top-level invocation.
#[async_trait]
pub trait StoreTransaction: Send + Sync {
    fn id(&self) -> TransactionId;

    /// Reads through the transaction's own staged changes.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    async fn put(&mut self, key: &str, value: Value) -> Result<()>;

    /// Returns whether `key` existed before the delete.
    async fn delete(&mut self, key: &str) -> Result<bool>;

    fn has_changes(&self) -> bool;

    /// Applies staged changes and, if there were any, appends `operation` to
    /// the change log.
    async fn commit(&mut self, operation: &Operation) -> Result<()>;

    async fn rollback(&mut self) -> Result<()>;

    /// Drops staged changes without awaiting. Called when a scope is
    /// released while still active.
    fn discard(&mut self);
}

/// Read side of the change log, ordered by sequence.
#[async_trait]
pub trait ChangeLogReader: Send + Sync {
    /// Sequence of the newest record; 0 when the log is empty.
    async fn last_sequence(&self) -> Result<u64>;

    /// Records with a sequence greater than `sequence`, oldest first.
    async fn read_since(&self, sequence: u64, limit: usize) -> Result<Vec<ChangeLogRecord>>;

    /// Records committed at or after `since`, oldest first.
    async fn read_since_time(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ChangeLogRecord>>;
}
