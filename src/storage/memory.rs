// ============================================================================
// In-Memory Operation Store
// ============================================================================
//
// JSON key/value store with per-transaction staged changes and an
// append-only change log. Every handle cloned from one store sees the same
// data and log, so several commanders sharing a store behave like several
// processes sharing a database.
//
// ============================================================================

use super::{ChangeLogReader, ChangeLogRecord, OperationStore, StoreTransaction};
use crate::core::{OpError, Result};
use crate::monitor::LocalChangeLogMonitor;
use crate::operations::Operation;
use crate::transaction::{Change, TransactionId, TransactionState};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{RwLock, watch};
use tracing::debug;

struct StoreInner {
    data: RwLock<HashMap<String, Value>>,
    change_log: RwLock<Vec<ChangeLogRecord>>,
    active_transactions: AtomicUsize,
    // Sequence of the newest change-log record
    last_sequence: watch::Sender<u64>,
}

#[derive(Clone)]
pub struct InMemoryStore {
    inner: Arc<StoreInner>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        let (last_sequence, _) = watch::channel(0);
        Self {
            inner: Arc::new(StoreInner {
                data: RwLock::new(HashMap::new()),
                change_log: RwLock::new(Vec::new()),
                active_transactions: AtomicUsize::new(0),
                last_sequence,
            }),
        }
    }

    /// Reads committed state, outside of any transaction.
    pub async fn read(&self, key: &str) -> Option<Value> {
        self.inner.data.read().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.data.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.data.read().await.is_empty()
    }

    pub fn active_transactions(&self) -> usize {
        self.inner.active_transactions.load(Ordering::SeqCst)
    }

    pub async fn change_log_len(&self) -> usize {
        self.inner.change_log.read().await.len()
    }

    /// A monitor woken by every commit that appends to this store's log.
    pub fn change_monitor(&self) -> LocalChangeLogMonitor {
        LocalChangeLogMonitor::new(self.inner.last_sequence.subscribe())
    }

    /// Drops change-log records committed before `before`; returns how many
    /// were removed. Sequences of the remaining records are unchanged.
    pub async fn prune_change_log(&self, before: DateTime<Utc>) -> usize {
        let mut log = self.inner.change_log.write().await;
        let len_before = log.len();
        log.retain(|record| record.commit_time >= before);
        len_before - log.len()
    }
}

#[async_trait]
impl OperationStore for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        self.inner.active_transactions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryTransaction {
            id: TransactionId::new(),
            state: TransactionState::Active,
            changes: Vec::new(),
            store: self.inner.clone(),
        }))
    }
}

#[async_trait]
impl ChangeLogReader for InMemoryStore {
    async fn last_sequence(&self) -> Result<u64> {
        Ok(*self.inner.last_sequence.borrow())
    }

    async fn read_since(&self, sequence: u64, limit: usize) -> Result<Vec<ChangeLogRecord>> {
        let log = self.inner.change_log.read().await;
        let start = log.partition_point(|record| record.sequence <= sequence);
        Ok(log[start..].iter().take(limit).cloned().collect())
    }

    async fn read_since_time(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ChangeLogRecord>> {
        let log = self.inner.change_log.read().await;
        Ok(log
            .iter()
            .filter(|record| record.commit_time >= since)
            .take(limit)
            .cloned()
            .collect())
    }
}

/// Transaction over an [`InMemoryStore`]. Changes stay private to the
/// transaction until commit.
pub struct MemoryTransaction {
    id: TransactionId,
    state: TransactionState,
    changes: Vec<Change>,
    store: Arc<StoreInner>,
}

impl MemoryTransaction {
    fn ensure_active(&self) -> Result<()> {
        if self.state.is_active() {
            Ok(())
        } else {
            Err(OpError::StoreError(format!(
                "Transaction {} is {}",
                self.id, self.state
            )))
        }
    }

    fn staged(&self, key: &str) -> Option<&Change> {
        self.changes.iter().rev().find(|change| change.key() == key)
    }

    fn finish(&mut self, state: TransactionState) {
        if self.state.is_active() {
            self.state = state;
            self.changes.clear();
            self.store.active_transactions.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    fn id(&self) -> TransactionId {
        self.id
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        self.ensure_active()?;
        if let Some(change) = self.staged(key) {
            return Ok(change.value().cloned());
        }
        Ok(self.store.data.read().await.get(key).cloned())
    }

    async fn put(&mut self, key: &str, value: Value) -> Result<()> {
        self.ensure_active()?;
        self.changes.push(Change::Put {
            key: key.to_string(),
            value,
        });
        Ok(())
    }

    async fn delete(&mut self, key: &str) -> Result<bool> {
        let existed = self.get(key).await?.is_some();
        self.changes.push(Change::Delete {
            key: key.to_string(),
        });
        Ok(existed)
    }

    fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    async fn commit(&mut self, operation: &Operation) -> Result<()> {
        self.ensure_active()?;

        if !self.changes.is_empty() {
            // Data before log so a woken monitor always finds the new state.
            let mut data = self.store.data.write().await;
            let mut log = self.store.change_log.write().await;
            let sequence = *self.store.last_sequence.borrow() + 1;
            let record = ChangeLogRecord::from_operation(sequence, operation)?;
            for change in self.changes.drain(..) {
                match change {
                    Change::Put { key, value } => {
                        data.insert(key, value);
                    }
                    Change::Delete { key } => {
                        data.remove(&key);
                    }
                }
            }

            log.push(record);
            self.store.last_sequence.send_replace(sequence);
            debug!(transaction = %self.id, sequence, "change log record appended");
        }

        self.finish(TransactionState::Committed);
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.finish(TransactionState::RolledBack);
        Ok(())
    }

    fn discard(&mut self) {
        self.finish(TransactionState::RolledBack);
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        self.discard();
    }
}
