use super::Operation;
use crate::core::{OpError, Result};
use crate::storage::StoreTransaction;
use crate::transaction::{TransactionId, TransactionState};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::warn;

/// Lifecycle of an operation scope; shares the store transaction's states.
pub type ScopeState = TransactionState;

struct ScopeInner {
    transaction: Box<dyn StoreTransaction>,
    state: ScopeState,
}

/// Transactional resource bounding one top-level invocation's mutations.
///
/// Owned by the operation scope handler; nested invocations borrow it through
/// their outer context. Once committed or rolled back it rejects every
/// further read and write.
pub struct OperationScope {
    transaction_id: TransactionId,
    used: AtomicBool,
    inner: Mutex<ScopeInner>,
}

impl OperationScope {
    pub fn new(transaction: Box<dyn StoreTransaction>) -> Self {
        Self {
            transaction_id: transaction.id(),
            used: AtomicBool::new(false),
            inner: Mutex::new(ScopeInner {
                transaction,
                state: ScopeState::Active,
            }),
        }
    }

    pub fn transaction_id(&self) -> TransactionId {
        self.transaction_id
    }

    /// True once at least one mutation was staged.
    pub fn is_used(&self) -> bool {
        self.used.load(Ordering::SeqCst)
    }

    /// Flags the scope as used for mutations staged outside `put`/`delete`.
    pub fn mark_used(&self) {
        self.used.store(true, Ordering::SeqCst);
    }

    pub async fn state(&self) -> ScopeState {
        self.inner.lock().await.state
    }

    pub async fn get(&self, key: &str) -> Result<Option<Value>> {
        let inner = self.inner.lock().await;
        ensure_active(inner.state)?;
        inner.transaction.get(key).await
    }

    pub async fn put(&self, key: &str, value: Value) -> Result<()> {
        let mut inner = self.inner.lock().await;
        ensure_active(inner.state)?;
        inner.transaction.put(key, value).await?;
        self.mark_used();
        Ok(())
    }

    /// Returns whether `key` existed.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        ensure_active(inner.state)?;
        let existed = inner.transaction.delete(key).await?;
        self.mark_used();
        Ok(existed)
    }

    pub(crate) async fn commit(&self, operation: &Operation) -> Result<()> {
        let mut inner = self.inner.lock().await;
        ensure_active(inner.state)?;
        inner.transaction.commit(operation).await?;
        inner.state = ScopeState::Committed;
        Ok(())
    }

    /// No-op once the scope reached a terminal state. A failed rollback
    /// still releases the transaction through `discard`.
    pub(crate) async fn rollback(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.state.is_terminal() {
            return Ok(());
        }
        let result = inner.transaction.rollback().await;
        if result.is_err() {
            inner.transaction.discard();
        }
        inner.state = ScopeState::RolledBack;
        result
    }

    /// Releases the transaction without awaiting; staged changes of a scope
    /// that is still active are discarded.
    pub(crate) fn dispose(&self) {
        match self.inner.try_lock() {
            Ok(mut inner) => {
                if inner.state.is_active() {
                    inner.transaction.discard();
                    inner.state = ScopeState::RolledBack;
                }
            }
            Err(_) => warn!(
                transaction = %self.transaction_id,
                "operation scope still borrowed on dispose"
            ),
        }
    }
}

impl std::fmt::Debug for OperationScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationScope")
            .field("transaction_id", &self.transaction_id)
            .field("used", &self.is_used())
            .finish()
    }
}

fn ensure_active(state: ScopeState) -> Result<()> {
    if state.is_active() {
        Ok(())
    } else {
        Err(OpError::ScopeError(format!("Operation scope is {}", state)))
    }
}

/// Disposes the scope on every exit path of the handler that created it.
pub(crate) struct ScopeLease(Arc<OperationScope>);

impl ScopeLease {
    pub(crate) fn new(scope: Arc<OperationScope>) -> Self {
        Self(scope)
    }
}

impl Drop for ScopeLease {
    fn drop(&mut self) {
        self.0.dispose();
    }
}
