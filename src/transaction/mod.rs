// ============================================================================
// Store Transaction Primitives
// ============================================================================
//
// Identifiers, lifecycle states and staged changes shared by every store
// transaction that backs an operation scope.
//
// - State Pattern: Active -> Committed | RolledBack
// - Command Pattern: staged changes are applied on commit, dropped on rollback
//
// ============================================================================

pub mod change;
pub mod state;

pub use change::Change;
pub use state::{TransactionId, TransactionState};
