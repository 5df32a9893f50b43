// ============================================================================
// Staged Changes
// ============================================================================
//
// Each Change is recorded while the transaction is active, applied on
// COMMIT and discarded on ROLLBACK.
//
// ============================================================================

use serde_json::Value;

/// A single staged mutation of a store key
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// Insert or replace the value stored under `key`
    Put { key: String, value: Value },

    /// Remove `key`
    Delete { key: String },
}

impl Change {
    /// Key affected by this change
    pub fn key(&self) -> &str {
        match self {
            Change::Put { key, .. } => key,
            Change::Delete { key } => key,
        }
    }

    /// Value this change leaves behind for its key (`None` for deletes)
    pub fn value(&self) -> Option<&Value> {
        match self {
            Change::Put { value, .. } => Some(value),
            Change::Delete { .. } => None,
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, Change::Delete { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_change_key() {
        let change = Change::Put {
            key: "accounts/1".to_string(),
            value: json!({"balance": 10}),
        };
        assert_eq!(change.key(), "accounts/1");
        assert_eq!(change.value(), Some(&json!({"balance": 10})));
    }

    #[test]
    fn test_change_classification() {
        let delete = Change::Delete {
            key: "accounts/1".to_string(),
        };
        assert!(delete.is_delete());
        assert!(delete.value().is_none());
    }
}
