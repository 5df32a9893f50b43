use super::{User, UserIdentity};
use crate::core::{OpError, Result};
use crate::operations::OperationScope;
use crate::storage::OperationStore;
use serde_json::json;

const USER_PREFIX: &str = "users/";
const IDENTITY_PREFIX: &str = "user_identities/";
const NEXT_USER_ID_KEY: &str = "users/_next_id";

/// Persists users and the identity index through an operation scope.
///
/// Write methods must run inside the scope of the command performing them;
/// the read methods work on any scope, or on a throwaway transaction via
/// [`UserBackend::read`].
#[derive(Debug, Default, Clone, Copy)]
pub struct UserBackend;

impl UserBackend {
    pub fn new() -> Self {
        Self
    }

    // Write methods

    /// Finds the user by id, then by any of its identities, and creates it
    /// when neither matches. The stored user takes the model's name, claims
    /// and identities.
    ///
    /// An explicit id that doesn't exist is an error.
    pub async fn find_or_create_on_sign_in(
        &self,
        scope: &OperationScope,
        user: &User,
    ) -> Result<User> {
        let mut stored = if user.is_persisted() {
            let found = self.find(scope, &user.id).await?;
            Some(found.ok_or_else(|| OpError::NotFound(format!("user {}", user.id)))?)
        } else {
            None
        };

        if stored.is_none() {
            for identity in user.identities.keys() {
                stored = self.find_by_identity(scope, identity).await?;
                if stored.is_some() {
                    break;
                }
            }
        }

        let mut stored = match stored {
            Some(stored) => stored,
            None => User::default().with_id(self.next_id(scope).await?),
        };
        stored.merge_from(user);
        self.save(scope, &stored).await?;
        Ok(stored)
    }

    pub async fn remove(&self, scope: &OperationScope, user_id: &str) -> Result<User> {
        let user = self
            .find(scope, user_id)
            .await?
            .ok_or_else(|| OpError::NotFound(format!("user {}", user_id)))?;

        for identity in user.identities.keys() {
            scope.delete(&identity_key(identity)).await?;
        }
        scope.delete(&user_key(user_id)).await?;
        Ok(user)
    }

    // Read methods

    pub async fn find(&self, scope: &OperationScope, user_id: &str) -> Result<Option<User>> {
        match scope.get(&user_key(user_id)).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    pub async fn find_by_identity(
        &self,
        scope: &OperationScope,
        identity: &UserIdentity,
    ) -> Result<Option<User>> {
        if !identity.is_authenticated() {
            return Ok(None);
        }
        let Some(user_id) = scope.get(&identity_key(identity)).await? else {
            return Ok(None);
        };
        let user_id = user_id.as_str().ok_or_else(|| {
            OpError::StoreError(format!("Malformed identity index entry for '{}'", identity))
        })?;
        self.find(scope, user_id).await
    }

    /// Reads committed state through a transaction that is discarded after.
    pub async fn read(&self, store: &dyn OperationStore, user_id: &str) -> Result<Option<User>> {
        let scope = OperationScope::new(store.begin().await?);
        let user = self.find(&scope, user_id).await;
        scope.rollback().await?;
        user
    }

    pub async fn read_by_identity(
        &self,
        store: &dyn OperationStore,
        identity: &UserIdentity,
    ) -> Result<Option<User>> {
        let scope = OperationScope::new(store.begin().await?);
        let user = self.find_by_identity(&scope, identity).await;
        scope.rollback().await?;
        user
    }

    async fn save(&self, scope: &OperationScope, user: &User) -> Result<()> {
        scope
            .put(&user_key(&user.id), serde_json::to_value(user)?)
            .await?;
        for identity in user.identities.keys() {
            scope.put(&identity_key(identity), json!(user.id)).await?;
        }
        Ok(())
    }

    async fn next_id(&self, scope: &OperationScope) -> Result<String> {
        let next = match scope.get(NEXT_USER_ID_KEY).await? {
            Some(value) => value.as_u64().unwrap_or(0) + 1,
            None => 1,
        };
        scope.put(NEXT_USER_ID_KEY, json!(next)).await?;
        Ok(next.to_string())
    }
}

fn user_key(user_id: &str) -> String {
    format!("{}{}", USER_PREFIX, user_id)
}

fn identity_key(identity: &UserIdentity) -> String {
    format!("{}{}", IDENTITY_PREFIX, identity)
}
