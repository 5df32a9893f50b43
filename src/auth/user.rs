use super::UserIdentity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// User account
///
/// An empty `id` means the user has not been persisted yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub claims: BTreeMap<String, String>,
    /// Identity -> secret issued by the identity provider
    pub identities: BTreeMap<UserIdentity, String>,
}

impl User {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_claim(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.claims.insert(key.into(), value.into());
        self
    }

    pub fn with_identity(
        mut self,
        identity: impl Into<UserIdentity>,
        secret: impl Into<String>,
    ) -> Self {
        self.identities.insert(identity.into(), secret.into());
        self
    }

    pub fn is_persisted(&self) -> bool {
        !self.id.is_empty()
    }

    /// Takes the name (when set), claims and identities of `model`.
    pub(crate) fn merge_from(&mut self, model: &User) {
        if !model.name.is_empty() {
            self.name = model.name.clone();
        }
        self.claims
            .extend(model.claims.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.identities
            .extend(model.identities.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
}
