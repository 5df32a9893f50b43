use super::{User, UserBackend};
use crate::command::{Command, CommandContext, CommandHandler};
use crate::core::Result;
use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

/// Signs a user in, creating the account on first sign-in.
#[derive(Debug, Clone)]
pub struct SignIn {
    pub user: User,
}

impl Command for SignIn {
    fn payload(&self) -> Value {
        // Identity secrets stay out of the change log.
        json!({
            "id": self.user.id,
            "name": self.user.name,
            "identities": self.user.identities.keys().map(|i| i.to_string()).collect::<Vec<_>>(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct RemoveUser {
    pub user_id: String,
}

impl Command for RemoveUser {
    fn payload(&self) -> Value {
        json!({ "id": self.user_id })
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SignInHandler {
    backend: UserBackend,
}

impl SignInHandler {
    pub fn new(backend: UserBackend) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl CommandHandler<SignIn> for SignInHandler {
    async fn handle(&self, command: &SignIn, ctx: &mut CommandContext) -> Result<()> {
        if ctx.is_invalidating() {
            debug!(user = %command.user.id, "sign-in invalidation pass");
            return Ok(());
        }

        let scope = ctx.require_operation_scope()?;
        let user = self
            .backend
            .find_or_create_on_sign_in(&scope, &command.user)
            .await?;
        ctx.capture("user_id", json!(user.id));
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RemoveUserHandler {
    backend: UserBackend,
}

impl RemoveUserHandler {
    pub fn new(backend: UserBackend) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl CommandHandler<RemoveUser> for RemoveUserHandler {
    async fn handle(&self, command: &RemoveUser, ctx: &mut CommandContext) -> Result<()> {
        if ctx.is_invalidating() {
            debug!(user = %command.user_id, "remove-user invalidation pass");
            return Ok(());
        }

        let scope = ctx.require_operation_scope()?;
        self.backend.remove(&scope, &command.user_id).await?;
        ctx.capture("user_id", json!(command.user_id));
        Ok(())
    }
}
