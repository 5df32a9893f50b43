//! Users and their external identities, persisted through operation scopes.

pub mod backend;
pub mod commands;
pub mod identity;
pub mod user;

pub use backend::UserBackend;
pub use commands::{RemoveUser, RemoveUserHandler, SignIn, SignInHandler};
pub use identity::UserIdentity;
pub use user::User;
