//! User and role resolution contracts, with an in-memory directory.
//!
//! Resolution always hits the source of truth. The engine performs no caching
//! of resolved users or roles across invocations, so precondition decisions
//! are never made against stale state.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{Result, RolePolicyError};
use crate::types::{Role, User};

/// Resolves a username to a durable user record.
#[async_trait]
pub trait UserLookup: Send + Sync {
    /// Fails with [`RolePolicyError::UserNotFound`] when no such user exists.
    async fn resolve_user(&self, username: &str) -> Result<User>;
}

/// Resolves a role name to a role identifier.
#[async_trait]
pub trait RoleLookup: Send + Sync {
    /// Returns `None` rather than failing for an unknown name, so callers can
    /// batch-check existence without one miss aborting the rest.
    async fn resolve_role_id(&self, role_name: &str) -> Option<Uuid>;
}

/// In-memory user/role directory, used in tests and as a standalone backend.
pub struct InMemoryDirectory {
    users: RwLock<HashMap<String, User>>,
    roles: RwLock<HashMap<String, Role>>,
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            roles: RwLock::new(HashMap::new()),
        }
    }

    /// Register a user and return the resolved record.
    pub async fn add_user(&self, username: &str) -> User {
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
        };
        let mut users = self.users.write().await;
        users.insert(username.to_string(), user.clone());
        user
    }

    /// Register a role and return the resolved record.
    pub async fn add_role(&self, name: &str) -> Role {
        let role = Role {
            id: Uuid::new_v4(),
            name: name.to_string(),
        };
        let mut roles = self.roles.write().await;
        roles.insert(name.to_string(), role.clone());
        role
    }
}

#[async_trait]
impl UserLookup for InMemoryDirectory {
    async fn resolve_user(&self, username: &str) -> Result<User> {
        let users = self.users.read().await;
        users
            .get(username)
            .cloned()
            .ok_or_else(|| RolePolicyError::UserNotFound(username.to_string()))
    }
}

#[async_trait]
impl RoleLookup for InMemoryDirectory {
    async fn resolve_role_id(&self, role_name: &str) -> Option<Uuid> {
        let roles = self.roles.read().await;
        roles.get(role_name).map(|role| role.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_known_user() {
        let directory = InMemoryDirectory::new();
        let alice = directory.add_user("alice").await;

        let resolved = directory.resolve_user("alice").await.unwrap();

        assert_eq!(resolved, alice);
    }

    #[tokio::test]
    async fn test_resolve_unknown_user_fails() {
        let directory = InMemoryDirectory::new();

        let err = directory.resolve_user("ghost").await.unwrap_err();

        assert!(matches!(err, RolePolicyError::UserNotFound(name) if name == "ghost"));
    }

    #[tokio::test]
    async fn test_resolve_unknown_role_is_absent_not_error() {
        let directory = InMemoryDirectory::new();
        directory.add_role("reader").await;

        assert!(directory.resolve_role_id("reader").await.is_some());
        assert!(directory.resolve_role_id("ghost-role").await.is_none());
    }
}
