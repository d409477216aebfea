//! Role-membership mutation contract and an in-memory backend.
//!
//! The mutator owns assignment state and its concurrency control. The policy
//! engine never reads membership directly; it instructs the mutator and
//! interprets the structured failure it reports.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::types::User;

/// Failure classes a mutator can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationErrorKind {
    /// Required assignment state does not hold.
    Precondition,
    /// Backend storage failure.
    Storage,
}

/// Enumerated failure reason, stable across message wording changes.
///
/// The engine translates on `(kind, reason)` structurally, never on message
/// text, so rewording a message cannot silently break translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationReason {
    /// A target role is already held by the user.
    RoleAlreadyAssigned,
    /// The target role is not currently held by the user.
    RoleNotAssigned,
    /// Any reason the engine does not specifically recognize. The string is
    /// the backend's own stable code.
    Other(String),
}

impl MutationReason {
    /// Stable lowercase code, used verbatim in audit records.
    #[must_use]
    pub fn code(&self) -> String {
        match self {
            MutationReason::RoleAlreadyAssigned => "role_already_assigned".to_string(),
            MutationReason::RoleNotAssigned => "role_not_assigned".to_string(),
            MutationReason::Other(code) => code.to_lowercase(),
        }
    }
}

impl fmt::Display for MutationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationReason::RoleAlreadyAssigned => write!(f, "role already assigned"),
            MutationReason::RoleNotAssigned => write!(f, "role not assigned"),
            MutationReason::Other(code) => write!(f, "{code}"),
        }
    }
}

/// Structured failure reported by a role-membership mutator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct MutationError {
    /// Failure class, distinguishing precondition conflicts from the rest.
    pub kind: MutationErrorKind,
    /// Enumerated reason within the class.
    pub reason: MutationReason,
}

impl MutationError {
    /// A strict assignment hit a role the user already holds.
    #[must_use]
    pub fn role_already_assigned() -> Self {
        Self {
            kind: MutationErrorKind::Precondition,
            reason: MutationReason::RoleAlreadyAssigned,
        }
    }

    /// An unassignment targeted a role the user does not hold.
    #[must_use]
    pub fn role_not_assigned() -> Self {
        Self {
            kind: MutationErrorKind::Precondition,
            reason: MutationReason::RoleNotAssigned,
        }
    }

    /// A backend storage failure with the backend's own reason code.
    pub fn storage(code: impl Into<String>) -> Self {
        Self {
            kind: MutationErrorKind::Storage,
            reason: MutationReason::Other(code.into()),
        }
    }
}

/// Mutation primitives over a user's role membership.
#[async_trait]
pub trait RoleMembershipMutator: Send + Sync {
    /// Assign every role in `role_ids` to the user.
    ///
    /// Strict: fails with [`MutationError::role_already_assigned`] if any
    /// target role is already held, without assigning the others.
    async fn assign_strict(
        &self,
        user: &User,
        role_ids: &[Uuid],
    ) -> Result<(), MutationError>;

    /// Remove a currently held role.
    ///
    /// Fails with [`MutationError::role_not_assigned`] if the role is not held.
    async fn unassign(&self, user: &User, role_id: Uuid) -> Result<(), MutationError>;

    /// Set the user's membership to exactly `role_ids`, independent of prior
    /// state. An empty slice leaves the user with zero roles.
    async fn replace(
        &self,
        user: &User,
        role_ids: &[Uuid],
    ) -> Result<(), MutationError>;
}

/// In-memory membership store, used in tests and as a standalone backend.
pub struct InMemoryRoleMembership {
    memberships: RwLock<HashMap<Uuid, Vec<Uuid>>>,
}

impl Default for InMemoryRoleMembership {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRoleMembership {
    #[must_use]
    pub fn new() -> Self {
        Self {
            memberships: RwLock::new(HashMap::new()),
        }
    }

    /// Roles currently held by a user.
    pub async fn assigned_roles(&self, user_id: Uuid) -> Vec<Uuid> {
        let memberships = self.memberships.read().await;
        memberships.get(&user_id).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl RoleMembershipMutator for InMemoryRoleMembership {
    async fn assign_strict(
        &self,
        user: &User,
        role_ids: &[Uuid],
    ) -> Result<(), MutationError> {
        let mut memberships = self.memberships.write().await;
        let held = memberships.entry(user.id).or_default();
        if role_ids.iter().any(|id| held.contains(id)) {
            return Err(MutationError::role_already_assigned());
        }
        held.extend_from_slice(role_ids);
        Ok(())
    }

    async fn unassign(
        &self,
        user: &User,
        role_id: Uuid,
    ) -> Result<(), MutationError> {
        let mut memberships = self.memberships.write().await;
        let held = memberships.entry(user.id).or_default();
        match held.iter().position(|id| *id == role_id) {
            Some(index) => {
                held.remove(index);
                Ok(())
            }
            None => Err(MutationError::role_not_assigned()),
        }
    }

    async fn replace(
        &self,
        user: &User,
        role_ids: &[Uuid],
    ) -> Result<(), MutationError> {
        let mut memberships = self.memberships.write().await;
        memberships.insert(user.id, role_ids.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
        }
    }

    #[tokio::test]
    async fn test_assign_strict_adds_roles() {
        let store = InMemoryRoleMembership::new();
        let user = user();
        let roles = vec![Uuid::new_v4(), Uuid::new_v4()];

        store.assign_strict(&user, &roles).await.unwrap();

        assert_eq!(store.assigned_roles(user.id).await, roles);
    }

    #[tokio::test]
    async fn test_assign_strict_rejects_held_role() {
        let store = InMemoryRoleMembership::new();
        let user = user();
        let held = Uuid::new_v4();
        let fresh = Uuid::new_v4();
        store.assign_strict(&user, &[held]).await.unwrap();

        let err = store.assign_strict(&user, &[fresh, held]).await.unwrap_err();

        assert_eq!(err, MutationError::role_already_assigned());
        // Nothing from the rejected batch was applied.
        assert_eq!(store.assigned_roles(user.id).await, vec![held]);
    }

    #[tokio::test]
    async fn test_unassign_removes_held_role() {
        let store = InMemoryRoleMembership::new();
        let user = user();
        let role = Uuid::new_v4();
        store.assign_strict(&user, &[role]).await.unwrap();

        store.unassign(&user, role).await.unwrap();

        assert!(store.assigned_roles(user.id).await.is_empty());
    }

    #[tokio::test]
    async fn test_unassign_rejects_unheld_role() {
        let store = InMemoryRoleMembership::new();
        let user = user();

        let err = store.unassign(&user, Uuid::new_v4()).await.unwrap_err();

        assert_eq!(err, MutationError::role_not_assigned());
        assert_eq!(err.kind, MutationErrorKind::Precondition);
    }

    #[tokio::test]
    async fn test_replace_overwrites_prior_state() {
        let store = InMemoryRoleMembership::new();
        let user = user();
        store
            .assign_strict(&user, &[Uuid::new_v4(), Uuid::new_v4()])
            .await
            .unwrap();
        let replacement = vec![Uuid::new_v4()];

        store.replace(&user, &replacement).await.unwrap();

        assert_eq!(store.assigned_roles(user.id).await, replacement);
    }

    #[tokio::test]
    async fn test_replace_with_empty_set_clears_roles() {
        let store = InMemoryRoleMembership::new();
        let user = user();
        store.assign_strict(&user, &[Uuid::new_v4()]).await.unwrap();

        store.replace(&user, &[]).await.unwrap();

        assert!(store.assigned_roles(user.id).await.is_empty());
    }

    #[test]
    fn test_reason_codes() {
        assert_eq!(
            MutationReason::RoleAlreadyAssigned.code(),
            "role_already_assigned"
        );
        assert_eq!(MutationReason::RoleNotAssigned.code(), "role_not_assigned");
        assert_eq!(
            MutationReason::Other("Backend_Timeout".to_string()).code(),
            "backend_timeout"
        );
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            MutationError::role_already_assigned().to_string(),
            "role already assigned"
        );
        assert_eq!(
            MutationError::role_not_assigned().to_string(),
            "role not assigned"
        );
        assert_eq!(
            MutationError::storage("connection_refused").to_string(),
            "connection_refused"
        );
    }
}
