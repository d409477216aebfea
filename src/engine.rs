//! The role assignment policy engine.
//!
//! Single place where role-change business rules are enforced, regardless of
//! caller. Each operation:
//! 1. Resolves the user and target role(s) from the source of truth
//! 2. Validates preconditions against the resolved state
//! 3. Delegates the mutation to the role-membership mutator
//! 4. Translates the two recognized precondition conflicts, passes every
//!    other mutator failure through unchanged
//! 5. Emits exactly one audit record, success or failure

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::audit::{AuditOperation, AuditRecord, AuditSink};
use crate::error::{Result, RolePolicyError};
use crate::lookup::{RoleLookup, UserLookup};
use crate::mutator::{MutationErrorKind, MutationReason, RoleMembershipMutator};
use crate::types::User;

const ERROR_ROLES_NOT_EXIST: &str = "roles do not exist";
const ERROR_ROLE_ALREADY_ASSIGNED: &str = "role already assigned";
const ERROR_ROLE_NOT_ASSIGNED: &str = "role not assigned";

const REASON_NONEXISTENT_ROLE: &str = "nonexistent_role";
const REASON_USER_NOT_FOUND: &str = "user_not_found";

/// A failed attempt paired with the audit reason code it is recorded under.
///
/// Pairing the reason with the error at the failure site keeps the audit code
/// independent of error message wording.
struct Rejection {
    reason: String,
    error: RolePolicyError,
}

impl Rejection {
    fn new(reason: impl Into<String>, error: RolePolicyError) -> Self {
        Self {
            reason: reason.into(),
            error,
        }
    }
}

/// Enforces role-change preconditions and reports every attempt for audit.
///
/// Holds no state of its own; collaborators are shared trait objects.
/// Concurrent invocations are independent, and racing mutations are resolved
/// by the mutator's own concurrency control.
pub struct RolePolicyEngine {
    users: Arc<dyn UserLookup>,
    roles: Arc<dyn RoleLookup>,
    mutator: Arc<dyn RoleMembershipMutator>,
    audit: Arc<dyn AuditSink>,
}

impl RolePolicyEngine {
    pub fn new(
        users: Arc<dyn UserLookup>,
        roles: Arc<dyn RoleLookup>,
        mutator: Arc<dyn RoleMembershipMutator>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            users,
            roles,
            mutator,
            audit,
        }
    }

    /// Assign `role_names` to `username`.
    ///
    /// Fails with [`RolePolicyError::PreconditionFailed`] if any role name
    /// does not exist or any target role is already held. An empty sequence
    /// is a no-op success.
    pub async fn assign_roles(
        &self,
        username: &str,
        role_names: &[String],
        client_id: &str,
    ) -> Result<()> {
        let operation = AuditOperation::RoleAssignment;
        let user = self.resolve_user(operation, client_id, username).await?;
        let outcome = self.try_assign(&user, role_names).await;
        self.finish(operation, client_id, user.id, outcome).await
    }

    /// Remove a single role from `username`.
    ///
    /// Fails with [`RolePolicyError::PreconditionFailed`] if the role name
    /// does not exist or the role is not currently held.
    pub async fn unassign_role(
        &self,
        username: &str,
        role_name: &str,
        client_id: &str,
    ) -> Result<()> {
        let operation = AuditOperation::RoleUnassignment;
        let user = self.resolve_user(operation, client_id, username).await?;
        let outcome = self.try_unassign(&user, role_name).await;
        self.finish(operation, client_id, user.id, outcome).await
    }

    /// Set the user's role set to exactly `role_names`, independent of prior
    /// state. An empty sequence leaves the user with zero roles.
    ///
    /// Unknown role names are a [`RolePolicyError::ClientError`]: for a set
    /// replacement they are invalid input, not a state conflict.
    pub async fn replace_roles(
        &self,
        username: &str,
        role_names: &[String],
        client_id: &str,
    ) -> Result<()> {
        let operation = AuditOperation::RoleReplacement;
        let user = self.resolve_user(operation, client_id, username).await?;
        let outcome = self.try_replace(&user, role_names).await;
        self.finish(operation, client_id, user.id, outcome).await
    }

    async fn try_assign(
        &self,
        user: &User,
        role_names: &[String],
    ) -> std::result::Result<(), Rejection> {
        let Some(role_ids) = self.resolve_role_ids(role_names).await else {
            return Err(Rejection::new(
                REASON_NONEXISTENT_ROLE,
                RolePolicyError::PreconditionFailed(ERROR_ROLES_NOT_EXIST.to_string()),
            ));
        };

        self.mutator
            .assign_strict(user, &role_ids)
            .await
            .map_err(|err| {
                let reason = err.reason.code();
                if err.kind == MutationErrorKind::Precondition
                    && err.reason == MutationReason::RoleAlreadyAssigned
                {
                    Rejection::new(
                        reason,
                        RolePolicyError::PreconditionFailed(
                            ERROR_ROLE_ALREADY_ASSIGNED.to_string(),
                        ),
                    )
                } else {
                    Rejection::new(reason, err.into())
                }
            })
    }

    async fn try_unassign(
        &self,
        user: &User,
        role_name: &str,
    ) -> std::result::Result<(), Rejection> {
        let Some(role_id) = self.roles.resolve_role_id(role_name).await else {
            return Err(Rejection::new(
                REASON_NONEXISTENT_ROLE,
                RolePolicyError::PreconditionFailed(ERROR_ROLES_NOT_EXIST.to_string()),
            ));
        };

        self.mutator.unassign(user, role_id).await.map_err(|err| {
            let reason = err.reason.code();
            if err.kind == MutationErrorKind::Precondition
                && err.reason == MutationReason::RoleNotAssigned
            {
                Rejection::new(
                    reason,
                    RolePolicyError::PreconditionFailed(ERROR_ROLE_NOT_ASSIGNED.to_string()),
                )
            } else {
                Rejection::new(reason, err.into())
            }
        })
    }

    async fn try_replace(
        &self,
        user: &User,
        role_names: &[String],
    ) -> std::result::Result<(), Rejection> {
        let Some(role_ids) = self.resolve_role_ids(role_names).await else {
            return Err(Rejection::new(
                REASON_NONEXISTENT_ROLE,
                RolePolicyError::ClientError(ERROR_ROLES_NOT_EXIST.to_string()),
            ));
        };

        // No translation layer for replace; every mutator failure passes
        // through with its original kind and message.
        self.mutator
            .replace(user, &role_ids)
            .await
            .map_err(|err| Rejection::new(err.reason.code(), err.into()))
    }

    /// Resolve every role name, or `None` if any name is unknown.
    ///
    /// A single miss fails the whole batch before any mutation is attempted.
    async fn resolve_role_ids(&self, role_names: &[String]) -> Option<Vec<Uuid>> {
        let mut role_ids = Vec::with_capacity(role_names.len());
        for name in role_names {
            role_ids.push(self.roles.resolve_role_id(name).await?);
        }
        Some(role_ids)
    }

    /// Resolve the user, recording the failure if the username is unknown.
    ///
    /// The audit record carries no user id on this path since none resolved.
    async fn resolve_user(
        &self,
        operation: AuditOperation,
        client_id: &str,
        username: &str,
    ) -> Result<User> {
        match self.users.resolve_user(username).await {
            Ok(user) => Ok(user),
            Err(err) => {
                warn!(operation = %operation, client_id, username, "user resolution failed");
                self.audit
                    .record(AuditRecord::failure(
                        operation,
                        client_id,
                        None,
                        REASON_USER_NOT_FOUND,
                    ))
                    .await;
                Err(err)
            }
        }
    }

    /// Record the terminal outcome and surface it to the caller.
    ///
    /// Every operation funnels through here once the user has resolved, so
    /// each invocation emits exactly one audit record.
    async fn finish(
        &self,
        operation: AuditOperation,
        client_id: &str,
        user_id: Uuid,
        outcome: std::result::Result<(), Rejection>,
    ) -> Result<()> {
        match outcome {
            Ok(()) => {
                info!(operation = %operation, client_id, user_id = %user_id, "role change applied");
                self.audit
                    .record(AuditRecord::success(operation, client_id, user_id))
                    .await;
                Ok(())
            }
            Err(rejection) => {
                warn!(
                    operation = %operation,
                    client_id,
                    user_id = %user_id,
                    reason = %rejection.reason,
                    "role change rejected"
                );
                self.audit
                    .record(AuditRecord::failure(
                        operation,
                        client_id,
                        Some(user_id),
                        rejection.reason,
                    ))
                    .await;
                Err(rejection.error)
            }
        }
    }
}
