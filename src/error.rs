//! Error types for the role policy engine.

use thiserror::Error;

use crate::mutator::MutationError;

/// Errors surfaced by the role policy engine.
#[derive(Debug, Error)]
pub enum RolePolicyError {
    /// The username did not resolve to a user record.
    #[error("user not found: {0}")]
    UserNotFound(String),

    /// A required state condition does not hold (role does not exist, role
    /// already assigned, role not assigned). Caller-correctable by adjusting
    /// the request or retrying after state changes.
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    /// Malformed or invalid request input.
    #[error("invalid request: {0}")]
    ClientError(String),

    /// A mutator failure the engine does not specifically recognize, passed
    /// through with its original kind and message.
    #[error(transparent)]
    Mutation(#[from] MutationError),
}

/// Convenience Result type for the role policy engine.
pub type Result<T> = std::result::Result<T, RolePolicyError>;
