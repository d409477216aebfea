pub mod audit;
pub mod engine;
pub mod error;
pub mod lookup;
pub mod mutator;
pub mod types;

pub use audit::{AuditOperation, AuditOutcome, AuditRecord, AuditSink, InMemoryAuditSink};
pub use engine::RolePolicyEngine;
pub use error::{Result, RolePolicyError};
pub use lookup::{InMemoryDirectory, RoleLookup, UserLookup};
pub use mutator::{
    InMemoryRoleMembership, MutationError, MutationErrorKind, MutationReason,
    RoleMembershipMutator,
};
pub use types::{Role, User};
