//! Resolved identity and role records.
//!
//! Both types are transient read references resolved per request from their
//! owning stores. The policy engine never creates or mutates them.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user resolved from the identity store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Durable user identifier.
    pub id: Uuid,
    /// Login name the caller addressed the user by.
    pub username: String,
}

/// A role resolved from the role store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Durable role identifier.
    pub id: Uuid,
    /// Role name.
    pub name: String,
}
