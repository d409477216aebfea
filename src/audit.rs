//! Audit records for role-change attempts.
//!
//! Every policy-engine invocation produces exactly one record, reflecting its
//! terminal outcome. Records can be sent to different backends (database,
//! message bus, in-memory for testing) through the [`AuditSink`] trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

/// Operation kind recorded on an audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOperation {
    RoleAssignment,
    RoleUnassignment,
    RoleReplacement,
}

impl std::fmt::Display for AuditOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditOperation::RoleAssignment => write!(f, "role_assignment"),
            AuditOperation::RoleUnassignment => write!(f, "role_unassignment"),
            AuditOperation::RoleReplacement => write!(f, "role_replacement"),
        }
    }
}

/// Terminal outcome of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Success,
    Failure,
}

/// One record per policy-engine invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Which operation was attempted.
    pub operation: AuditOperation,
    /// Opaque identifier of the calling client.
    pub client_id: String,
    /// Resolved user, absent when the username itself failed to resolve.
    pub user_id: Option<Uuid>,
    /// Terminal outcome.
    pub outcome: AuditOutcome,
    /// Lowercase reason code, present on failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// When the outcome was recorded.
    pub timestamp: DateTime<Utc>,
}

impl AuditRecord {
    /// Record for a successful attempt.
    #[must_use]
    pub fn success(operation: AuditOperation, client_id: &str, user_id: Uuid) -> Self {
        Self {
            operation,
            client_id: client_id.to_string(),
            user_id: Some(user_id),
            outcome: AuditOutcome::Success,
            reason: None,
            timestamp: Utc::now(),
        }
    }

    /// Record for a failed attempt with its lowercase reason code.
    pub fn failure(
        operation: AuditOperation,
        client_id: &str,
        user_id: Option<Uuid>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            client_id: client_id.to_string(),
            user_id,
            outcome: AuditOutcome::Failure,
            reason: Some(reason.into()),
            timestamp: Utc::now(),
        }
    }
}

/// Sink that durably records operation attempts.
///
/// Fire-and-forget from the engine's perspective; called exactly once per
/// invocation, after the terminal outcome is known.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, record: AuditRecord);
}

/// In-memory audit sink, used in tests and as a standalone backend.
pub struct InMemoryAuditSink {
    records: RwLock<Vec<AuditRecord>>,
}

impl Default for InMemoryAuditSink {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryAuditSink {
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }

    /// All records captured so far, in emission order.
    pub async fn records(&self) -> Vec<AuditRecord> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditSink {
    async fn record(&self, record: AuditRecord) {
        match record.outcome {
            AuditOutcome::Success => info!(
                operation = %record.operation,
                client_id = %record.client_id,
                user_id = ?record.user_id,
                "Role change recorded"
            ),
            AuditOutcome::Failure => warn!(
                operation = %record.operation,
                client_id = %record.client_id,
                user_id = ?record.user_id,
                reason = ?record.reason,
                "Role change attempt failed"
            ),
        }

        let mut records = self.records.write().await;
        records.push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_display() {
        assert_eq!(AuditOperation::RoleAssignment.to_string(), "role_assignment");
        assert_eq!(
            AuditOperation::RoleUnassignment.to_string(),
            "role_unassignment"
        );
        assert_eq!(
            AuditOperation::RoleReplacement.to_string(),
            "role_replacement"
        );
    }

    #[test]
    fn test_operation_serialization() {
        let json = serde_json::to_string(&AuditOperation::RoleReplacement).unwrap();
        assert_eq!(json, "\"role_replacement\"");

        let deserialized: AuditOperation = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, AuditOperation::RoleReplacement);
    }

    #[test]
    fn test_success_record_has_no_reason() {
        let record = AuditRecord::success(AuditOperation::RoleAssignment, "cid", Uuid::new_v4());

        assert_eq!(record.outcome, AuditOutcome::Success);
        assert!(record.reason.is_none());

        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("reason").is_none());
    }

    #[tokio::test]
    async fn test_sink_captures_records_in_order() {
        let sink = InMemoryAuditSink::new();
        let user_id = Uuid::new_v4();

        sink.record(AuditRecord::success(
            AuditOperation::RoleAssignment,
            "cid1",
            user_id,
        ))
        .await;
        sink.record(AuditRecord::failure(
            AuditOperation::RoleUnassignment,
            "cid2",
            Some(user_id),
            "role_not_assigned",
        ))
        .await;

        let records = sink.records().await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].client_id, "cid1");
        assert_eq!(records[1].reason.as_deref(), Some("role_not_assigned"));
    }
}
