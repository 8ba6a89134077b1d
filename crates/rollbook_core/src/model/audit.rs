//! Field-level audit entries for grade changes.
//!
//! # Invariants
//! - Entries are append-only: never updated, never deleted by normal
//!   operation, and retained after their grade record is withdrawn.

use crate::model::grade::GradeField;
use crate::model::{AuditEntryId, GradeRecordId};
use serde::{Deserialize, Serialize};

/// One historical field change on a grade record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: AuditEntryId,
    /// Logical reference to the grade record; outlives it by design.
    pub grade_record_id: GradeRecordId,
    pub field: GradeField,
    pub old_value: f64,
    pub new_value: f64,
    /// Epoch milliseconds assigned by the audit trail at append time.
    pub changed_at_ms: i64,
    /// Acting identity supplied by the caller; opaque to the core.
    pub actor: String,
}

/// Append request for one field change; id and timestamp are assigned by
/// the audit trail.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditEntry {
    pub grade_record_id: GradeRecordId,
    pub field: GradeField,
    pub old_value: f64,
    pub new_value: f64,
    pub actor: String,
}
