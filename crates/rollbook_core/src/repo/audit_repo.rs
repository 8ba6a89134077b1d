//! Append-only audit trail for grade changes.
//!
//! # Responsibility
//! - Append field-level grade-change entries, stamped at append time.
//! - List entries per grade record in timestamp order.
//!
//! # Invariants
//! - Entries are never mutated or deleted by normal operation; history
//!   deletion is an administrative act outside this contract.
//! - Listing order is total: ties within one millisecond are broken by the
//!   insertion sequence.
//!
//! # See also
//! - docs/architecture/data-model.md

use crate::model::audit::{AuditEntry, NewAuditEntry};
use crate::model::grade::GradeField;
use crate::model::GradeRecordId;
use crate::repo::{ensure_connection_ready, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Interface of the audit trail store.
///
/// `append` fails only on storage unavailability, which is reported, never
/// retried silently.
pub trait AuditTrail {
    fn append(&mut self, entry: &NewAuditEntry) -> RepoResult<AuditEntry>;
    /// Entries for one grade record, oldest first. Unknown ids yield an
    /// empty sequence: history of withdrawn records must stay readable, so
    /// there is no liveness check.
    fn list_by_grade_record(&self, grade_record_id: GradeRecordId) -> RepoResult<Vec<AuditEntry>>;
}

/// SQLite-backed audit trail.
pub struct SqliteAuditTrail<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAuditTrail<'conn> {
    /// Constructs an audit trail from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["audit_entries"])?;
        Ok(Self { conn })
    }
}

impl AuditTrail for SqliteAuditTrail<'_> {
    fn append(&mut self, entry: &NewAuditEntry) -> RepoResult<AuditEntry> {
        append_entry(self.conn, entry)
    }

    fn list_by_grade_record(&self, grade_record_id: GradeRecordId) -> RepoResult<Vec<AuditEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, grade_record_id, field, old_value, new_value, changed_at, actor
             FROM audit_entries
             WHERE grade_record_id = ?1
             ORDER BY changed_at ASC, seq ASC;",
        )?;

        let mut rows = stmt.query([grade_record_id.to_string()])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(parse_audit_row(row)?);
        }
        Ok(entries)
    }
}

/// Appends one entry on the provided connection.
///
/// Takes `&Connection` so the grade repository can compose it into its own
/// transaction and the entry commits together with the field write.
pub(crate) fn append_entry(conn: &Connection, entry: &NewAuditEntry) -> RepoResult<AuditEntry> {
    let id = Uuid::new_v4();
    let changed_at_ms = epoch_ms();

    conn.execute(
        "INSERT INTO audit_entries
            (id, grade_record_id, field, old_value, new_value, changed_at, actor)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
        params![
            id.to_string(),
            entry.grade_record_id.to_string(),
            entry.field.as_str(),
            entry.old_value,
            entry.new_value,
            changed_at_ms,
            entry.actor.as_str(),
        ],
    )?;

    Ok(AuditEntry {
        id,
        grade_record_id: entry.grade_record_id,
        field: entry.field,
        old_value: entry.old_value,
        new_value: entry.new_value,
        changed_at_ms,
        actor: entry.actor.clone(),
    })
}

fn epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}

fn parse_audit_row(row: &Row<'_>) -> RepoResult<AuditEntry> {
    let id_text: String = row.get("id")?;
    let record_text: String = row.get("grade_record_id")?;
    let field_text: String = row.get("field")?;
    let field = GradeField::parse(&field_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid field value `{field_text}` in audit_entries.field"
        ))
    })?;

    Ok(AuditEntry {
        id: parse_uuid(&id_text, "audit_entries.id")?,
        grade_record_id: parse_uuid(&record_text, "audit_entries.grade_record_id")?,
        field,
        old_value: row.get("old_value")?,
        new_value: row.get("new_value")?,
        changed_at_ms: row.get("changed_at")?,
        actor: row.get("actor")?,
    })
}
