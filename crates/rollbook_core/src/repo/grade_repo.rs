//! Grade record repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Apply validated partial grade updates and append one audit entry per
//!   changed field, in one transaction.
//!
//! # Invariants
//! - A patch with any out-of-range value is rejected before any write.
//! - Fields whose supplied value equals the stored value are not written
//!   and produce no audit entry.
//! - The field write and its audit entry commit together or not at all.
//!
//! # See also
//! - docs/architecture/data-model.md

use crate::model::audit::NewAuditEntry;
use crate::model::grade::{GradeField, GradePatch, GradeRecord, GradeValidationError};
use crate::model::{EnrollmentId, GradeRecordId};
use crate::repo::audit_repo::append_entry;
use crate::repo::{ensure_connection_ready, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, Row, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type GradeResult<T> = Result<T, GradeError>;

/// Error taxonomy of the grade record manager.
#[derive(Debug)]
pub enum GradeError {
    /// The enrollment has no bound grade record. Checked defensively: it
    /// happens when a caller races a withdrawal.
    NoGradeRecord { enrollment_id: EnrollmentId },
    /// A supplied score lies outside `[0, 100]`; the whole call was
    /// rejected and no field changed.
    OutOfRange { field: GradeField, value: f64 },
    /// Persistence-layer failure (includes `Busy` lock timeouts).
    Repo(RepoError),
}

impl Display for GradeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoGradeRecord { enrollment_id } => {
                write!(f, "no grade record bound to enrollment {enrollment_id}")
            }
            Self::OutOfRange { field, value } => {
                write!(f, "grade `{field}` value {value} is outside [0, 100]")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for GradeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<GradeValidationError> for GradeError {
    fn from(value: GradeValidationError) -> Self {
        match value {
            GradeValidationError::OutOfRange { field, value } => Self::OutOfRange { field, value },
        }
    }
}

impl From<RepoError> for GradeError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<rusqlite::Error> for GradeError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(RepoError::from(value))
    }
}

/// Repository interface for grade records.
pub trait GradeRepository {
    /// Applies a partial update and audits every changed field.
    fn set_grades(
        &mut self,
        enrollment_id: EnrollmentId,
        patch: &GradePatch,
        actor: &str,
    ) -> GradeResult<GradeRecord>;
    fn get_by_enrollment(&self, enrollment_id: EnrollmentId) -> RepoResult<Option<GradeRecord>>;
    fn get(&self, id: GradeRecordId) -> RepoResult<Option<GradeRecord>>;
}

/// SQLite-backed grade record repository.
pub struct SqliteGradeRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteGradeRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["grade_records", "audit_entries"])?;
        Ok(Self { conn })
    }
}

impl GradeRepository for SqliteGradeRepository<'_> {
    fn set_grades(
        &mut self,
        enrollment_id: EnrollmentId,
        patch: &GradePatch,
        actor: &str,
    ) -> GradeResult<GradeRecord> {
        patch.validate()?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let stored = match load_by_enrollment(&tx, enrollment_id)? {
            Some(record) => record,
            None => return Err(GradeError::NoGradeRecord { enrollment_id }),
        };

        let mut updated = stored.clone();
        for (field, value) in patch.entries() {
            let old_value = stored.score(field);
            if old_value == value {
                continue;
            }

            tx.execute(
                &format!(
                    "UPDATE grade_records SET {} = ?1 WHERE id = ?2;",
                    grade_column(field)
                ),
                params![value, updated.id.to_string()],
            )?;
            append_entry(
                &tx,
                &NewAuditEntry {
                    grade_record_id: updated.id,
                    field,
                    old_value,
                    new_value: value,
                    actor: actor.to_string(),
                },
            )?;
            updated.set_score(field, value);
        }

        tx.commit()?;
        Ok(updated)
    }

    fn get_by_enrollment(&self, enrollment_id: EnrollmentId) -> RepoResult<Option<GradeRecord>> {
        load_by_enrollment(self.conn, enrollment_id)
    }

    fn get(&self, id: GradeRecordId) -> RepoResult<Option<GradeRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, enrollment_id, midterm1, midterm2, final_exam
             FROM grade_records
             WHERE id = ?1;",
        )?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_grade_row(row)?));
        }
        Ok(None)
    }
}

fn load_by_enrollment(
    conn: &Connection,
    enrollment_id: EnrollmentId,
) -> RepoResult<Option<GradeRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, enrollment_id, midterm1, midterm2, final_exam
         FROM grade_records
         WHERE enrollment_id = ?1;",
    )?;
    let mut rows = stmt.query([enrollment_id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_grade_row(row)?));
    }
    Ok(None)
}

fn grade_column(field: GradeField) -> &'static str {
    match field {
        GradeField::Midterm1 => "midterm1",
        GradeField::Midterm2 => "midterm2",
        GradeField::Final => "final_exam",
    }
}

fn parse_grade_row(row: &Row<'_>) -> RepoResult<GradeRecord> {
    let id_text: String = row.get("id")?;
    let enrollment_text: String = row.get("enrollment_id")?;

    Ok(GradeRecord {
        id: parse_uuid(&id_text, "grade_records.id")?,
        enrollment_id: parse_uuid(&enrollment_text, "grade_records.enrollment_id")?,
        midterm1: row.get("midterm1")?,
        midterm2: row.get("midterm2")?,
        final_exam: row.get("final_exam")?,
    })
}
