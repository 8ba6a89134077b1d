//! Enrollment ledger contract and SQLite implementation.
//!
//! # Responsibility
//! - Own the capacity-safe enroll/withdraw protocol and its read models
//!   (roster, transcript, seat projection).
//! - Keep the enrollment and its grade record in lockstep: both rows are
//!   created in one transaction and deleted in one transaction.
//!
//! # Invariants
//! - `count(live enrollments for group) <= group.max_capacity`, always.
//! - The whole protocol runs inside one immediate transaction: the capacity
//!   count reads latest-committed state and no other writer can interleave
//!   between check and insert.
//! - Validation failures roll back before any row is touched.
//!
//! # See also
//! - docs/architecture/concurrency.md

use crate::model::catalog::Student;
use crate::model::enrollment::Enrollment;
use crate::model::grade::GradeRecord;
use crate::model::{EnrollmentId, EntityKind, GroupId, StudentId};
use crate::repo::{ensure_connection_ready, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, Row, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Error taxonomy of the enrollment ledger.
///
/// Every variant carries the ids the caller needs to render a specific
/// message; none of them leaves partial state behind.
#[derive(Debug)]
pub enum LedgerError {
    /// student_id or group_id did not resolve in the catalog.
    ReferenceNotFound { kind: EntityKind, id: Uuid },
    /// An enrollment already exists for this (student, group) pair.
    AlreadyEnrolled {
        student_id: StudentId,
        group_id: GroupId,
    },
    /// The group is at capacity. A business outcome, not a fault; the core
    /// never retries it.
    GroupFull {
        group_id: GroupId,
        max_capacity: u32,
    },
    /// No enrollment exists for this (student, group) pair.
    NotEnrolled {
        student_id: StudentId,
        group_id: GroupId,
    },
    /// Persistence-layer failure (includes `Busy` lock timeouts).
    Repo(RepoError),
}

impl Display for LedgerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReferenceNotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::AlreadyEnrolled {
                student_id,
                group_id,
            } => write!(
                f,
                "student {student_id} is already enrolled in group {group_id}"
            ),
            Self::GroupFull {
                group_id,
                max_capacity,
            } => write!(f, "group {group_id} is full (capacity {max_capacity})"),
            Self::NotEnrolled {
                student_id,
                group_id,
            } => write!(f, "student {student_id} is not enrolled in group {group_id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for LedgerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for LedgerError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<rusqlite::Error> for LedgerError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(RepoError::from(value))
    }
}

/// Result of a successful enrollment: the new record and its zeroed grade
/// record, created together.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEnrollment {
    pub enrollment: Enrollment,
    pub grades: GradeRecord,
}

/// One roster row: an enrollment joined with its student and grade record.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterEntry {
    pub enrollment: Enrollment,
    pub student: Student,
    pub grades: GradeRecord,
}

/// One transcript row: an enrollment of a student joined with its group
/// and grade record.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptEntry {
    pub enrollment: Enrollment,
    pub group_id: GroupId,
    pub period: String,
    pub grades: GradeRecord,
}

/// Seat usage projection, derived from the live enrollment count.
///
/// Never persisted: the derived count is the sole source of truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupSeats {
    pub group_id: GroupId,
    pub used: u32,
    pub capacity: u32,
}

/// Repository interface for the enrollment ledger.
pub trait EnrollmentRepository {
    /// Runs the full enrollment protocol as one atomic unit.
    fn enroll(&mut self, student_id: StudentId, group_id: GroupId) -> LedgerResult<NewEnrollment>;
    /// Deletes the grade record and the enrollment together.
    fn withdraw(&mut self, student_id: StudentId, group_id: GroupId) -> LedgerResult<()>;
    fn get_enrollment(&self, id: EnrollmentId) -> RepoResult<Option<Enrollment>>;
    fn find_enrollment(
        &self,
        student_id: StudentId,
        group_id: GroupId,
    ) -> RepoResult<Option<Enrollment>>;
    /// Roster ordered by student enrollment number, then enrollment id.
    fn roster(&self, group_id: GroupId) -> LedgerResult<Vec<RosterEntry>>;
    /// A student's enrollments ordered by enrollment date, then id.
    fn transcript(&self, student_id: StudentId) -> LedgerResult<Vec<TranscriptEntry>>;
    fn seats(&self, group_id: GroupId) -> LedgerResult<GroupSeats>;
    fn live_count(&self, group_id: GroupId) -> RepoResult<u32>;
}

/// SQLite-backed enrollment ledger.
pub struct SqliteEnrollmentRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteEnrollmentRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_connection_ready(
            conn,
            &["students", "course_groups", "enrollments", "grade_records"],
        )?;
        Ok(Self { conn })
    }
}

impl EnrollmentRepository for SqliteEnrollmentRepository<'_> {
    fn enroll(&mut self, student_id: StudentId, group_id: GroupId) -> LedgerResult<NewEnrollment> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        if !row_exists(&tx, "students", student_id)? {
            return Err(LedgerError::ReferenceNotFound {
                kind: EntityKind::Student,
                id: student_id,
            });
        }
        let max_capacity = match group_capacity(&tx, group_id)? {
            Some(value) => value,
            None => {
                return Err(LedgerError::ReferenceNotFound {
                    kind: EntityKind::Group,
                    id: group_id,
                })
            }
        };

        if find_enrollment_in(&tx, student_id, group_id)?.is_some() {
            return Err(LedgerError::AlreadyEnrolled {
                student_id,
                group_id,
            });
        }

        let used = count_live(&tx, group_id)?;
        if used >= max_capacity {
            return Err(LedgerError::GroupFull {
                group_id,
                max_capacity,
            });
        }

        let enrollment_id = Uuid::new_v4();
        tx.execute(
            "INSERT INTO enrollments (id, student_id, group_id, enrolled_on)
             VALUES (?1, ?2, ?3, date('now'));",
            params![
                enrollment_id.to_string(),
                student_id.to_string(),
                group_id.to_string(),
            ],
        )?;

        let grade_record_id = Uuid::new_v4();
        tx.execute(
            "INSERT INTO grade_records (id, enrollment_id, midterm1, midterm2, final_exam)
             VALUES (?1, ?2, 0, 0, 0);",
            params![grade_record_id.to_string(), enrollment_id.to_string()],
        )?;

        let enrollment = match find_enrollment_in(&tx, student_id, group_id)? {
            Some(value) => value,
            None => {
                return Err(LedgerError::Repo(RepoError::InvalidData(
                    "created enrollment not found in read-back".to_string(),
                )))
            }
        };

        tx.commit()?;

        Ok(NewEnrollment {
            enrollment,
            grades: GradeRecord {
                id: grade_record_id,
                enrollment_id,
                midterm1: 0.0,
                midterm2: 0.0,
                final_exam: 0.0,
            },
        })
    }

    fn withdraw(&mut self, student_id: StudentId, group_id: GroupId) -> LedgerResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let enrollment = match find_enrollment_in(&tx, student_id, group_id)? {
            Some(value) => value,
            None => {
                return Err(LedgerError::NotEnrolled {
                    student_id,
                    group_id,
                })
            }
        };

        tx.execute(
            "DELETE FROM grade_records WHERE enrollment_id = ?1;",
            [enrollment.id.to_string()],
        )?;
        tx.execute(
            "DELETE FROM enrollments WHERE id = ?1;",
            [enrollment.id.to_string()],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn get_enrollment(&self, id: EnrollmentId) -> RepoResult<Option<Enrollment>> {
        let mut stmt = self.conn.prepare(
            "SELECT id AS enrollment_id, student_id, group_id, enrolled_on
             FROM enrollments
             WHERE id = ?1;",
        )?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_enrollment_row(row)?));
        }
        Ok(None)
    }

    fn find_enrollment(
        &self,
        student_id: StudentId,
        group_id: GroupId,
    ) -> RepoResult<Option<Enrollment>> {
        find_enrollment_in(self.conn, student_id, group_id)
    }

    fn roster(&self, group_id: GroupId) -> LedgerResult<Vec<RosterEntry>> {
        if group_capacity(self.conn, group_id)?.is_none() {
            return Err(LedgerError::ReferenceNotFound {
                kind: EntityKind::Group,
                id: group_id,
            });
        }

        let mut stmt = self.conn.prepare(
            "SELECT
                e.id AS enrollment_id,
                e.student_id,
                e.group_id,
                e.enrolled_on,
                s.enrollment_number,
                s.name,
                s.email,
                g.id AS grade_record_id,
                g.midterm1,
                g.midterm2,
                g.final_exam
             FROM enrollments e
             INNER JOIN students s ON s.id = e.student_id
             INNER JOIN grade_records g ON g.enrollment_id = e.id
             WHERE e.group_id = ?1
             ORDER BY s.enrollment_number ASC, e.id ASC;",
        )?;

        let mut rows = stmt.query([group_id.to_string()])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            let enrollment = parse_enrollment_row(row)?;
            let grade_id_text: String = row.get("grade_record_id")?;
            entries.push(RosterEntry {
                student: Student {
                    id: enrollment.student_id,
                    enrollment_number: row.get("enrollment_number")?,
                    name: row.get("name")?,
                    email: row.get("email")?,
                },
                grades: GradeRecord {
                    id: parse_uuid(&grade_id_text, "grade_records.id")?,
                    enrollment_id: enrollment.id,
                    midterm1: row.get("midterm1")?,
                    midterm2: row.get("midterm2")?,
                    final_exam: row.get("final_exam")?,
                },
                enrollment,
            });
        }

        Ok(entries)
    }

    fn transcript(&self, student_id: StudentId) -> LedgerResult<Vec<TranscriptEntry>> {
        if !row_exists(self.conn, "students", student_id)? {
            return Err(LedgerError::ReferenceNotFound {
                kind: EntityKind::Student,
                id: student_id,
            });
        }

        let mut stmt = self.conn.prepare(
            "SELECT
                e.id AS enrollment_id,
                e.student_id,
                e.group_id,
                e.enrolled_on,
                cg.period,
                g.id AS grade_record_id,
                g.midterm1,
                g.midterm2,
                g.final_exam
             FROM enrollments e
             INNER JOIN course_groups cg ON cg.id = e.group_id
             INNER JOIN grade_records g ON g.enrollment_id = e.id
             WHERE e.student_id = ?1
             ORDER BY e.enrolled_on ASC, e.id ASC;",
        )?;

        let mut rows = stmt.query([student_id.to_string()])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            let enrollment = parse_enrollment_row(row)?;
            let grade_id_text: String = row.get("grade_record_id")?;
            entries.push(TranscriptEntry {
                group_id: enrollment.group_id,
                period: row.get("period")?,
                grades: GradeRecord {
                    id: parse_uuid(&grade_id_text, "grade_records.id")?,
                    enrollment_id: enrollment.id,
                    midterm1: row.get("midterm1")?,
                    midterm2: row.get("midterm2")?,
                    final_exam: row.get("final_exam")?,
                },
                enrollment,
            });
        }

        Ok(entries)
    }

    fn seats(&self, group_id: GroupId) -> LedgerResult<GroupSeats> {
        let capacity = match group_capacity(self.conn, group_id)? {
            Some(value) => value,
            None => {
                return Err(LedgerError::ReferenceNotFound {
                    kind: EntityKind::Group,
                    id: group_id,
                })
            }
        };
        let used = count_live(self.conn, group_id)?;

        Ok(GroupSeats {
            group_id,
            used,
            capacity,
        })
    }

    fn live_count(&self, group_id: GroupId) -> RepoResult<u32> {
        count_live(self.conn, group_id)
    }
}

fn row_exists(conn: &Connection, table: &str, id: Uuid) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        &format!(
            "SELECT EXISTS(
                SELECT 1 FROM {table} WHERE id = ?1
            );"
        ),
        [id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn group_capacity(conn: &Connection, group_id: GroupId) -> RepoResult<Option<u32>> {
    let mut stmt = conn.prepare("SELECT max_capacity FROM course_groups WHERE id = ?1;")?;
    let mut rows = stmt.query([group_id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(row.get(0)?));
    }
    Ok(None)
}

fn count_live(conn: &Connection, group_id: GroupId) -> RepoResult<u32> {
    let count: u32 = conn.query_row(
        "SELECT COUNT(*) FROM enrollments WHERE group_id = ?1;",
        [group_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count)
}

fn find_enrollment_in(
    conn: &Connection,
    student_id: StudentId,
    group_id: GroupId,
) -> RepoResult<Option<Enrollment>> {
    let mut stmt = conn.prepare(
        "SELECT id AS enrollment_id, student_id, group_id, enrolled_on
         FROM enrollments
         WHERE student_id = ?1 AND group_id = ?2;",
    )?;
    let mut rows = stmt.query(params![student_id.to_string(), group_id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_enrollment_row(row)?));
    }
    Ok(None)
}

fn parse_enrollment_row(row: &Row<'_>) -> RepoResult<Enrollment> {
    let id_text: String = row.get("enrollment_id")?;
    let student_text: String = row.get("student_id")?;
    let group_text: String = row.get("group_id")?;

    Ok(Enrollment {
        id: parse_uuid(&id_text, "enrollments.id")?,
        student_id: parse_uuid(&student_text, "enrollments.student_id")?,
        group_id: parse_uuid(&group_text, "enrollments.group_id")?,
        enrolled_on: row.get("enrolled_on")?,
    })
}
