//! Domain model for catalog, enrollment, grading and audit records.
//!
//! # Responsibility
//! - Define the canonical data structures used by core business logic.
//! - Keep validation rules next to the data they constrain.
//!
//! # Invariants
//! - Every record is identified by a stable UUID that is never reused.
//! - Ownership split: the core owns Enrollment/GradeRecord/AuditEntry and
//!   references Student/Teacher/Course/Group from the catalog.
//!
//! # See also
//! - docs/architecture/data-model.md

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod audit;
pub mod catalog;
pub mod enrollment;
pub mod grade;

/// Stable identifier for a student record.
pub type StudentId = Uuid;
/// Stable identifier for a teacher record.
pub type TeacherId = Uuid;
/// Stable identifier for a course record.
pub type CourseId = Uuid;
/// Stable identifier for a course group (one offering of a course).
pub type GroupId = Uuid;
/// Stable identifier for an enrollment record.
pub type EnrollmentId = Uuid;
/// Stable identifier for a grade record.
pub type GradeRecordId = Uuid;
/// Stable identifier for an audit entry.
pub type AuditEntryId = Uuid;

/// Entity discriminator used by structured errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Student,
    Teacher,
    Course,
    Group,
    Enrollment,
    GradeRecord,
}

impl EntityKind {
    /// Returns the lowercase name used in log lines and error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Teacher => "teacher",
            Self::Course => "course",
            Self::Group => "group",
            Self::Enrollment => "enrollment",
            Self::GradeRecord => "grade_record",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
