//! Notes collaborator SPI.
//!
//! # Responsibility
//! - Define the narrow interface of the external free-text note store that
//!   catalog/UI layers call directly.
//!
//! # Invariants
//! - The core never reads or writes notes itself and holds no reference to
//!   them; it only exposes the student/teacher/group ids notes key on.
//! - Each note write is atomic at single-document granularity.

use crate::model::{GroupId, StudentId, TeacherId};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for a note document.
pub type NoteId = Uuid;

/// Category of a free-text note about a student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteType {
    Performance,
    Attendance,
    Behavior,
}

impl NoteType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Performance => "performance",
            Self::Attendance => "attendance",
            Self::Behavior => "behavior",
        }
    }
}

impl Display for NoteType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One note document as returned by the collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentNote {
    pub id: NoteId,
    pub student_id: StudentId,
    pub teacher_id: TeacherId,
    pub group_id: GroupId,
    pub note_type: NoteType,
    pub comment: String,
    /// Epoch milliseconds assigned by the collaborator.
    pub noted_at_ms: i64,
}

/// Creation request for one note document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStudentNote {
    pub student_id: StudentId,
    pub teacher_id: TeacherId,
    pub group_id: GroupId,
    pub note_type: NoteType,
    pub comment: String,
}

/// Collaborator-side failure surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotesError {
    /// The note content was rejected by the collaborator.
    InvalidNote(String),
    /// The collaborator could not be reached or could not complete the
    /// write.
    Unavailable(String),
}

impl Display for NotesError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidNote(message) => write!(f, "invalid note: {message}"),
            Self::Unavailable(message) => write!(f, "notes store unavailable: {message}"),
        }
    }
}

impl Error for NotesError {}

/// Interface of the external note store.
///
/// Implementations live outside this crate; the core ships only the
/// contract so embedding layers and the collaborator agree on shapes.
pub trait NotesCollaborator {
    fn create(&mut self, note: &NewStudentNote) -> Result<NoteId, NotesError>;
    /// Notes about one student, oldest first.
    fn list_by_student(&self, student_id: StudentId) -> Result<Vec<StudentNote>, NotesError>;
}
