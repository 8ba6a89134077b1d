//! Enrollment record binding one student to one group.
//!
//! # Invariants
//! - The (student_id, group_id) pair is unique among live enrollments;
//!   storage enforces it.
//! - An enrollment exists only if group capacity allowed it at creation
//!   time, and always together with exactly one grade record.

use crate::model::{EnrollmentId, GroupId, StudentId};
use serde::{Deserialize, Serialize};

/// The record binding one student to one course group.
///
/// Created only by the enrollment protocol and destroyed only by the
/// withdrawal protocol, which also removes the bound grade record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub student_id: StudentId,
    pub group_id: GroupId,
    /// Calendar date (`YYYY-MM-DD`) assigned by storage at creation.
    pub enrolled_on: String,
}
