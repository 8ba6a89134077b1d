//! Enrollment use-case service.
//!
//! # Responsibility
//! - Provide the enroll/withdraw entry points and roster/transcript/seat
//!   reads for core callers.
//! - Acquire the per-group gate before delegating the protocol to the
//!   repository.
//!
//! # Invariants
//! - Enroll/Withdraw for one group never run concurrently within a
//!   process; different groups do not contend on each other's gate.
//! - Service APIs never bypass repository transaction contracts.
//!
//! # See also
//! - docs/architecture/concurrency.md

use crate::model::enrollment::Enrollment;
use crate::model::{EnrollmentId, GroupId, StudentId};
use crate::repo::enrollment_repo::{
    EnrollmentRepository, GroupSeats, LedgerError, LedgerResult, NewEnrollment, RosterEntry,
    TranscriptEntry,
};
use crate::repo::RepoResult;
use crate::service::group_locks::{recover, GroupLockRegistry};
use log::{error, info};
use std::sync::Arc;

/// Use-case service for the enrollment ledger.
pub struct EnrollmentService<R: EnrollmentRepository> {
    repo: R,
    locks: Arc<GroupLockRegistry>,
}

impl<R: EnrollmentRepository> EnrollmentService<R> {
    /// Creates a service sharing the process-wide gate registry.
    ///
    /// All ledger handles that touch the same database must share the same
    /// registry, or per-group serialization degrades to the transaction
    /// layer alone.
    pub fn new(repo: R, locks: Arc<GroupLockRegistry>) -> Self {
        Self { repo, locks }
    }

    /// Enrolls a student into a group, creating the zeroed grade record
    /// with it.
    pub fn enroll(
        &mut self,
        student_id: StudentId,
        group_id: GroupId,
    ) -> LedgerResult<NewEnrollment> {
        let gate = self.locks.gate(group_id);
        let _held = recover(gate.lock());

        match self.repo.enroll(student_id, group_id) {
            Ok(admitted) => {
                info!(
                    "event=enroll module=ledger status=ok group_id={group_id} student_id={student_id} enrollment_id={}",
                    admitted.enrollment.id
                );
                Ok(admitted)
            }
            Err(err) => {
                log_rejection("enroll", group_id, student_id, &err);
                Err(err)
            }
        }
    }

    /// Withdraws a student from a group, deleting the enrollment and its
    /// grade record together.
    pub fn withdraw(&mut self, student_id: StudentId, group_id: GroupId) -> LedgerResult<()> {
        let gate = self.locks.gate(group_id);
        let _held = recover(gate.lock());

        match self.repo.withdraw(student_id, group_id) {
            Ok(()) => {
                info!(
                    "event=withdraw module=ledger status=ok group_id={group_id} student_id={student_id}"
                );
                Ok(())
            }
            Err(err) => {
                log_rejection("withdraw", group_id, student_id, &err);
                Err(err)
            }
        }
    }

    /// Group roster ordered by student enrollment number.
    pub fn roster(&self, group_id: GroupId) -> LedgerResult<Vec<RosterEntry>> {
        self.repo.roster(group_id)
    }

    /// A student's enrollments with group and grade data.
    pub fn transcript(&self, student_id: StudentId) -> LedgerResult<Vec<TranscriptEntry>> {
        self.repo.transcript(student_id)
    }

    /// Seat usage derived from the live enrollment count.
    pub fn seats(&self, group_id: GroupId) -> LedgerResult<GroupSeats> {
        self.repo.seats(group_id)
    }

    /// Gets one enrollment by stable id.
    pub fn get_enrollment(&self, id: EnrollmentId) -> RepoResult<Option<Enrollment>> {
        self.repo.get_enrollment(id)
    }

    /// Finds the enrollment for a (student, group) pair.
    pub fn find_enrollment(
        &self,
        student_id: StudentId,
        group_id: GroupId,
    ) -> RepoResult<Option<Enrollment>> {
        self.repo.find_enrollment(student_id, group_id)
    }
}

fn log_rejection(event: &str, group_id: GroupId, student_id: StudentId, err: &LedgerError) {
    match err {
        LedgerError::Repo(repo_err) => error!(
            "event={event} module=ledger status=error group_id={group_id} student_id={student_id} error={repo_err}"
        ),
        LedgerError::ReferenceNotFound { .. } => info!(
            "event={event} module=ledger status=rejected reason=reference_not_found group_id={group_id} student_id={student_id}"
        ),
        LedgerError::AlreadyEnrolled { .. } => info!(
            "event={event} module=ledger status=rejected reason=already_enrolled group_id={group_id} student_id={student_id}"
        ),
        LedgerError::GroupFull { max_capacity, .. } => info!(
            "event={event} module=ledger status=rejected reason=group_full group_id={group_id} student_id={student_id} max_capacity={max_capacity}"
        ),
        LedgerError::NotEnrolled { .. } => info!(
            "event={event} module=ledger status=rejected reason=not_enrolled group_id={group_id} student_id={student_id}"
        ),
    }
}
