//! Grade record use-case service.
//!
//! # Responsibility
//! - Provide the validated SetGrades entry point and grade reads.
//! - Delegate persistence and audit emission to the repository.
//!
//! # Invariants
//! - Service APIs never bypass repository validation/audit contracts.

use crate::model::grade::{GradePatch, GradeRecord};
use crate::model::{EnrollmentId, GradeRecordId};
use crate::repo::grade_repo::{GradeError, GradeRepository, GradeResult};
use crate::repo::RepoResult;
use log::{error, info};

/// Use-case service for grade records.
pub struct GradeService<R: GradeRepository> {
    repo: R,
}

impl<R: GradeRepository> GradeService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Applies a partial grade update on behalf of `actor`.
    ///
    /// Fields left out of the patch stay unchanged; every field that does
    /// change lands in the audit trail with the acting identity.
    pub fn set_grades(
        &mut self,
        enrollment_id: EnrollmentId,
        patch: &GradePatch,
        actor: &str,
    ) -> GradeResult<GradeRecord> {
        match self.repo.set_grades(enrollment_id, patch, actor) {
            Ok(record) => {
                info!(
                    "event=set_grades module=grades status=ok enrollment_id={enrollment_id} grade_record_id={}",
                    record.id
                );
                Ok(record)
            }
            Err(GradeError::Repo(err)) => {
                error!(
                    "event=set_grades module=grades status=error enrollment_id={enrollment_id} error={err}"
                );
                Err(GradeError::Repo(err))
            }
            Err(err) => {
                info!(
                    "event=set_grades module=grades status=rejected enrollment_id={enrollment_id} reason={err}"
                );
                Err(err)
            }
        }
    }

    /// Gets the grade record bound to one enrollment.
    pub fn grade_record(&self, enrollment_id: EnrollmentId) -> RepoResult<Option<GradeRecord>> {
        self.repo.get_by_enrollment(enrollment_id)
    }

    /// Gets one grade record by stable id.
    pub fn get(&self, id: GradeRecordId) -> RepoResult<Option<GradeRecord>> {
        self.repo.get(id)
    }
}
