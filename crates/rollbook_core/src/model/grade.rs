//! Grade record model, partial-update patches and derived projections.
//!
//! # Responsibility
//! - Define the three-score grade record bound 1:1 to an enrollment.
//! - Validate score ranges before any persistence happens.
//! - Derive `average()`/`pass_status()` as pure computed views.
//!
//! # Invariants
//! - Every score lies in `[0, 100]` once persisted.
//! - A patch is all-or-nothing: one out-of-range value rejects the call.
//!
//! # See also
//! - docs/architecture/data-model.md

use crate::model::{EnrollmentId, GradeRecordId};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Lowest admissible score.
pub const GRADE_MIN: f64 = 0.0;
/// Highest admissible score.
pub const GRADE_MAX: f64 = 100.0;
/// Minimum final-exam score counted as a pass.
pub const PASSING_FINAL_MIN: f64 = 70.0;

/// One of the three scored fields of a grade record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeField {
    Midterm1,
    Midterm2,
    #[serde(rename = "final")]
    Final,
}

impl GradeField {
    /// Returns the stable name persisted in audit entries.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Midterm1 => "midterm1",
            Self::Midterm2 => "midterm2",
            Self::Final => "final",
        }
    }

    /// Parses the persisted audit field name.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "midterm1" => Some(Self::Midterm1),
            "midterm2" => Some(Self::Midterm2),
            "final" => Some(Self::Final),
            _ => None,
        }
    }
}

impl Display for GradeField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation error for grade mutations.
#[derive(Debug, Clone, PartialEq)]
pub enum GradeValidationError {
    /// A supplied score lies outside `[0, 100]`.
    OutOfRange { field: GradeField, value: f64 },
}

impl Display for GradeValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfRange { field, value } => write!(
                f,
                "grade `{field}` value {value} is outside [{GRADE_MIN}, {GRADE_MAX}]"
            ),
        }
    }
}

impl Error for GradeValidationError {}

/// Pass/fail projection derived from the final-exam score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PassStatus {
    Passed,
    Failed,
}

impl Display for PassStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Passed => f.write_str("Passed"),
            Self::Failed => f.write_str("Failed"),
        }
    }
}

/// The three scores bound to one enrollment.
///
/// Created zeroed together with its enrollment and mutated only through the
/// grade manager, which audits every field change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeRecord {
    pub id: GradeRecordId,
    /// Owning enrollment; exactly one grade record exists per enrollment.
    pub enrollment_id: EnrollmentId,
    pub midterm1: f64,
    pub midterm2: f64,
    #[serde(rename = "final")]
    pub final_exam: f64,
}

impl GradeRecord {
    /// Returns the stored score for one field.
    pub fn score(&self, field: GradeField) -> f64 {
        match field {
            GradeField::Midterm1 => self.midterm1,
            GradeField::Midterm2 => self.midterm2,
            GradeField::Final => self.final_exam,
        }
    }

    /// Overwrites the stored score for one field.
    pub fn set_score(&mut self, field: GradeField, value: f64) {
        match field {
            GradeField::Midterm1 => self.midterm1 = value,
            GradeField::Midterm2 => self.midterm2 = value,
            GradeField::Final => self.final_exam = value,
        }
    }

    /// Mean of the three scores, rounded to two decimals.
    pub fn average(&self) -> f64 {
        let mean = (self.midterm1 + self.midterm2 + self.final_exam) / 3.0;
        (mean * 100.0).round() / 100.0
    }

    /// Pass/fail view: the final exam decides, at `PASSING_FINAL_MIN`.
    pub fn pass_status(&self) -> PassStatus {
        if self.final_exam >= PASSING_FINAL_MIN {
            PassStatus::Passed
        } else {
            PassStatus::Failed
        }
    }
}

/// Partial grade update: absent fields stay unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GradePatch {
    pub midterm1: Option<f64>,
    pub midterm2: Option<f64>,
    #[serde(rename = "final")]
    pub final_exam: Option<f64>,
}

impl GradePatch {
    /// Supplied (field, value) pairs in stable field order.
    pub fn entries(&self) -> Vec<(GradeField, f64)> {
        let mut entries = Vec::new();
        if let Some(value) = self.midterm1 {
            entries.push((GradeField::Midterm1, value));
        }
        if let Some(value) = self.midterm2 {
            entries.push((GradeField::Midterm2, value));
        }
        if let Some(value) = self.final_exam {
            entries.push((GradeField::Final, value));
        }
        entries
    }

    pub fn is_empty(&self) -> bool {
        self.midterm1.is_none() && self.midterm2.is_none() && self.final_exam.is_none()
    }

    /// Rejects the whole patch if any supplied score is outside `[0, 100]`.
    ///
    /// NaN never satisfies the range check, so it is rejected too.
    pub fn validate(&self) -> Result<(), GradeValidationError> {
        for (field, value) in self.entries() {
            if !(GRADE_MIN..=GRADE_MAX).contains(&value) {
                return Err(GradeValidationError::OutOfRange { field, value });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{GradeField, GradePatch, GradeRecord, GradeValidationError, PassStatus};
    use uuid::Uuid;

    fn record(midterm1: f64, midterm2: f64, final_exam: f64) -> GradeRecord {
        GradeRecord {
            id: Uuid::new_v4(),
            enrollment_id: Uuid::new_v4(),
            midterm1,
            midterm2,
            final_exam,
        }
    }

    #[test]
    fn average_rounds_to_two_decimals() {
        assert_eq!(record(80.0, 90.0, 75.0).average(), 81.67);
        assert_eq!(record(50.0, 50.0, 60.0).average(), 53.33);
        assert_eq!(record(0.0, 0.0, 0.0).average(), 0.0);
    }

    #[test]
    fn pass_status_is_decided_by_final_exam_at_seventy() {
        assert_eq!(record(80.0, 90.0, 75.0).pass_status(), PassStatus::Passed);
        assert_eq!(record(100.0, 100.0, 69.99).pass_status(), PassStatus::Failed);
        assert_eq!(record(0.0, 0.0, 70.0).pass_status(), PassStatus::Passed);
        assert_eq!(PassStatus::Passed.to_string(), "Passed");
        assert_eq!(PassStatus::Failed.to_string(), "Failed");
    }

    #[test]
    fn patch_validation_rejects_out_of_range_and_nan() {
        let over = GradePatch {
            final_exam: Some(100.5),
            ..GradePatch::default()
        };
        assert!(matches!(
            over.validate(),
            Err(GradeValidationError::OutOfRange {
                field: GradeField::Final,
                ..
            })
        ));

        let negative = GradePatch {
            midterm1: Some(-0.1),
            ..GradePatch::default()
        };
        assert!(negative.validate().is_err());

        let nan = GradePatch {
            midterm2: Some(f64::NAN),
            ..GradePatch::default()
        };
        assert!(nan.validate().is_err());

        let boundaries = GradePatch {
            midterm1: Some(0.0),
            midterm2: Some(100.0),
            final_exam: Some(70.0),
        };
        assert!(boundaries.validate().is_ok());
    }

    #[test]
    fn patch_entries_keep_stable_field_order() {
        let patch = GradePatch {
            final_exam: Some(88.0),
            midterm1: Some(90.0),
            midterm2: None,
        };
        let fields: Vec<_> = patch.entries().iter().map(|(field, _)| *field).collect();
        assert_eq!(fields, vec![GradeField::Midterm1, GradeField::Final]);
        assert!(!patch.is_empty());
        assert!(GradePatch::default().is_empty());
    }
}
