//! Catalog reference entities: students, teachers, courses, groups.
//!
//! # Responsibility
//! - Define the reference records the enrollment ledger validates against.
//! - Enforce lexical constraints (required fields, email shape) before
//!   persistence.
//!
//! # Invariants
//! - `Student::enrollment_number` is unique across all students; the
//!   uniqueness itself is enforced by storage, not here.
//! - `Group::max_capacity` is fixed by admin input and never mutated by
//!   enrollment logic.
//!
//! # See also
//! - docs/architecture/data-model.md

use crate::model::{CourseId, EntityKind, GroupId, StudentId, TeacherId};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// Validation error for catalog entities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogValidationError {
    /// A required text field is empty or whitespace-only.
    EmptyField {
        entity: EntityKind,
        field: &'static str,
    },
    /// An email value does not look like `local@domain.tld`.
    InvalidEmail(String),
}

impl Display for CatalogValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyField { entity, field } => {
                write!(f, "{entity} field `{field}` must not be empty")
            }
            Self::InvalidEmail(value) => write!(f, "invalid email address: `{value}`"),
        }
    }
}

impl Error for CatalogValidationError {}

/// One student known to the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    /// Institutional enrollment number, unique across all students.
    pub enrollment_number: String,
    pub name: String,
    /// Optional contact address; validated for shape when present.
    pub email: Option<String>,
}

impl Student {
    pub fn new(
        enrollment_number: impl Into<String>,
        name: impl Into<String>,
        email: Option<String>,
    ) -> Self {
        Self::with_id(Uuid::new_v4(), enrollment_number, name, email)
    }

    /// Creates a student with a caller-provided id, for import paths.
    pub fn with_id(
        id: StudentId,
        enrollment_number: impl Into<String>,
        name: impl Into<String>,
        email: Option<String>,
    ) -> Self {
        Self {
            id,
            enrollment_number: enrollment_number.into(),
            name: name.into(),
            email,
        }
    }

    pub fn validate(&self) -> Result<(), CatalogValidationError> {
        require_non_empty(EntityKind::Student, "enrollment_number", &self.enrollment_number)?;
        require_non_empty(EntityKind::Student, "name", &self.name)?;
        validate_email(self.email.as_deref())
    }
}

/// One teacher known to the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teacher {
    pub id: TeacherId,
    pub name: String,
    pub email: Option<String>,
}

impl Teacher {
    pub fn new(name: impl Into<String>, email: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email,
        }
    }

    pub fn validate(&self) -> Result<(), CatalogValidationError> {
        require_non_empty(EntityKind::Teacher, "name", &self.name)?;
        validate_email(self.email.as_deref())
    }
}

/// One course offered by the institution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub name: String,
}

impl Course {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
        }
    }

    pub fn validate(&self) -> Result<(), CatalogValidationError> {
        require_non_empty(EntityKind::Course, "name", &self.name)
    }
}

/// One offering of a course in a period, with a seat capacity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub course_id: CourseId,
    /// Assigned teacher, if any.
    pub teacher_id: Option<TeacherId>,
    /// Period label such as `2026-1`.
    pub period: String,
    /// Maximum number of live enrollments the group admits.
    pub max_capacity: u32,
}

impl Group {
    pub fn new(
        course_id: CourseId,
        teacher_id: Option<TeacherId>,
        period: impl Into<String>,
        max_capacity: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            course_id,
            teacher_id,
            period: period.into(),
            max_capacity,
        }
    }

    pub fn validate(&self) -> Result<(), CatalogValidationError> {
        require_non_empty(EntityKind::Group, "period", &self.period)
    }
}

fn require_non_empty(
    entity: EntityKind,
    field: &'static str,
    value: &str,
) -> Result<(), CatalogValidationError> {
    if value.trim().is_empty() {
        return Err(CatalogValidationError::EmptyField { entity, field });
    }
    Ok(())
}

fn validate_email(email: Option<&str>) -> Result<(), CatalogValidationError> {
    match email {
        Some(value) if !EMAIL_RE.is_match(value) => {
            Err(CatalogValidationError::InvalidEmail(value.to_string()))
        }
        _ => Ok(()),
    }
}
