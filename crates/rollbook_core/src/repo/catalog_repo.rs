//! Catalog repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide get/list access to students, teachers, courses and groups for
//!   the enrollment ledger and embedding callers.
//! - Provide admin create/delete with referential protection.
//!
//! # Invariants
//! - Write paths call the model `validate()` before SQL mutations.
//! - Deletes never orphan live records: a catalog row referenced by
//!   enrollments or groups is reported as `StillReferenced`.
//!
//! # See also
//! - docs/architecture/data-model.md

use crate::model::catalog::{Course, Group, Student, Teacher};
use crate::model::{CourseId, EntityKind, GroupId, StudentId, TeacherId};
use crate::repo::{
    ensure_connection_ready, is_fk_violation, is_unique_violation, parse_uuid, RepoError,
    RepoResult,
};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

/// Repository interface for catalog reference data.
pub trait CatalogRepository {
    fn create_student(&self, student: &Student) -> RepoResult<StudentId>;
    fn create_teacher(&self, teacher: &Teacher) -> RepoResult<TeacherId>;
    fn create_course(&self, course: &Course) -> RepoResult<CourseId>;
    fn create_group(&self, group: &Group) -> RepoResult<GroupId>;

    fn get_student(&self, id: StudentId) -> RepoResult<Option<Student>>;
    fn get_teacher(&self, id: TeacherId) -> RepoResult<Option<Teacher>>;
    fn get_course(&self, id: CourseId) -> RepoResult<Option<Course>>;
    fn get_group(&self, id: GroupId) -> RepoResult<Option<Group>>;

    /// Lists students ordered by enrollment number.
    fn list_students(&self) -> RepoResult<Vec<Student>>;
    /// Lists teachers ordered by name.
    fn list_teachers(&self) -> RepoResult<Vec<Teacher>>;
    /// Lists courses ordered by name.
    fn list_courses(&self) -> RepoResult<Vec<Course>>;
    /// Lists groups ordered by period, then id.
    fn list_groups(&self) -> RepoResult<Vec<Group>>;

    fn delete_student(&self, id: StudentId) -> RepoResult<()>;
    fn delete_teacher(&self, id: TeacherId) -> RepoResult<()>;
    fn delete_course(&self, id: CourseId) -> RepoResult<()>;
    fn delete_group(&self, id: GroupId) -> RepoResult<()>;
}

/// SQLite-backed catalog repository.
pub struct SqliteCatalogRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCatalogRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["students", "teachers", "courses", "course_groups"])?;
        Ok(Self { conn })
    }

    fn delete_row(&self, kind: EntityKind, table: &str, id: Uuid) -> RepoResult<()> {
        let changed = self
            .conn
            .execute(
                &format!("DELETE FROM {table} WHERE id = ?1;"),
                [id.to_string()],
            )
            .map_err(|err| {
                if is_fk_violation(&err) {
                    RepoError::StillReferenced { kind, id }
                } else {
                    err.into()
                }
            })?;

        if changed == 0 {
            return Err(RepoError::NotFound { kind, id });
        }

        Ok(())
    }
}

impl CatalogRepository for SqliteCatalogRepository<'_> {
    fn create_student(&self, student: &Student) -> RepoResult<StudentId> {
        student.validate()?;

        self.conn
            .execute(
                "INSERT INTO students (id, enrollment_number, name, email)
                 VALUES (?1, ?2, ?3, ?4);",
                params![
                    student.id.to_string(),
                    student.enrollment_number.as_str(),
                    student.name.as_str(),
                    student.email.as_deref(),
                ],
            )
            .map_err(|err| {
                if is_unique_violation(&err) {
                    RepoError::DuplicateEnrollmentNumber(student.enrollment_number.clone())
                } else {
                    err.into()
                }
            })?;

        Ok(student.id)
    }

    fn create_teacher(&self, teacher: &Teacher) -> RepoResult<TeacherId> {
        teacher.validate()?;

        self.conn.execute(
            "INSERT INTO teachers (id, name, email) VALUES (?1, ?2, ?3);",
            params![
                teacher.id.to_string(),
                teacher.name.as_str(),
                teacher.email.as_deref(),
            ],
        )?;

        Ok(teacher.id)
    }

    fn create_course(&self, course: &Course) -> RepoResult<CourseId> {
        course.validate()?;

        self.conn.execute(
            "INSERT INTO courses (id, name) VALUES (?1, ?2);",
            params![course.id.to_string(), course.name.as_str()],
        )?;

        Ok(course.id)
    }

    fn create_group(&self, group: &Group) -> RepoResult<GroupId> {
        group.validate()?;

        if self.get_course(group.course_id)?.is_none() {
            return Err(RepoError::NotFound {
                kind: EntityKind::Course,
                id: group.course_id,
            });
        }
        if let Some(teacher_id) = group.teacher_id {
            if self.get_teacher(teacher_id)?.is_none() {
                return Err(RepoError::NotFound {
                    kind: EntityKind::Teacher,
                    id: teacher_id,
                });
            }
        }

        self.conn.execute(
            "INSERT INTO course_groups (id, course_id, teacher_id, period, max_capacity)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                group.id.to_string(),
                group.course_id.to_string(),
                group.teacher_id.map(|id| id.to_string()),
                group.period.as_str(),
                group.max_capacity,
            ],
        )?;

        Ok(group.id)
    }

    fn get_student(&self, id: StudentId) -> RepoResult<Option<Student>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, enrollment_number, name, email FROM students WHERE id = ?1;",
        )?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_student_row(row)?));
        }
        Ok(None)
    }

    fn get_teacher(&self, id: TeacherId) -> RepoResult<Option<Teacher>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, email FROM teachers WHERE id = ?1;")?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_teacher_row(row)?));
        }
        Ok(None)
    }

    fn get_course(&self, id: CourseId) -> RepoResult<Option<Course>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM courses WHERE id = ?1;")?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_course_row(row)?));
        }
        Ok(None)
    }

    fn get_group(&self, id: GroupId) -> RepoResult<Option<Group>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, course_id, teacher_id, period, max_capacity
             FROM course_groups
             WHERE id = ?1;",
        )?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_group_row(row)?));
        }
        Ok(None)
    }

    fn list_students(&self) -> RepoResult<Vec<Student>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, enrollment_number, name, email
             FROM students
             ORDER BY enrollment_number ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut students = Vec::new();
        while let Some(row) = rows.next()? {
            students.push(parse_student_row(row)?);
        }
        Ok(students)
    }

    fn list_teachers(&self) -> RepoResult<Vec<Teacher>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, email FROM teachers ORDER BY name ASC, id ASC;")?;
        let mut rows = stmt.query([])?;
        let mut teachers = Vec::new();
        while let Some(row) = rows.next()? {
            teachers.push(parse_teacher_row(row)?);
        }
        Ok(teachers)
    }

    fn list_courses(&self) -> RepoResult<Vec<Course>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM courses ORDER BY name ASC, id ASC;")?;
        let mut rows = stmt.query([])?;
        let mut courses = Vec::new();
        while let Some(row) = rows.next()? {
            courses.push(parse_course_row(row)?);
        }
        Ok(courses)
    }

    fn list_groups(&self) -> RepoResult<Vec<Group>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, course_id, teacher_id, period, max_capacity
             FROM course_groups
             ORDER BY period ASC, id ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut groups = Vec::new();
        while let Some(row) = rows.next()? {
            groups.push(parse_group_row(row)?);
        }
        Ok(groups)
    }

    fn delete_student(&self, id: StudentId) -> RepoResult<()> {
        self.delete_row(EntityKind::Student, "students", id)
    }

    fn delete_teacher(&self, id: TeacherId) -> RepoResult<()> {
        self.delete_row(EntityKind::Teacher, "teachers", id)
    }

    fn delete_course(&self, id: CourseId) -> RepoResult<()> {
        self.delete_row(EntityKind::Course, "courses", id)
    }

    fn delete_group(&self, id: GroupId) -> RepoResult<()> {
        self.delete_row(EntityKind::Group, "course_groups", id)
    }
}

fn parse_student_row(row: &Row<'_>) -> RepoResult<Student> {
    let id_text: String = row.get("id")?;
    Ok(Student {
        id: parse_uuid(&id_text, "students.id")?,
        enrollment_number: row.get("enrollment_number")?,
        name: row.get("name")?,
        email: row.get("email")?,
    })
}

fn parse_teacher_row(row: &Row<'_>) -> RepoResult<Teacher> {
    let id_text: String = row.get("id")?;
    Ok(Teacher {
        id: parse_uuid(&id_text, "teachers.id")?,
        name: row.get("name")?,
        email: row.get("email")?,
    })
}

fn parse_course_row(row: &Row<'_>) -> RepoResult<Course> {
    let id_text: String = row.get("id")?;
    Ok(Course {
        id: parse_uuid(&id_text, "courses.id")?,
        name: row.get("name")?,
    })
}

fn parse_group_row(row: &Row<'_>) -> RepoResult<Group> {
    let id_text: String = row.get("id")?;
    let course_text: String = row.get("course_id")?;
    let teacher_id = match row.get::<_, Option<String>>("teacher_id")? {
        Some(value) => Some(parse_uuid(&value, "course_groups.teacher_id")?),
        None => None,
    };

    Ok(Group {
        id: parse_uuid(&id_text, "course_groups.id")?,
        course_id: parse_uuid(&course_text, "course_groups.course_id")?,
        teacher_id,
        period: row.get("period")?,
        max_capacity: row.get("max_capacity")?,
    })
}
