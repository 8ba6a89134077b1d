use rollbook_core::db::open_db_in_memory;
use rollbook_core::{
    CatalogRepository, Course, EntityKind, Group, GroupLockRegistry, RepoError,
    SqliteCatalogRepository, SqliteEnrollmentRepository, Student, Teacher,
};
use rollbook_core::EnrollmentService;
use rusqlite::Connection;
use std::sync::Arc;
use uuid::Uuid;

#[test]
fn create_and_get_roundtrip_for_all_catalog_kinds() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCatalogRepository::try_new(&conn).unwrap();

    let student = Student::new("A-1001", "Ana Torres", Some("ana@example.edu".to_string()));
    let teacher = Teacher::new("R. Mendez", None);
    let course = Course::new("Databases");
    repo.create_student(&student).unwrap();
    repo.create_teacher(&teacher).unwrap();
    repo.create_course(&course).unwrap();

    let group = Group::new(course.id, Some(teacher.id), "2026-1", 30);
    repo.create_group(&group).unwrap();

    assert_eq!(repo.get_student(student.id).unwrap().unwrap(), student);
    assert_eq!(repo.get_teacher(teacher.id).unwrap().unwrap(), teacher);
    assert_eq!(repo.get_course(course.id).unwrap().unwrap(), course);
    assert_eq!(repo.get_group(group.id).unwrap().unwrap(), group);

    assert!(repo.get_student(Uuid::new_v4()).unwrap().is_none());
}

#[test]
fn list_students_orders_by_enrollment_number() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCatalogRepository::try_new(&conn).unwrap();

    repo.create_student(&Student::new("A-1003", "Carla", None))
        .unwrap();
    repo.create_student(&Student::new("A-1001", "Ana", None))
        .unwrap();
    repo.create_student(&Student::new("A-1002", "Bruno", None))
        .unwrap();

    let numbers: Vec<_> = repo
        .list_students()
        .unwrap()
        .into_iter()
        .map(|student| student.enrollment_number)
        .collect();
    assert_eq!(numbers, vec!["A-1001", "A-1002", "A-1003"]);
}

#[test]
fn duplicate_enrollment_number_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCatalogRepository::try_new(&conn).unwrap();

    repo.create_student(&Student::new("A-1001", "Ana", None))
        .unwrap();
    let err = repo
        .create_student(&Student::new("A-1001", "Impostor", None))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::DuplicateEnrollmentNumber(number) if number == "A-1001"
    ));

    assert_eq!(repo.list_students().unwrap().len(), 1);
}

#[test]
fn validation_failure_blocks_create() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCatalogRepository::try_new(&conn).unwrap();

    let err = repo
        .create_student(&Student::new("A-1001", "Ana", Some("not-an-email".to_string())))
        .unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
    assert!(repo.list_students().unwrap().is_empty());
}

#[test]
fn group_creation_checks_course_and_teacher_references() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCatalogRepository::try_new(&conn).unwrap();

    let orphan_course = Group::new(Uuid::new_v4(), None, "2026-1", 10);
    let err = repo.create_group(&orphan_course).unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound {
            kind: EntityKind::Course,
            ..
        }
    ));

    let course = Course::new("Algebra");
    repo.create_course(&course).unwrap();
    let orphan_teacher = Group::new(course.id, Some(Uuid::new_v4()), "2026-1", 10);
    let err = repo.create_group(&orphan_teacher).unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound {
            kind: EntityKind::Teacher,
            ..
        }
    ));
}

#[test]
fn delete_removes_row_and_reports_missing_ids() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCatalogRepository::try_new(&conn).unwrap();

    let course = Course::new("History");
    repo.create_course(&course).unwrap();
    repo.delete_course(course.id).unwrap();
    assert!(repo.get_course(course.id).unwrap().is_none());

    let err = repo.delete_course(course.id).unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound {
            kind: EntityKind::Course,
            ..
        }
    ));
}

#[test]
fn delete_is_rejected_while_live_records_reference_the_row() {
    let mut conn = open_db_in_memory().unwrap();
    let (student_id, group_id, course_id) = seed_group(&conn, 5);

    {
        let repo = SqliteEnrollmentRepository::try_new(&mut conn).unwrap();
        let mut ledger = EnrollmentService::new(repo, Arc::new(GroupLockRegistry::new()));
        ledger.enroll(student_id, group_id).unwrap();
    }

    let repo = SqliteCatalogRepository::try_new(&conn).unwrap();

    let student_err = repo.delete_student(student_id).unwrap_err();
    assert!(matches!(
        student_err,
        RepoError::StillReferenced {
            kind: EntityKind::Student,
            id,
        } if id == student_id
    ));

    let group_err = repo.delete_group(group_id).unwrap_err();
    assert!(matches!(
        group_err,
        RepoError::StillReferenced {
            kind: EntityKind::Group,
            ..
        }
    ));

    let course_err = repo.delete_course(course_id).unwrap_err();
    assert!(matches!(
        course_err,
        RepoError::StillReferenced {
            kind: EntityKind::Course,
            ..
        }
    ));
}

#[test]
fn repository_rejects_uninitialized_connection() {
    let conn = Connection::open_in_memory().unwrap();

    let result = SqliteCatalogRepository::try_new(&conn);
    match result {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert!(expected_version > 0),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

fn seed_group(conn: &Connection, max_capacity: u32) -> (Uuid, Uuid, Uuid) {
    let repo = SqliteCatalogRepository::try_new(conn).unwrap();

    let student = Student::new("A-9001", "Seed Student", None);
    let course = Course::new("Seed Course");
    repo.create_student(&student).unwrap();
    repo.create_course(&course).unwrap();

    let group = Group::new(course.id, None, "2026-1", max_capacity);
    repo.create_group(&group).unwrap();

    (student.id, group.id, course.id)
}
