//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Repository writes must run model `validate()` before SQL mutations.
//! - Repository APIs return semantic errors (`NotFound`, `Busy`, constraint
//!   outcomes) in addition to DB transport errors.
//! - Multi-step writes use immediate transactions so readers never observe
//!   a half-applied protocol.
//!
//! # See also
//! - docs/architecture/concurrency.md

use crate::db::DbError;
use crate::db::migrations::latest_version;
use crate::model::catalog::CatalogValidationError;
use crate::model::EntityKind;
use rusqlite::{Connection, ErrorCode};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod audit_repo;
pub mod catalog_repo;
pub mod enrollment_repo;
pub mod grade_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Model-level validation rejected the write.
    Validation(CatalogValidationError),
    /// Storage transport failure.
    Db(DbError),
    /// The storage layer could not acquire its lock within the busy
    /// timeout; the attempted unit of work did not take effect.
    Busy,
    /// The addressed record does not exist.
    NotFound { kind: EntityKind, id: Uuid },
    /// Another student already holds this enrollment number.
    DuplicateEnrollmentNumber(String),
    /// The record is still referenced by live rows and cannot be deleted.
    StillReferenced { kind: EntityKind, id: Uuid },
    /// Persisted state failed to parse; storage was tampered with or a
    /// migration is missing.
    InvalidData(String),
    /// The connection has not been migrated to the expected schema.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// A required table is missing from the connected database.
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Busy => f.write_str("storage is busy; the operation did not take effect"),
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::DuplicateEnrollmentNumber(number) => {
                write!(f, "enrollment number already in use: `{number}`")
            }
            Self::StillReferenced { kind, id } => {
                write!(f, "{kind} {id} is still referenced by live records")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "required table `{table}` is missing")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CatalogValidationError> for RepoError {
    fn from(value: CatalogValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(inner, _) = &value {
            if matches!(
                inner.code,
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
            ) {
                return Self::Busy;
            }
        }
        Self::Db(DbError::Sqlite(value))
    }
}

/// Returns whether the error is a UNIQUE (or primary key) constraint hit.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(inner, _)
            if inner.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || inner.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

/// Returns whether the error is a FOREIGN KEY constraint hit.
pub(crate) fn is_fk_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(inner, _)
            if inner.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY
    )
}

/// Verifies the connection is migrated and carries the tables a repository
/// depends on. Called by every repository constructor.
pub(crate) fn ensure_connection_ready(
    conn: &Connection,
    required_tables: &[&'static str],
) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in required_tables {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }

    Ok(())
}

/// Parses a TEXT uuid column, rejecting tampered persisted state.
pub(crate) fn parse_uuid(value: &str, context: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {context}")))
}
