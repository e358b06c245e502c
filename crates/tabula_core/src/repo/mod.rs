//! Repository layer abstractions and SQLite implementations.
//!
//! # Responsibility
//! - Define use-case oriented persistence contracts (users, tabulas, opaque
//!   workflow state).
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Repository writes validate domain invariants before SQL mutations.
//! - Repository APIs return semantic errors (`NotFound`, `Duplicate`) in
//!   addition to transport errors.

use crate::db::DbError;
use crate::model::tabula::TabulaValidationError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod tabula_repo;
pub mod user_repo;
pub mod workflow_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by every store.
#[derive(Debug)]
pub enum RepoError {
    Validation(TabulaValidationError),
    Db(DbError),
    NotFound { entity: &'static str, id: String },
    Duplicate(String),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Duplicate(what) => write!(f, "{what} already exists"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound { .. } | Self::Duplicate(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<TabulaValidationError> for RepoError {
    fn from(value: TabulaValidationError) -> Self {
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
        Self::Db(DbError::Sqlite(value))
    }
}

fn bool_to_int(value: bool) -> i64 {
    i64::from(value)
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
