//! User repository contracts and SQLite implementation.

use super::tabula_repo::parse_uuid;
use super::{is_constraint_violation, RepoError, RepoResult};
use crate::model::user::{User, UserId};
use rusqlite::{params, Connection, Row};

/// Repository interface for users.
pub trait UserRepository {
    fn create_user(&self, user: &User) -> RepoResult<UserId>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    fn find_user_by_handle(&self, handle: &str) -> RepoResult<Option<User>>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query_one(&self, sql: &str, value: String) -> RepoResult<Option<User>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([value])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_user_row(row)?)),
            None => Ok(None),
        }
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, user: &User) -> RepoResult<UserId> {
        let handle = user.handle.trim();
        if handle.is_empty() {
            return Err(RepoError::InvalidData("user handle cannot be empty".to_string()));
        }

        self.conn
            .execute(
                "INSERT INTO users (uuid, handle) VALUES (?1, ?2);",
                params![user.id.to_string(), handle],
            )
            .map_err(|err| {
                if is_constraint_violation(&err) {
                    RepoError::Duplicate(format!("user `{handle}`"))
                } else {
                    err.into()
                }
            })?;
        Ok(user.id)
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        self.query_one(
            "SELECT uuid, handle FROM users WHERE uuid = ?1;",
            id.to_string(),
        )
    }

    fn find_user_by_handle(&self, handle: &str) -> RepoResult<Option<User>> {
        self.query_one(
            "SELECT uuid, handle FROM users WHERE handle = ?1;",
            handle.trim().to_string(),
        )
    }
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    Ok(User {
        id: parse_uuid(row, "uuid")?,
        handle: row.get("handle")?,
    })
}
