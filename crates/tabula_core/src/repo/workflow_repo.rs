//! Per-user workflow state store.
//!
//! One row per `(user, workflow)`; the opaque envelope is stored as a blob and
//! never inspected here.

use super::tabula_repo::parse_uuid;
use super::RepoResult;
use crate::model::user::UserId;
use crate::workflow::OpaqueState;
use rusqlite::{params, Connection};

/// Persisted position of one workflow instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowRecord {
    pub user_id: UserId,
    pub workflow: String,
    pub state: String,
    pub opaque: OpaqueState,
}

/// Repository interface for workflow state.
pub trait WorkflowStateRepository {
    /// Inserts or replaces the record for `(user_id, workflow)`.
    fn save_state(&self, record: &WorkflowRecord) -> RepoResult<()>;
    fn load_state(&self, user: UserId, workflow: &str) -> RepoResult<Option<WorkflowRecord>>;
    /// Returns whether a record existed.
    fn delete_state(&self, user: UserId, workflow: &str) -> RepoResult<bool>;
}

pub struct SqliteWorkflowStateRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteWorkflowStateRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

fn normalize_key(workflow: &str) -> String {
    workflow.trim().to_ascii_lowercase()
}

impl WorkflowStateRepository for SqliteWorkflowStateRepository<'_> {
    fn save_state(&self, record: &WorkflowRecord) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO workflow_states (user_uuid, workflow, state, opaque, updated_at)
             VALUES (?1, ?2, ?3, ?4, (strftime('%s', 'now') * 1000))
             ON CONFLICT(user_uuid, workflow) DO UPDATE SET
                state = excluded.state,
                opaque = excluded.opaque,
                updated_at = excluded.updated_at;",
            params![
                record.user_id.to_string(),
                normalize_key(&record.workflow),
                record.state,
                record.opaque.as_bytes(),
            ],
        )?;
        Ok(())
    }

    fn load_state(&self, user: UserId, workflow: &str) -> RepoResult<Option<WorkflowRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT user_uuid, workflow, state, opaque
             FROM workflow_states
             WHERE user_uuid = ?1 AND workflow = ?2;",
        )?;
        let mut rows = stmt.query(params![user.to_string(), normalize_key(workflow)])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        Ok(Some(WorkflowRecord {
            user_id: parse_uuid(row, "user_uuid")?,
            workflow: row.get("workflow")?,
            state: row.get("state")?,
            opaque: OpaqueState::from_bytes(row.get("opaque")?),
        }))
    }

    fn delete_state(&self, user: UserId, workflow: &str) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM workflow_states WHERE user_uuid = ?1 AND workflow = ?2;",
            params![user.to_string(), normalize_key(workflow)],
        )?;
        Ok(changed > 0)
    }
}
