//! Workflow session service.
//!
//! # Responsibility
//! - Bind the engine to the per-user state store: start, answer, re-show.
//!
//! # Invariants
//! - Opaque state is written only after a response succeeded, so a failed
//!   response (input, render or persistence error) leaves the stored
//!   instance exactly as it was and can be retried.
//! - Finished instances (`exit`, `error`) accept no further responses.

use crate::model::user::UserId;
use crate::repo::workflow_repo::{WorkflowRecord, WorkflowStateRepository};
use crate::repo::RepoError;
use crate::workflow::{is_terminal, WorkflowEngine, WorkflowError, WorkflowMessage};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum SessionError {
    NotStarted { workflow: String },
    Finished { workflow: String, state: String },
    Workflow(WorkflowError),
    Store(RepoError),
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotStarted { workflow } => write!(f, "no `{workflow}` in progress"),
            Self::Finished { workflow, state } => {
                write!(f, "`{workflow}` already finished ({state}); start it again")
            }
            Self::Workflow(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "workflow state store failed: {err}"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Workflow(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<WorkflowError> for SessionError {
    fn from(value: WorkflowError) -> Self {
        Self::Workflow(value)
    }
}

impl From<RepoError> for SessionError {
    fn from(value: RepoError) -> Self {
        Self::Store(value)
    }
}

/// Result of one interaction: where the instance is now and what to show.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReply {
    pub state: String,
    pub message: WorkflowMessage,
}

impl SessionReply {
    pub fn is_finished(&self) -> bool {
        is_terminal(&self.state)
    }
}

/// Drives workflows for users against a state store.
pub struct WorkflowSession<'e, 'a, S: WorkflowStateRepository> {
    engine: &'e WorkflowEngine<'a>,
    states: S,
}

impl<'e, 'a, S: WorkflowStateRepository> WorkflowSession<'e, 'a, S> {
    pub fn new(engine: &'e WorkflowEngine<'a>, states: S) -> Self {
        Self { engine, states }
    }

    /// Starts (or restarts) `workflow` for `user`, answering `enter` with `choice`.
    pub fn start(
        &self,
        user: UserId,
        workflow: &str,
        choice: &str,
    ) -> Result<SessionReply, SessionError> {
        let (state, opaque) = self.engine.start(workflow, user, choice)?;
        self.commit(WorkflowRecord {
            user_id: user,
            workflow: workflow.to_string(),
            state,
            opaque,
        })
    }

    /// Answers the current challenge of `user`'s instance.
    pub fn respond(
        &self,
        user: UserId,
        workflow: &str,
        choice: &str,
    ) -> Result<SessionReply, SessionError> {
        let record = self.load_active(user, workflow)?;
        let (state, opaque) =
            match self
                .engine
                .response(workflow, &record.state, &record.opaque, choice)
            {
                Ok(next) => next,
                Err(err) => {
                    warn!(
                        "event=workflow_response module=session status=error workflow={workflow} state={} user={user} error={err}",
                        record.state
                    );
                    return Err(err.into());
                }
            };
        self.commit(WorkflowRecord {
            state,
            opaque,
            ..record
        })
    }

    /// Re-renders the current challenge without changing anything.
    pub fn current(&self, user: UserId, workflow: &str) -> Result<SessionReply, SessionError> {
        let record = self.load(user, workflow)?;
        let message = self
            .engine
            .challenge(workflow, &record.state, &record.opaque);
        Ok(SessionReply {
            state: record.state,
            message,
        })
    }

    /// Drops `user`'s instance; returns whether one existed.
    pub fn abandon(&self, user: UserId, workflow: &str) -> Result<bool, SessionError> {
        Ok(self.states.delete_state(user, workflow)?)
    }

    fn load(&self, user: UserId, workflow: &str) -> Result<WorkflowRecord, SessionError> {
        self.states
            .load_state(user, workflow)?
            .ok_or_else(|| SessionError::NotStarted {
                workflow: workflow.to_string(),
            })
    }

    fn load_active(&self, user: UserId, workflow: &str) -> Result<WorkflowRecord, SessionError> {
        let record = self.load(user, workflow)?;
        if is_terminal(&record.state) {
            return Err(SessionError::Finished {
                workflow: workflow.to_string(),
                state: record.state,
            });
        }
        Ok(record)
    }

    fn commit(&self, record: WorkflowRecord) -> Result<SessionReply, SessionError> {
        self.states.save_state(&record)?;
        info!(
            "event=workflow_commit module=session status=ok workflow={} state={} user={}",
            record.workflow, record.state, record.user_id
        );
        let message = self
            .engine
            .challenge(&record.workflow, &record.state, &record.opaque);
        Ok(SessionReply {
            state: record.state,
            message,
        })
    }
}
