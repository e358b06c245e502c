//! Challenge/response workflows.
//!
//! # Responsibility
//! - Host the generic engine (`engine`), the reusable bounded search with pan
//!   (`search`) and the grid alignment workflow (`alignment`).
//!
//! # Invariants
//! - Workflows never persist opaque state themselves; the session service
//!   does that after a successful response.

pub mod alignment;
pub mod engine;
pub mod search;

pub use alignment::{AlignmentPhase, AlignmentState, AlignmentWorkflow};
pub use engine::{
    is_terminal, Choice, Handlers, OpaqueState, StateName, Transition, Workflow, WorkflowEngine,
    WorkflowMessage, ENTER_STATE, ERROR_STATE, EXIT_STATE,
};
pub use search::{BoundedSearch, Feedback, PanDirection, SearchAxis, SearchCommand, Viewport};

use crate::render::RenderError;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Workflow error classes.
#[derive(Debug)]
pub enum WorkflowError {
    UnknownWorkflow(String),
    DuplicateWorkflow(String),
    UnknownState { workflow: String, state: String },
    NoChallenge { workflow: String, state: String },
    NoResponse { workflow: String, state: String },
    /// Choice id not offered by the state. Input error; state unchanged.
    InvalidChoice { state: String, choice: String },
    /// Choice understood but not acceptable. Input error; state unchanged.
    Rejected(String),
    StateVersion { found: u32, expected: u32 },
    Codec(serde_json::Error),
    /// Opaque state references a user or tabula that no longer resolves.
    Hydration(String),
    Render(RenderError),
    /// Loading workflow inputs failed.
    Storage(RepoError),
    /// Saving a transition's side effects failed; the transition is void.
    Persistence(RepoError),
}

impl WorkflowError {
    /// Whether the error came from user input and leaves state unchanged.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::InvalidChoice { .. } | Self::Rejected(_))
    }
}

impl Display for WorkflowError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownWorkflow(key) => write!(f, "unknown workflow `{key}`"),
            Self::DuplicateWorkflow(key) => write!(f, "workflow `{key}` is already registered"),
            Self::UnknownState { workflow, state } => {
                write!(f, "workflow `{workflow}` has no state `{state}`")
            }
            Self::NoChallenge { workflow, state } => {
                write!(f, "state `{state}` of workflow `{workflow}` has no prompt")
            }
            Self::NoResponse { workflow, state } => {
                write!(f, "state `{state}` of workflow `{workflow}` takes no answers")
            }
            Self::InvalidChoice { state, choice } => {
                write!(f, "`{choice}` is not a valid answer in state `{state}`")
            }
            Self::Rejected(message) => write!(f, "{message}"),
            Self::StateVersion { found, expected } => write!(
                f,
                "saved workflow state has version {found}, expected {expected}; start over"
            ),
            Self::Codec(err) => write!(f, "workflow state is unreadable: {err}"),
            Self::Hydration(message) => write!(f, "{message}"),
            Self::Render(err) => write!(f, "{err}"),
            Self::Storage(err) => write!(f, "could not load workflow data: {err}"),
            Self::Persistence(err) => write!(f, "could not save: {err}"),
        }
    }
}

impl Error for WorkflowError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Codec(err) => Some(err),
            Self::Render(err) => Some(err),
            Self::Storage(err) | Self::Persistence(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RenderError> for WorkflowError {
    fn from(value: RenderError) -> Self {
        Self::Render(value)
    }
}
