//! Core of Tabula: grid-calibrated battle maps.
//! Rendering, storage and the interactive alignment workflow live here; hosts
//! (the CLI, chat bots) only deliver messages and images.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod raster;
pub mod render;
pub mod repo;
pub mod service;
pub mod workflow;

pub use config::{ConfigError, CoreConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::color::Color;
pub use model::tabula::{GridPoint, Mask, Tabula, TabulaId, Token};
pub use model::user::{User, UserId};
pub use render::{Compositor, DirectoryGlyphResolver, GlyphResolver, NoGlyphs, RenderError};
pub use repo::tabula_repo::{SqliteTabulaRepository, TabulaRepository};
pub use repo::user_repo::{SqliteUserRepository, UserRepository};
pub use repo::workflow_repo::{SqliteWorkflowStateRepository, WorkflowStateRepository};
pub use repo::{RepoError, RepoResult};
pub use service::tabula_service::{MaskSpec, TabulaService, TabulaServiceError};
pub use service::workflow_session::{SessionError, SessionReply, WorkflowSession};
pub use workflow::{AlignmentWorkflow, WorkflowEngine, WorkflowError, WorkflowMessage};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
