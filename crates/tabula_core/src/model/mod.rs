//! Domain model for maps and their owners.
//!
//! # Responsibility
//! - Define the data structures rendering and workflows operate on.
//!
//! # Invariants
//! - Every tabula and user is identified by a stable UUID.
//! - Overlay collections are only mutated through `Tabula` helpers.

pub mod color;
pub mod tabula;
pub mod user;
