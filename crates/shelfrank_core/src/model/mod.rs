//! Catalog domain model.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep one book row per (title, author) natural key across all imports.
//!
//! # Invariants
//! - Book identity is stable once assigned and never reused.
//! - Books and readings are merged by later imports, never deleted by core.

pub mod book;
pub mod reading;
pub mod user;
