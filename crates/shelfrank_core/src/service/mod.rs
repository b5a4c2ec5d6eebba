//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate normalizer, repository, and scoring calls into use-case
//!   level APIs.
//! - Keep CLI/transport layers decoupled from storage details.

pub mod import_service;
pub mod profile_service;
pub mod recommend_service;
