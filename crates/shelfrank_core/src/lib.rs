//! Core domain logic for ShelfRank.
//! This crate is the single source of truth for catalog and scoring invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod normalize;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::book::{Book, BookId, BookValidationError, NewBook};
pub use model::reading::{Reading, ReadingId};
pub use model::user::User;
pub use repo::catalog_repo::{
    CandidateRow, CatalogRepository, RepoError, RepoResult, SqliteCatalogRepository,
};
pub use service::import_service::{ImportError, ImportService, ImportSummary, REQUIRED_COLUMNS};
pub use service::profile_service::{build_profile, PreferenceProfile};
pub use service::recommend_service::{
    RecommendParams, RecommendService, Recommendation, ScoreExplain, ScoredCandidate,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
