//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the narrow data access contract the import and recommendation
//!   services are written against.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Repository writes must enforce model validation before persistence.
//! - Repository APIs return semantic errors (`NotFound`, `Conflict`) in
//!   addition to DB transport errors.

pub mod catalog_repo;
