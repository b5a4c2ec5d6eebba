//! Book domain model.
//!
//! # Responsibility
//! - Define the canonical catalog record deduplicated by (title, author).
//! - Provide non-destructive merge helpers used by the import upsert path.
//!
//! # Invariants
//! - `id` is assigned by storage and immutable once created.
//! - `title` and `author` are non-blank; together they form the natural key.
//! - Merging never regresses a known `pages`/`year` value back to `None`.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Storage-assigned stable identifier for a book.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type BookId = i64;

/// Validation failures for book records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookValidationError {
    /// Title is empty after trimming.
    BlankTitle,
    /// Author is empty after trimming.
    BlankAuthor,
}

impl Display for BookValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankTitle => write!(f, "book title must not be blank"),
            Self::BlankAuthor => write!(f, "book author must not be blank"),
        }
    }
}

impl Error for BookValidationError {}

/// Book attributes as known before storage assigns an id.
///
/// Used by import paths where the natural key may or may not already exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    /// Page count; `None` means unknown (0 in source data is coerced to unknown).
    pub pages: Option<i64>,
    /// Original publication year; `None` means unknown.
    pub year: Option<i64>,
    /// Comma-joined accumulated shelf tag string, empty when absent.
    pub shelves: String,
}

impl NewBook {
    pub fn validate(&self) -> Result<(), BookValidationError> {
        if self.title.trim().is_empty() {
            return Err(BookValidationError::BlankTitle);
        }
        if self.author.trim().is_empty() {
            return Err(BookValidationError::BlankAuthor);
        }
        Ok(())
    }
}

/// Canonical persisted book record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    /// Stable storage-assigned id, referenced by readings.
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub pages: Option<i64>,
    pub year: Option<i64>,
    /// Comma-joined accumulated shelf tag string, empty when absent.
    pub shelves: String,
}

impl Book {
    pub fn validate(&self) -> Result<(), BookValidationError> {
        if self.title.trim().is_empty() {
            return Err(BookValidationError::BlankTitle);
        }
        if self.author.trim().is_empty() {
            return Err(BookValidationError::BlankAuthor);
        }
        Ok(())
    }

    /// Returns the accumulated shelf tags as a set-like view.
    pub fn shelf_tags(&self) -> Vec<&str> {
        self.shelves
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .collect()
    }

    /// Merges attributes from a later import row, non-destructively.
    ///
    /// Returns `true` when any field changed.
    ///
    /// # Contract
    /// - `pages`/`year` are adopted only when currently unknown.
    /// - The incoming shelf-tag string is appended only when not already
    ///   contained in the accumulated string (exact substring containment,
    ///   matching importer convention, not per-tag set equality).
    pub fn merge_from(&mut self, incoming: &NewBook) -> bool {
        let mut changed = false;

        if self.pages.is_none() && incoming.pages.is_some() {
            self.pages = incoming.pages;
            changed = true;
        }
        if self.year.is_none() && incoming.year.is_some() {
            self.year = incoming.year;
            changed = true;
        }
        if !incoming.shelves.is_empty() && !self.shelves.contains(incoming.shelves.as_str()) {
            if !self.shelves.is_empty() {
                self.shelves.push(',');
            }
            self.shelves.push_str(&incoming.shelves);
            changed = true;
        }

        changed
    }
}
