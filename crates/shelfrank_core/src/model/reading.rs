//! Reading domain model.
//!
//! # Responsibility
//! - Track one user's relationship to one book (status, rating, finish date).
//! - Provide present-only update semantics for re-imports.
//!
//! # Invariants
//! - At most one reading exists per (user, book) pair.
//! - `rating` is 1..=5 when present; an importer rating of 0 is stored as `None`.
//! - `exclusive_shelf` is an open string, not a closed enum; importers may
//!   supply statuses beyond `read`/`to-read`/`currently-reading`.

use crate::model::book::BookId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Storage-assigned stable identifier for a reading.
pub type ReadingId = i64;

/// Validation failures for reading records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatingOutOfRange(pub i64);

impl Display for RatingOutOfRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "rating {} outside accepted range 1..=5", self.0)
    }
}

impl Error for RatingOutOfRange {}

/// One user's reading record for one book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    pub id: ReadingId,
    pub user_id: String,
    pub book_id: BookId,
    /// Star rating 1..=5; `None` means unrated.
    pub rating: Option<i64>,
    /// Current status shelf, e.g. `read` / `to-read` / `currently-reading`.
    pub exclusive_shelf: Option<String>,
    /// Calendar date the book was finished.
    pub date_read: Option<NaiveDate>,
}

impl Reading {
    pub fn validate(&self) -> Result<(), RatingOutOfRange> {
        match self.rating {
            Some(value) if !(1..=5).contains(&value) => Err(RatingOutOfRange(value)),
            _ => Ok(()),
        }
    }

    /// Overwrites mutable fields from an import row, present values only.
    ///
    /// Absent row values never erase previously stored state.
    pub fn apply_row(
        &mut self,
        shelf: Option<&str>,
        rating: Option<i64>,
        date_read: Option<NaiveDate>,
    ) {
        if let Some(shelf) = shelf {
            self.exclusive_shelf = Some(shelf.to_string());
        }
        if rating.is_some() {
            self.rating = rating;
        }
        if date_read.is_some() {
            self.date_read = date_read;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{RatingOutOfRange, Reading};
    use chrono::NaiveDate;

    fn reading() -> Reading {
        Reading {
            id: 1,
            user_id: "me".to_string(),
            book_id: 7,
            rating: Some(4),
            exclusive_shelf: Some("read".to_string()),
            date_read: NaiveDate::from_ymd_opt(2024, 3, 1),
        }
    }

    #[test]
    fn validate_accepts_in_range_and_unrated() {
        assert!(reading().validate().is_ok());

        let mut unrated = reading();
        unrated.rating = None;
        assert!(unrated.validate().is_ok());
    }

    #[test]
    fn validate_rejects_out_of_range_rating() {
        let mut bad = reading();
        bad.rating = Some(6);
        assert_eq!(bad.validate(), Err(RatingOutOfRange(6)));
    }

    #[test]
    fn apply_row_overwrites_present_fields_only() {
        let mut existing = reading();
        existing.apply_row(Some("to-read"), None, None);

        assert_eq!(existing.exclusive_shelf.as_deref(), Some("to-read"));
        assert_eq!(existing.rating, Some(4));
        assert_eq!(existing.date_read, NaiveDate::from_ymd_opt(2024, 3, 1));
    }
}
