//! Catalog repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide stable persistence APIs over `users`/`books`/`readings`.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths must call model `validate()` before SQL mutations.
//! - Read paths must reject invalid persisted state instead of masking it.
//! - Natural-key uniqueness violations surface as `RepoError::Conflict` so
//!   callers can re-query instead of failing the batch.

use crate::db::DbError;
use crate::model::book::{Book, BookId, BookValidationError, NewBook};
use crate::model::reading::{RatingOutOfRange, Reading, ReadingId};
use crate::model::user::User;
use rusqlite::{params, Connection, ErrorCode, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const BOOK_SELECT_SQL: &str = "SELECT
    id,
    title,
    author,
    pages,
    year,
    shelves
FROM books";

const READING_SELECT_SQL: &str = "SELECT
    id,
    user_id,
    book_id,
    rating,
    exclusive_shelf,
    date_read
FROM readings";

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for catalog persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    BookValidation(BookValidationError),
    RatingValidation(RatingOutOfRange),
    Db(DbError),
    BookNotFound(BookId),
    ReadingNotFound(ReadingId),
    /// Uniqueness constraint hit on a write; the row already exists.
    Conflict(String),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BookValidation(err) => write!(f, "{err}"),
            Self::RatingValidation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::BookNotFound(id) => write!(f, "book not found: {id}"),
            Self::ReadingNotFound(id) => write!(f, "reading not found: {id}"),
            Self::Conflict(message) => write!(f, "uniqueness conflict: {message}"),
            Self::InvalidData(message) => write!(f, "invalid persisted catalog data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::BookValidation(err) => Some(err),
            Self::RatingValidation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BookValidationError> for RepoError {
    fn from(value: BookValidationError) -> Self {
        Self::BookValidation(value)
    }
}

impl From<RatingOutOfRange> for RepoError {
    fn from(value: RatingOutOfRange) -> Self {
        Self::RatingValidation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(failure, ref message) = value {
            if failure.code == ErrorCode::ConstraintViolation {
                return Self::Conflict(
                    message
                        .clone()
                        .unwrap_or_else(|| "constraint violation".to_string()),
                );
            }
        }
        Self::Db(DbError::Sqlite(value))
    }
}

/// One to-read candidate joined with its book attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRow {
    pub book_id: BookId,
    pub title: String,
    pub author: String,
    pub pages: Option<i64>,
    pub year: Option<i64>,
}

/// Narrow storage contract for the import and recommendation services.
///
/// Absence semantics matter to callers: lookup methods return `Ok(None)` for
/// missing rows, and the ratings queries omit unrated readings entirely
/// rather than zero-filling.
pub trait CatalogRepository {
    /// Gets or creates the user row, returning the persisted record.
    fn ensure_user(&self, id: &str, name: &str) -> RepoResult<User>;

    /// Looks a book up by its (title, author) natural key, exact match.
    fn find_book_by_title_author(&self, title: &str, author: &str) -> RepoResult<Option<Book>>;

    /// Inserts a book and returns its storage-assigned id.
    ///
    /// A concurrent writer racing on the same natural key yields
    /// `RepoError::Conflict`; callers should re-run the lookup.
    fn create_book(&self, book: &NewBook) -> RepoResult<BookId>;

    /// Persists merged attributes of an existing book.
    fn update_book(&self, book: &Book) -> RepoResult<()>;

    /// Looks a reading up by its (user, book) pair.
    fn find_reading_by_user_book(
        &self,
        user_id: &str,
        book_id: BookId,
    ) -> RepoResult<Option<Reading>>;

    /// Inserts an empty reading for (user, book) and returns it with its id.
    fn create_reading(&self, user_id: &str, book_id: BookId) -> RepoResult<Reading>;

    /// Persists mutable fields of an existing reading.
    fn update_reading(&self, reading: &Reading) -> RepoResult<()>;

    /// Returns `(author, rating)` pairs for the user's rated readings on the
    /// given exclusive shelf.
    fn ratings_by_author_for_user(
        &self,
        user_id: &str,
        shelf: &str,
    ) -> RepoResult<Vec<(String, i64)>>;

    /// Returns `(year, rating)` pairs for the user's rated readings on the
    /// given exclusive shelf, skipping books with unknown year.
    fn ratings_by_year_for_user(&self, user_id: &str, shelf: &str)
        -> RepoResult<Vec<(i64, i64)>>;

    /// Returns the user's `to-read` shelf joined with book attributes.
    fn to_read_candidates_for_user(&self, user_id: &str) -> RepoResult<Vec<CandidateRow>>;
}

/// SQLite-backed catalog repository.
///
/// Works equally over a plain connection or a `rusqlite::Transaction`
/// (which derefs to `Connection`); the import service relies on the latter
/// for batch atomicity.
pub struct SqliteCatalogRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCatalogRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl CatalogRepository for SqliteCatalogRepository<'_> {
    fn ensure_user(&self, id: &str, name: &str) -> RepoResult<User> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM users WHERE id = ?1;")?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(User {
                id: row.get("id")?,
                name: row.get("name")?,
            });
        }

        self.conn.execute(
            "INSERT INTO users (id, name) VALUES (?1, ?2);",
            params![id, name],
        )?;

        Ok(User {
            id: id.to_string(),
            name: name.to_string(),
        })
    }

    fn find_book_by_title_author(&self, title: &str, author: &str) -> RepoResult<Option<Book>> {
        let mut stmt = self.conn.prepare(&format!(
            "{BOOK_SELECT_SQL}
             WHERE title = ?1
               AND author = ?2;"
        ))?;

        let mut rows = stmt.query(params![title, author])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_book_row(row)?));
        }

        Ok(None)
    }

    fn create_book(&self, book: &NewBook) -> RepoResult<BookId> {
        book.validate()?;

        self.conn.execute(
            "INSERT INTO books (title, author, pages, year, shelves)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                book.title.as_str(),
                book.author.as_str(),
                book.pages,
                book.year,
                book.shelves.as_str(),
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn update_book(&self, book: &Book) -> RepoResult<()> {
        book.validate()?;

        let changed = self.conn.execute(
            "UPDATE books
             SET
                pages = ?1,
                year = ?2,
                shelves = ?3
             WHERE id = ?4;",
            params![book.pages, book.year, book.shelves.as_str(), book.id],
        )?;

        if changed == 0 {
            return Err(RepoError::BookNotFound(book.id));
        }

        Ok(())
    }

    fn find_reading_by_user_book(
        &self,
        user_id: &str,
        book_id: BookId,
    ) -> RepoResult<Option<Reading>> {
        let mut stmt = self.conn.prepare(&format!(
            "{READING_SELECT_SQL}
             WHERE user_id = ?1
               AND book_id = ?2;"
        ))?;

        let mut rows = stmt.query(params![user_id, book_id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_reading_row(row)?));
        }

        Ok(None)
    }

    fn create_reading(&self, user_id: &str, book_id: BookId) -> RepoResult<Reading> {
        self.conn.execute(
            "INSERT INTO readings (user_id, book_id) VALUES (?1, ?2);",
            params![user_id, book_id],
        )?;

        Ok(Reading {
            id: self.conn.last_insert_rowid(),
            user_id: user_id.to_string(),
            book_id,
            rating: None,
            exclusive_shelf: None,
            date_read: None,
        })
    }

    fn update_reading(&self, reading: &Reading) -> RepoResult<()> {
        reading.validate()?;

        let changed = self.conn.execute(
            "UPDATE readings
             SET
                rating = ?1,
                exclusive_shelf = ?2,
                date_read = ?3
             WHERE id = ?4;",
            params![
                reading.rating,
                reading.exclusive_shelf.as_deref(),
                reading.date_read,
                reading.id,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::ReadingNotFound(reading.id));
        }

        Ok(())
    }

    fn ratings_by_author_for_user(
        &self,
        user_id: &str,
        shelf: &str,
    ) -> RepoResult<Vec<(String, i64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT b.author, r.rating
             FROM readings r
             INNER JOIN books b ON b.id = r.book_id
             WHERE r.user_id = ?1
               AND r.exclusive_shelf = ?2
               AND r.rating IS NOT NULL
             ORDER BY b.author ASC, b.id ASC;",
        )?;

        let mut rows = stmt.query(params![user_id, shelf])?;
        let mut pairs = Vec::new();
        while let Some(row) = rows.next()? {
            pairs.push((row.get(0)?, row.get(1)?));
        }

        Ok(pairs)
    }

    fn ratings_by_year_for_user(
        &self,
        user_id: &str,
        shelf: &str,
    ) -> RepoResult<Vec<(i64, i64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT b.year, r.rating
             FROM readings r
             INNER JOIN books b ON b.id = r.book_id
             WHERE r.user_id = ?1
               AND r.exclusive_shelf = ?2
               AND r.rating IS NOT NULL
               AND b.year IS NOT NULL
             ORDER BY b.year ASC, b.id ASC;",
        )?;

        let mut rows = stmt.query(params![user_id, shelf])?;
        let mut pairs = Vec::new();
        while let Some(row) = rows.next()? {
            pairs.push((row.get(0)?, row.get(1)?));
        }

        Ok(pairs)
    }

    fn to_read_candidates_for_user(&self, user_id: &str) -> RepoResult<Vec<CandidateRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT b.id, b.title, b.author, b.pages, b.year
             FROM readings r
             INNER JOIN books b ON b.id = r.book_id
             WHERE r.user_id = ?1
               AND r.exclusive_shelf = 'to-read'
             ORDER BY b.id ASC;",
        )?;

        let mut rows = stmt.query([user_id])?;
        let mut candidates = Vec::new();
        while let Some(row) = rows.next()? {
            candidates.push(CandidateRow {
                book_id: row.get(0)?,
                title: row.get(1)?,
                author: row.get(2)?,
                pages: row.get(3)?,
                year: row.get(4)?,
            });
        }

        Ok(candidates)
    }
}

fn parse_book_row(row: &Row<'_>) -> RepoResult<Book> {
    let book = Book {
        id: row.get("id")?,
        title: row.get("title")?,
        author: row.get("author")?,
        pages: row.get("pages")?,
        year: row.get("year")?,
        shelves: row.get("shelves")?,
    };
    book.validate()?;
    Ok(book)
}

fn parse_reading_row(row: &Row<'_>) -> RepoResult<Reading> {
    let reading = Reading {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        book_id: row.get("book_id")?,
        rating: row.get("rating")?,
        exclusive_shelf: row.get("exclusive_shelf")?,
        date_read: row.get("date_read")?,
    };
    reading.validate()?;
    Ok(reading)
}
