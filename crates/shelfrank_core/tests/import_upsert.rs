use rusqlite::Connection;
use shelfrank_core::db::open_db_in_memory;
use shelfrank_core::{
    CatalogRepository, ImportError, ImportService, SqliteCatalogRepository,
};

const HEADER: &str = "Title,Author,My Rating,Number of Pages,Original Publication Year,Exclusive Shelf,Bookshelves,Date Read";

fn csv_of(rows: &[&str]) -> Vec<u8> {
    let mut text = String::from(HEADER);
    for row in rows {
        text.push('\n');
        text.push_str(row);
    }
    text.into_bytes()
}

fn import(conn: &mut Connection, rows: &[&str]) -> shelfrank_core::ImportSummary {
    ImportService::new(conn)
        .import_csv("me", &csv_of(rows))
        .unwrap()
}

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

#[test]
fn first_import_creates_books_and_readings() {
    let mut conn = open_db_in_memory().unwrap();
    let summary = import(
        &mut conn,
        &[
            "Dune,Frank Herbert,5,412,1965,read,sf,2023/07/04",
            "Hyperion,Dan Simmons,4,482,1989,read,sf,2023-08-10",
            "Dune Messiah,Frank Herbert,0,256,1969,to-read,sf,",
        ],
    );

    assert_eq!(summary.books_upserted, 3);
    assert_eq!(summary.readings_upserted, 3);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.total_rows, 3);
    assert_eq!(count(&conn, "books"), 3);
    assert_eq!(count(&conn, "readings"), 3);
}

#[test]
fn reimport_is_idempotent() {
    let rows = [
        "Dune,Frank Herbert,5,412,1965,read,sf,2023/07/04",
        "Hyperion,Dan Simmons,4,482,1989,read,sf,2023-08-10",
    ];
    let mut conn = open_db_in_memory().unwrap();
    import(&mut conn, &rows);

    let snapshot_before = catalog_snapshot(&conn);
    let second = import(&mut conn, &rows);

    assert_eq!(second.books_upserted, 0);
    assert_eq!(second.readings_upserted, 0);
    assert_eq!(second.total_rows, 2);
    assert_eq!(catalog_snapshot(&conn), snapshot_before);
}

#[test]
fn rating_zero_is_stored_as_null() {
    let mut conn = open_db_in_memory().unwrap();
    import(
        &mut conn,
        &["Dune Messiah,Frank Herbert,0,256,1969,to-read,sf,"],
    );

    let repo = SqliteCatalogRepository::new(&conn);
    let book = repo
        .find_book_by_title_author("Dune Messiah", "Frank Herbert")
        .unwrap()
        .unwrap();
    let reading = repo
        .find_reading_by_user_book("me", book.id)
        .unwrap()
        .unwrap();
    assert_eq!(reading.rating, None);
    assert_eq!(reading.exclusive_shelf.as_deref(), Some("to-read"));
}

#[test]
fn merge_is_non_destructive_across_imports() {
    let mut conn = open_db_in_memory().unwrap();
    // Row A knows pages but not year; row B knows year but not pages.
    import(&mut conn, &["Dune,Frank Herbert,5,300,,read,sf,"]);
    import(&mut conn, &["Dune,Frank Herbert,,,2001,read,classics,"]);

    let repo = SqliteCatalogRepository::new(&conn);
    let book = repo
        .find_book_by_title_author("Dune", "Frank Herbert")
        .unwrap()
        .unwrap();
    assert_eq!(book.pages, Some(300));
    assert_eq!(book.year, Some(2001));
    assert_eq!(book.shelf_tags(), vec!["sf", "classics"]);
}

#[test]
fn shelf_tags_are_deduped_across_imports() {
    let mut conn = open_db_in_memory().unwrap();
    import(&mut conn, &["Dune,Frank Herbert,5,412,1965,read,sf,"]);
    import(&mut conn, &["Dune,Frank Herbert,5,412,1965,read,sf,"]);

    let repo = SqliteCatalogRepository::new(&conn);
    let book = repo
        .find_book_by_title_author("Dune", "Frank Herbert")
        .unwrap()
        .unwrap();
    assert_eq!(book.shelves, "sf");
}

#[test]
fn present_fields_overwrite_and_absent_fields_never_erase() {
    let mut conn = open_db_in_memory().unwrap();
    import(
        &mut conn,
        &["Dune,Frank Herbert,3,412,1965,currently-reading,sf,2023/07/04"],
    );
    // Later export: shelf moved to `read`, rating bumped, date column blank.
    import(&mut conn, &["Dune,Frank Herbert,5,412,1965,read,sf,"]);

    let repo = SqliteCatalogRepository::new(&conn);
    let book = repo
        .find_book_by_title_author("Dune", "Frank Herbert")
        .unwrap()
        .unwrap();
    let reading = repo
        .find_reading_by_user_book("me", book.id)
        .unwrap()
        .unwrap();
    assert_eq!(reading.exclusive_shelf.as_deref(), Some("read"));
    assert_eq!(reading.rating, Some(5));
    assert_eq!(
        reading.date_read,
        chrono::NaiveDate::from_ymd_opt(2023, 7, 4)
    );
}

#[test]
fn rows_without_title_or_author_are_skipped() {
    let mut conn = open_db_in_memory().unwrap();
    let summary = import(
        &mut conn,
        &[
            ",Frank Herbert,5,412,1965,read,sf,",
            "Dune,,5,412,1965,read,sf,",
            "   , ,5,412,1965,read,sf,",
            "Hyperion,Dan Simmons,4,482,1989,read,sf,",
        ],
    );

    assert_eq!(summary.skipped, 3);
    assert_eq!(summary.books_upserted, 1);
    assert_eq!(summary.total_rows, 4);
    assert_eq!(count(&conn, "books"), 1);
}

#[test]
fn messy_numeric_cells_are_coerced_not_fatal() {
    let mut conn = open_db_in_memory().unwrap();
    let summary = import(
        &mut conn,
        &[
            "\"War and Peace\",Leo Tolstoy,5,\"1,024\",1869,read,classics,",
            "Dune,Frank Herbert,5,384.0,nan,read,sf,",
            "Hyperion,Dan Simmons,not-a-number,0,1989,read,sf,",
        ],
    );
    assert_eq!(summary.books_upserted, 3);
    assert_eq!(summary.skipped, 0);

    let repo = SqliteCatalogRepository::new(&conn);
    let tolstoy = repo
        .find_book_by_title_author("War and Peace", "Leo Tolstoy")
        .unwrap()
        .unwrap();
    assert_eq!(tolstoy.pages, Some(1024));

    let dune = repo
        .find_book_by_title_author("Dune", "Frank Herbert")
        .unwrap()
        .unwrap();
    assert_eq!(dune.pages, Some(384));
    assert_eq!(dune.year, None);

    let hyperion = repo
        .find_book_by_title_author("Hyperion", "Dan Simmons")
        .unwrap()
        .unwrap();
    assert_eq!(hyperion.pages, None);
    let reading = repo
        .find_reading_by_user_book("me", hyperion.id)
        .unwrap()
        .unwrap();
    assert_eq!(reading.rating, None);
}

#[test]
fn missing_columns_fail_fast_with_no_writes() {
    let mut conn = open_db_in_memory().unwrap();
    let input = b"Title,Author,My Rating,Number of Pages,Original Publication Year,Bookshelves,Date Read\n\
Dune,Frank Herbert,5,412,1965,sf,"
        .to_vec();

    let err = ImportService::new(&mut conn)
        .import_csv("me", &input)
        .unwrap_err();

    match err {
        ImportError::MissingColumns(columns) => {
            assert_eq!(columns, vec!["Exclusive Shelf".to_string()]);
        }
        other => panic!("expected MissingColumns, got {other}"),
    }
    assert_eq!(count(&conn, "users"), 0);
    assert_eq!(count(&conn, "books"), 0);
    assert_eq!(count(&conn, "readings"), 0);
}

#[test]
fn several_missing_columns_are_reported_in_required_order() {
    let mut conn = open_db_in_memory().unwrap();
    // Drops Author, Exclusive Shelf, and Date Read.
    let input = b"Title,My Rating,Number of Pages,Original Publication Year,Bookshelves\n\
Dune,5,412,1965,sf"
        .to_vec();

    let err = ImportService::new(&mut conn)
        .import_csv("me", &input)
        .unwrap_err();

    match err {
        ImportError::MissingColumns(columns) => {
            assert_eq!(
                columns,
                vec![
                    "Author".to_string(),
                    "Exclusive Shelf".to_string(),
                    "Date Read".to_string(),
                ]
            );
        }
        other => panic!("expected MissingColumns, got {other}"),
    }
    assert_eq!(count(&conn, "users"), 0);
    assert_eq!(count(&conn, "books"), 0);
}

#[test]
fn extra_columns_are_ignored() {
    let mut conn = open_db_in_memory().unwrap();
    let input = format!(
        "Book Id,{HEADER},ISBN\n99,Dune,Frank Herbert,5,412,1965,read,sf,2023/07/04,0441013597"
    )
    .into_bytes();

    let summary = ImportService::new(&mut conn)
        .import_csv("me", &input)
        .unwrap();
    assert_eq!(summary.books_upserted, 1);

    let repo = SqliteCatalogRepository::new(&conn);
    let book = repo
        .find_book_by_title_author("Dune", "Frank Herbert")
        .unwrap()
        .unwrap();
    assert_eq!(book.pages, Some(412));
}

fn catalog_snapshot(conn: &Connection) -> Vec<String> {
    let mut rows = Vec::new();
    let mut stmt = conn
        .prepare(
            "SELECT id || '|' || title || '|' || author || '|' ||
                    COALESCE(pages, '-') || '|' || COALESCE(year, '-') || '|' || shelves
             FROM books ORDER BY id;",
        )
        .unwrap();
    let mut book_rows = stmt.query([]).unwrap();
    while let Some(row) = book_rows.next().unwrap() {
        rows.push(row.get(0).unwrap());
    }

    let mut stmt = conn
        .prepare(
            "SELECT id || '|' || user_id || '|' || book_id || '|' ||
                    COALESCE(rating, '-') || '|' || COALESCE(exclusive_shelf, '-') || '|' ||
                    COALESCE(date_read, '-')
             FROM readings ORDER BY id;",
        )
        .unwrap();
    let mut reading_rows = stmt.query([]).unwrap();
    while let Some(row) = reading_rows.next().unwrap() {
        rows.push(row.get(0).unwrap());
    }

    rows
}
