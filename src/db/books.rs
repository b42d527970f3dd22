use std::rc::Rc;

use rusqlite::{params, Connection, Error as SqlError, ErrorCode, Row};
use tracing::debug;

use crate::error::{Entity, LibraryError, LibraryResult, StorageContext};
use crate::models::Book;

use super::connection::{ensure_books_table, Database};

const BOOK_COLUMNS: &str = "id, title, author, isbn, publication_year, available";

/// CRUD access to the `books` table over the shared connection.
pub struct BookStore {
    db: Rc<Database>,
}

impl BookStore {
    /// Attach to the shared database, creating the `books` table if needed.
    pub fn new(db: Rc<Database>) -> LibraryResult<Self> {
        db.with_connection(ensure_books_table)?;
        Ok(Self { db })
    }

    /// Every book in insertion order.
    pub fn find_all(&self) -> LibraryResult<Vec<Book>> {
        self.db.with_connection(|conn| {
            let mut stmt = conn
                .prepare(&format!("SELECT {BOOK_COLUMNS} FROM books ORDER BY id"))
                .context("failed to prepare book query")?;

            let books = stmt
                .query_map([], book_from_row)
                .context("failed to load books")?
                .collect::<Result<Vec<_>, _>>()
                .context("failed to collect books")?;

            debug!(count = books.len(), "loaded books");
            Ok(books)
        })
    }

    pub fn find_by_id(&self, id: i64) -> LibraryResult<Book> {
        self.db.with_connection(|conn| fetch_book(conn, id))
    }

    /// Insert a new row and write the generated id back onto `book`.
    pub fn save(&self, book: &mut Book) -> LibraryResult<i64> {
        let id = self.db.with_connection(|conn| {
            conn.execute(
                "INSERT INTO books (title, author, isbn, publication_year, available)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    book.title(),
                    book.author(),
                    book.isbn(),
                    book.publication_year(),
                    book.is_available()
                ],
            )
            .map_err(|err| map_isbn_constraint(err, book.isbn()))?;
            Ok(conn.last_insert_rowid())
        })?;

        book.assign_id(id);
        debug!(id, isbn = book.isbn(), "inserted book");
        Ok(id)
    }

    /// Overwrite every mutable column of the row matching `book.id()`.
    pub fn update(&self, book: &Book) -> LibraryResult<()> {
        let updated = self.db.with_connection(|conn| {
            conn.execute(
                "UPDATE books
                 SET title = ?1, author = ?2, isbn = ?3, publication_year = ?4, available = ?5
                 WHERE id = ?6",
                params![
                    book.title(),
                    book.author(),
                    book.isbn(),
                    book.publication_year(),
                    book.is_available(),
                    book.id()
                ],
            )
            .map_err(|err| map_isbn_constraint(err, book.isbn()))
        })?;

        if updated == 0 {
            Err(LibraryError::not_found_id(Entity::Book, book.id()))
        } else {
            Ok(())
        }
    }

    pub fn delete(&self, id: i64) -> LibraryResult<()> {
        let deleted = self.db.with_connection(|conn| {
            conn.execute("DELETE FROM books WHERE id = ?1", params![id])
                .context("failed to delete book")
        })?;

        if deleted == 0 {
            Err(LibraryError::not_found_id(Entity::Book, id))
        } else {
            Ok(())
        }
    }

    /// Whether any book already carries `isbn` (case-insensitive). A storage
    /// failure is reported as an error, never as "no match".
    pub fn isbn_exists(&self, isbn: &str) -> LibraryResult<bool> {
        self.db.with_connection(|conn| {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM books WHERE isbn = ?1)",
                params![isbn.trim()],
                |row| row.get(0),
            )
            .context("failed to check isbn")
        })
    }
}

fn fetch_book(conn: &Connection, id: i64) -> LibraryResult<Book> {
    let mut stmt = conn
        .prepare(&format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = ?1"))
        .context("failed to prepare book lookup")?;

    let mut rows = stmt
        .query_map(params![id], book_from_row)
        .context("failed to look up book")?;

    match rows.next() {
        Some(book) => book.context("failed to read book row"),
        None => Err(LibraryError::not_found_id(Entity::Book, id)),
    }
}

fn book_from_row(row: &Row<'_>) -> rusqlite::Result<Book> {
    Ok(Book::from_row(
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

/// The only constraint a validated book can trip is the unique ISBN.
fn map_isbn_constraint(err: SqlError, isbn: &str) -> LibraryError {
    if matches!(err.sqlite_error_code(), Some(ErrorCode::ConstraintViolation)) {
        LibraryError::Conflict {
            entity: Entity::Book,
            field: "isbn",
            value: isbn.to_string(),
        }
    } else {
        LibraryError::Storage {
            context: "failed to write book".to_string(),
            source: Box::new(err),
        }
    }
}
