//! Domain models that mirror the SQLite schema and get passed between the
//! stores, the services, and the terminal UI. `Book` guards its own fields so
//! an invalid title or year can never reach storage; `User` is a plain data
//! holder.

use std::fmt;

use crate::error::{LibraryError, LibraryResult};

/// The two states of a book's availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Available,
    Borrowed,
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Availability::Available => write!(f, "available"),
            Availability::Borrowed => write!(f, "borrowed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A catalogued book. Fields are private so every mutation goes through a
/// validating setter, and availability only changes through borrow/return.
pub struct Book {
    /// Primary key from the database, `0` until the book has been saved.
    id: i64,
    title: String,
    author: String,
    isbn: String,
    publication_year: i32,
    available: bool,
}

impl Book {
    /// Build a new, unsaved book. Text fields are trimmed and must not be
    /// empty; the publication year must be positive.
    pub fn new(title: &str, author: &str, isbn: &str, publication_year: i32) -> LibraryResult<Self> {
        Ok(Self {
            id: 0,
            title: required_text("title", title)?,
            author: required_text("author", author)?,
            isbn: required_text("isbn", isbn)?,
            publication_year: positive_year(publication_year)?,
            available: true,
        })
    }

    /// Rebuild a book from a stored row. Stored data was validated on the way
    /// in, so no checks run here.
    pub(crate) fn from_row(
        id: i64,
        title: String,
        author: String,
        isbn: String,
        publication_year: i32,
        available: bool,
    ) -> Self {
        Self {
            id,
            title,
            author,
            isbn,
            publication_year,
            available,
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn isbn(&self) -> &str {
        &self.isbn
    }

    pub fn publication_year(&self) -> i32 {
        self.publication_year
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn availability(&self) -> Availability {
        if self.available {
            Availability::Available
        } else {
            Availability::Borrowed
        }
    }

    pub fn set_title(&mut self, title: &str) -> LibraryResult<()> {
        self.title = required_text("title", title)?;
        Ok(())
    }

    pub fn set_author(&mut self, author: &str) -> LibraryResult<()> {
        self.author = required_text("author", author)?;
        Ok(())
    }

    pub fn set_isbn(&mut self, isbn: &str) -> LibraryResult<()> {
        self.isbn = required_text("isbn", isbn)?;
        Ok(())
    }

    pub fn set_publication_year(&mut self, year: i32) -> LibraryResult<()> {
        self.publication_year = positive_year(year)?;
        Ok(())
    }

    pub(crate) fn assign_id(&mut self, id: i64) {
        self.id = id;
    }

    /// Available -> Borrowed. Fails without touching the book if it is
    /// already out.
    pub(crate) fn mark_borrowed(&mut self) -> LibraryResult<()> {
        if !self.available {
            return Err(LibraryError::InvalidState {
                book_id: self.id,
                reason: "already borrowed",
            });
        }
        self.available = false;
        Ok(())
    }

    /// Borrowed -> Available.
    pub(crate) fn mark_returned(&mut self) -> LibraryResult<()> {
        if self.available {
            return Err(LibraryError::InvalidState {
                book_id: self.id,
                reason: "not borrowed",
            });
        }
        self.available = true;
        Ok(())
    }

    /// `Title - Author (Year)`, used by list views and status messages.
    pub fn display_title(&self) -> String {
        format!("{} - {} ({})", self.title, self.author, self.publication_year)
    }
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A library patron. Email format is checked by whoever collects the input.
pub struct User {
    /// Primary key from the SQLite store, `0` until saved.
    pub id: i64,
    pub name: String,
    /// Unique across users; the schema enforces it.
    pub email: String,
}

impl User {
    /// Build an unsaved user.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            email: email.into(),
        }
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

fn required_text(field: &'static str, value: &str) -> LibraryResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LibraryError::Validation {
            field,
            reason: "must not be empty",
        });
    }
    Ok(trimmed.to_string())
}

fn positive_year(year: i32) -> LibraryResult<i32> {
    if year <= 0 {
        return Err(LibraryError::Validation {
            field: "publication year",
            reason: "must be a positive number",
        });
    }
    Ok(year)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn new_book_is_trimmed_and_available() {
        let book = Book::new("  War and Peace ", " Tolstoy", "978-0 ", 1869).unwrap();

        assert_eq!(book.id(), 0);
        assert_eq!(book.title(), "War and Peace");
        assert_eq!(book.author(), "Tolstoy");
        assert_eq!(book.isbn(), "978-0");
        assert!(book.is_available());
        assert_eq!(book.availability(), Availability::Available);
    }

    #[rstest]
    #[case("", "Orwell", "978-1", 1949, "title")]
    #[case("1984", "   ", "978-1", 1949, "author")]
    #[case("1984", "Orwell", "\t", 1949, "isbn")]
    #[case("1984", "Orwell", "978-1", 0, "publication year")]
    #[case("1984", "Orwell", "978-1", -5, "publication year")]
    fn invalid_books_are_rejected(
        #[case] title: &str,
        #[case] author: &str,
        #[case] isbn: &str,
        #[case] year: i32,
        #[case] expected_field: &str,
    ) {
        match Book::new(title, author, isbn, year) {
            Err(LibraryError::Validation { field, .. }) => assert_eq!(field, expected_field),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn failed_setter_leaves_book_unchanged() {
        let mut book = Book::new("1984", "Orwell", "978-1", 1949).unwrap();

        assert!(book.set_title("  ").is_err());
        assert!(book.set_publication_year(-1).is_err());
        assert_eq!(book.title(), "1984");
        assert_eq!(book.publication_year(), 1949);

        book.set_author(" George Orwell ").unwrap();
        assert_eq!(book.author(), "George Orwell");
    }

    #[test]
    fn availability_transitions() {
        let mut book = Book::new("1984", "Orwell", "978-1", 1949).unwrap();

        book.mark_borrowed().unwrap();
        assert_eq!(book.availability(), Availability::Borrowed);
        assert!(matches!(
            book.mark_borrowed(),
            Err(LibraryError::InvalidState { reason: "already borrowed", .. })
        ));
        assert!(!book.is_available());

        book.mark_returned().unwrap();
        assert!(book.is_available());
        assert!(matches!(
            book.mark_returned(),
            Err(LibraryError::InvalidState { reason: "not borrowed", .. })
        ));
    }
}
