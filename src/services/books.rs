use tracing::info;

use crate::db::BookStore;
use crate::error::{Entity, LibraryError, LibraryResult};
use crate::models::Book;

/// Business rules for the catalogue: unique ISBNs, the borrow/return state
/// machine, and in-memory text search.
pub struct BookService {
    store: BookStore,
}

impl BookService {
    pub fn new(store: BookStore) -> Self {
        Self { store }
    }

    pub fn get_all_books(&self) -> LibraryResult<Vec<Book>> {
        self.store.find_all()
    }

    pub fn get_book_by_id(&self, id: i64) -> LibraryResult<Book> {
        self.store.find_by_id(id)
    }

    /// Persist a new book unless another one already carries its ISBN
    /// (compared case-insensitively). On success the book's id is set.
    pub fn add_book(&self, book: &mut Book) -> LibraryResult<i64> {
        if !self.search_by_isbn(book.isbn())?.is_empty() {
            return Err(LibraryError::Conflict {
                entity: Entity::Book,
                field: "isbn",
                value: book.isbn().to_string(),
            });
        }
        let id = self.store.save(book)?;
        info!(id, isbn = book.isbn(), "book added");
        Ok(id)
    }

    pub fn update_book(&self, book: &Book) -> LibraryResult<()> {
        self.store.update(book)?;
        info!(id = book.id(), "book updated");
        Ok(())
    }

    pub fn delete_book(&self, id: i64) -> LibraryResult<()> {
        self.store.delete(id)?;
        info!(id, "book deleted");
        Ok(())
    }

    pub fn search_by_title(&self, term: &str) -> LibraryResult<Vec<Book>> {
        self.filter_books(|book| contains_ignore_case(book.title(), term))
    }

    pub fn search_by_author(&self, term: &str) -> LibraryResult<Vec<Book>> {
        self.filter_books(|book| contains_ignore_case(book.author(), term))
    }

    /// Exact ISBN match, folding ASCII case only so it agrees with the
    /// `COLLATE NOCASE` unique index.
    pub fn search_by_isbn(&self, isbn: &str) -> LibraryResult<Vec<Book>> {
        let wanted = isbn.trim();
        self.filter_books(|book| book.isbn().eq_ignore_ascii_case(wanted))
    }

    pub fn isbn_exists(&self, isbn: &str) -> LibraryResult<bool> {
        self.store.isbn_exists(isbn)
    }

    /// Available -> Borrowed. `user_id` identifies the borrower but no loan
    /// record is kept; it only shows up in the log.
    pub fn borrow_book(&self, book_id: i64, user_id: i64) -> LibraryResult<Book> {
        let mut book = self.store.find_by_id(book_id)?;
        book.mark_borrowed()?;
        self.store.update(&book)?;
        info!(book_id, user_id, "book borrowed");
        Ok(book)
    }

    /// Borrowed -> Available.
    pub fn return_book(&self, book_id: i64) -> LibraryResult<Book> {
        let mut book = self.store.find_by_id(book_id)?;
        book.mark_returned()?;
        self.store.update(&book)?;
        info!(book_id, "book returned");
        Ok(book)
    }

    // Search runs over the full table in memory; fine for a single library.
    fn filter_books<P>(&self, predicate: P) -> LibraryResult<Vec<Book>>
    where
        P: Fn(&Book) -> bool,
    {
        Ok(self
            .store
            .find_all()?
            .into_iter()
            .filter(|book| predicate(book))
            .collect())
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use rstest::{fixture, rstest};

    use super::*;
    use crate::db::{Database, DbTarget};
    use crate::models::Availability;

    #[fixture]
    fn service() -> BookService {
        let db = Rc::new(Database::open(DbTarget::Memory).unwrap());
        BookService::new(BookStore::new(db).unwrap())
    }

    fn add(service: &BookService, title: &str, author: &str, isbn: &str) -> Book {
        let mut book = Book::new(title, author, isbn, 1900).unwrap();
        service.add_book(&mut book).unwrap();
        book
    }

    #[rstest]
    fn duplicate_isbn_is_rejected_without_writing(service: BookService) {
        add(&service, "Original", "A", "978-ABC");

        let mut dup = Book::new("Copy", "B", "978-abc", 2000).unwrap();
        let err = service.add_book(&mut dup).unwrap_err();

        assert!(matches!(err, LibraryError::Conflict { field: "isbn", .. }));
        assert_eq!(dup.id(), 0);
        assert_eq!(service.get_all_books().unwrap().len(), 1);
    }

    #[rstest]
    fn title_search_is_case_insensitive_substring(service: BookService) {
        add(&service, "War and Peace", "Tolstoy", "1");
        add(&service, "Warlock", "Hall", "2");
        add(&service, "Peace", "Someone", "3");

        let titles: Vec<_> = service
            .search_by_title("war")
            .unwrap()
            .into_iter()
            .map(|b| b.title().to_string())
            .collect();
        assert_eq!(titles, ["War and Peace", "Warlock"]);
    }

    #[rstest]
    #[case("tolstoy", 1)]
    #[case("O", 2)]
    #[case("", 3)]
    #[case("nobody", 0)]
    fn author_search_counts(service: BookService, #[case] term: &str, #[case] expected: usize) {
        add(&service, "War and Peace", "Leo Tolstoy", "1");
        add(&service, "1984", "George Orwell", "2");
        add(&service, "Emma", "Jane Austen", "3");

        assert_eq!(service.search_by_author(term).unwrap().len(), expected);
    }

    #[rstest]
    fn isbn_search_is_exact(service: BookService) {
        add(&service, "One", "A", "978-1");
        add(&service, "Two", "A", "978-10");

        let found = service.search_by_isbn("978-1").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title(), "One");
        assert!(service.isbn_exists("978-10").unwrap());
    }

    #[rstest]
    fn borrow_and_return_walk_the_state_machine(service: BookService) {
        let book = add(&service, "1984", "Orwell", "978-1");

        let borrowed = service.borrow_book(book.id(), 7).unwrap();
        assert_eq!(borrowed.availability(), Availability::Borrowed);
        assert!(!service.get_book_by_id(book.id()).unwrap().is_available());

        let err = service.borrow_book(book.id(), 8).unwrap_err();
        assert!(matches!(err, LibraryError::InvalidState { reason: "already borrowed", .. }));
        assert!(!service.get_book_by_id(book.id()).unwrap().is_available());

        service.return_book(book.id()).unwrap();
        assert!(service.get_book_by_id(book.id()).unwrap().is_available());

        let err = service.return_book(book.id()).unwrap_err();
        assert!(matches!(err, LibraryError::InvalidState { reason: "not borrowed", .. }));
    }

    #[rstest]
    fn not_found_keeps_the_book_id(service: BookService) {
        for err in [
            service.get_book_by_id(99).unwrap_err(),
            service.borrow_book(99, 1).unwrap_err(),
            service.return_book(99).unwrap_err(),
            service.delete_book(99).unwrap_err(),
        ] {
            assert!(matches!(
                err,
                LibraryError::NotFound {
                    entity: Entity::Book,
                    key: crate::error::LookupKey::Id(99)
                }
            ));
        }
    }

    #[rstest]
    fn isbn_checks_fold_ascii_case_only(service: BookService) {
        add(&service, "Umlaut", "A", "ÄB-1");

        assert!(service.isbn_exists("äb-1").is_ok_and(|taken| !taken));
        assert!(service.search_by_isbn("äb-1").unwrap().is_empty());
        let other = add(&service, "Lowercase umlaut", "B", "äb-1");
        assert!(other.id() > 0);

        add(&service, "Plain", "C", "xy-9");
        assert!(service.isbn_exists("XY-9").unwrap());
        assert_eq!(service.search_by_isbn("XY-9").unwrap().len(), 1);
        let mut dup = Book::new("Shouting", "D", "XY-9", 2000).unwrap();
        assert!(matches!(
            service.add_book(&mut dup),
            Err(LibraryError::Conflict { field: "isbn", .. })
        ));
    }

    #[rstest]
    fn update_book_persists_field_edits(service: BookService) {
        let mut book = add(&service, "Dune", "Herbert", "978-0441");

        book.set_title("Dune Messiah").unwrap();
        book.set_publication_year(1969).unwrap();
        service.update_book(&book).unwrap();

        let reloaded = service.get_book_by_id(book.id()).unwrap();
        assert_eq!(reloaded.title(), "Dune Messiah");
        assert_eq!(reloaded.publication_year(), 1969);
        assert!(reloaded.is_available());
    }

    #[rstest]
    fn update_book_of_missing_id_is_not_found(service: BookService) {
        let existing = add(&service, "Dune", "Herbert", "978-0441");
        let mut ghost = Book::new("Ghost", "Nobody", "000", 2000).unwrap();
        ghost.assign_id(existing.id() + 100);

        let err = service.update_book(&ghost).unwrap_err();
        assert!(matches!(
            err,
            LibraryError::NotFound {
                entity: Entity::Book,
                key: crate::error::LookupKey::Id(id)
            } if id == existing.id() + 100
        ));
        assert_eq!(service.get_all_books().unwrap(), vec![existing]);
    }

    #[rstest]
    fn update_book_to_taken_isbn_conflicts(service: BookService) {
        let first = add(&service, "Dune", "Herbert", "978-0441");
        let second = add(&service, "Emma", "Austen", "978-0141");

        let mut edited = second.clone();
        edited.set_isbn("978-0441").unwrap();
        edited.set_title("Emma (renamed)").unwrap();
        let err = service.update_book(&edited).unwrap_err();

        assert!(matches!(
            err,
            LibraryError::Conflict { entity: Entity::Book, field: "isbn", .. }
        ));
        assert_eq!(service.get_book_by_id(first.id()).unwrap(), first);
        assert_eq!(service.get_book_by_id(second.id()).unwrap(), second);
    }
}
