use std::rc::Rc;

use library_manager::{
    Book, BookService, BookStore, Database, DbTarget, LibraryError, User, UserService, UserStore,
};
use rstest::{fixture, rstest};

struct Library {
    db: Rc<Database>,
    books: BookService,
    users: UserService,
}

#[fixture]
fn library() -> Library {
    let db = Rc::new(Database::open(DbTarget::Memory).unwrap());
    let books = BookService::new(BookStore::new(Rc::clone(&db)).unwrap());
    let users = UserService::new(UserStore::new(Rc::clone(&db)).unwrap());
    Library { db, books, users }
}

#[rstest]
fn book_lifecycle(library: Library) {
    let books = &library.books;
    let mut book = Book::new("1984", "George Orwell", "978-0451524935", 1949).unwrap();

    let id = books.add_book(&mut book).unwrap();
    assert_eq!(id, 1);
    assert_eq!(book.id(), 1);
    assert!(books.get_book_by_id(id).unwrap().is_available());

    let lent = books.borrow_book(id, 7).unwrap();
    assert!(!lent.is_available());
    assert!(!books.get_book_by_id(id).unwrap().is_available());
    assert!(matches!(
        books.borrow_book(id, 8),
        Err(LibraryError::InvalidState { book_id: 1, .. })
    ));

    let returned = books.return_book(id).unwrap();
    assert!(returned.is_available());
    assert!(matches!(
        books.return_book(id),
        Err(LibraryError::InvalidState { .. })
    ));

    books.delete_book(id).unwrap();
    assert!(books.get_book_by_id(id).unwrap_err().is_not_found());
    assert!(books.delete_book(id).unwrap_err().is_not_found());
}

#[rstest]
fn duplicate_isbn_is_rejected_case_insensitively(library: Library) {
    let books = &library.books;
    books
        .add_book(&mut Book::new("Dune", "Frank Herbert", "978-0441x", 1965).unwrap())
        .unwrap();

    let mut copy = Book::new("Dune (reprint)", "Frank Herbert", "978-0441X", 1990).unwrap();
    assert!(matches!(
        books.add_book(&mut copy),
        Err(LibraryError::Conflict { field: "isbn", .. })
    ));
    assert_eq!(books.get_all_books().unwrap().len(), 1);
    assert!(books.isbn_exists(" 978-0441X ").unwrap());
}

#[rstest]
fn user_lifecycle(library: Library) {
    let users = &library.users;
    let mut ann = User::new("Ann", "ann@example.org");
    let id = users.add_user(&mut ann).unwrap();
    assert_eq!(ann.id, id);

    let mut twin = User::new("Other Ann", "ann@example.org");
    assert!(matches!(
        users.add_user(&mut twin),
        Err(LibraryError::Conflict { field: "email", .. })
    ));

    ann.name = "Ann Lee".to_string();
    users.update_user(&ann).unwrap();
    assert_eq!(users.get_user_by_email("ann@example.org").unwrap().name, "Ann Lee");

    users.delete_user(id).unwrap();
    assert!(users.get_user_by_id(id).unwrap_err().is_not_found());
    assert!(users
        .get_user_by_email("ann@example.org")
        .unwrap_err()
        .is_not_found());
}

#[rstest]
fn file_database_survives_close_and_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("library.sqlite");

    {
        let db = Rc::new(Database::open(DbTarget::File(path.clone())).unwrap());
        let books = BookService::new(BookStore::new(Rc::clone(&db)).unwrap());
        books
            .add_book(&mut Book::new("Emma", "Jane Austen", "111", 1815).unwrap())
            .unwrap();
        books.borrow_book(1, 3).unwrap();
        db.close().unwrap();
    }

    let db = Rc::new(Database::open(DbTarget::File(path)).unwrap());
    let books = BookService::new(BookStore::new(db).unwrap());
    let emma = books.get_book_by_id(1).unwrap();
    assert_eq!(emma.title(), "Emma");
    assert!(!emma.is_available());
}

#[rstest]
fn closed_database_reconnects_on_next_call(library: Library) {
    library.db.close().unwrap();
    assert!(!library.db.is_connected());

    // A fresh in-memory database comes back with the schema in place.
    assert!(library.books.get_all_books().unwrap().is_empty());
    assert!(library.db.is_connected());
}
