use tracing::info;

use crate::db::UserStore;
use crate::error::LibraryResult;
use crate::models::User;

/// Pass-through access to users. Email uniqueness is left to the schema.
pub struct UserService {
    store: UserStore,
}

impl UserService {
    pub fn new(store: UserStore) -> Self {
        Self { store }
    }

    pub fn get_all_users(&self) -> LibraryResult<Vec<User>> {
        self.store.find_all()
    }

    pub fn get_user_by_id(&self, id: i64) -> LibraryResult<User> {
        self.store.find_by_id(id)
    }

    pub fn get_user_by_email(&self, email: &str) -> LibraryResult<User> {
        self.store.find_by_email(email)
    }

    pub fn add_user(&self, user: &mut User) -> LibraryResult<i64> {
        let id = self.store.save(user)?;
        info!(id, "user added");
        Ok(id)
    }

    pub fn update_user(&self, user: &User) -> LibraryResult<()> {
        self.store.update(user)?;
        info!(id = user.id, "user updated");
        Ok(())
    }

    pub fn delete_user(&self, id: i64) -> LibraryResult<()> {
        self.store.delete(id)?;
        info!(id, "user deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::db::{Database, DbTarget};
    use crate::error::LibraryError;

    #[test]
    fn users_and_books_share_one_database() {
        let db = Rc::new(Database::open(DbTarget::Memory).unwrap());
        let users = UserService::new(UserStore::new(Rc::clone(&db)).unwrap());
        let books = crate::services::BookService::new(
            crate::db::BookStore::new(Rc::clone(&db)).unwrap(),
        );

        let mut ann = User::new("Ann", "ann@example.org");
        users.add_user(&mut ann).unwrap();
        let mut book = crate::models::Book::new("Emma", "Austen", "1", 1815).unwrap();
        books.add_book(&mut book).unwrap();

        db.close().unwrap();

        // in-memory data is gone after a reconnect, but both stores still work
        assert!(users.get_all_users().unwrap().is_empty());
        assert!(books.get_all_books().unwrap().is_empty());
    }

    #[test]
    fn crud_round_trip() {
        let db = Rc::new(Database::open(DbTarget::Memory).unwrap());
        let users = UserService::new(UserStore::new(db).unwrap());

        let mut ann = User::new("Ann", "ann@example.org");
        let id = users.add_user(&mut ann).unwrap();
        assert_eq!(users.get_user_by_email("ann@example.org").unwrap().id, id);

        ann.email = "ann@library.org".to_string();
        users.update_user(&ann).unwrap();
        assert_eq!(users.get_user_by_id(id).unwrap().email, "ann@library.org");

        users.delete_user(id).unwrap();
        assert!(matches!(
            users.get_user_by_id(id),
            Err(LibraryError::NotFound { .. })
        ));
    }
}
