//! Persistence layer split into the connection manager and one store per
//! table.

mod books;
mod connection;
mod users;

pub use books::BookStore;
pub use connection::{Database, DbTarget};
pub use users::UserStore;
