//! Domain services layered over the stores.

mod books;
mod users;

pub use books::BookService;
pub use users::UserService;
