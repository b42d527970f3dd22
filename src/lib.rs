//! Core library surface for the library manager.
//!
//! Storage, domain services, and the terminal shell live in separate modules
//! so the binary and the integration tests can reuse the same pieces.
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod services;
pub mod ui;

/// The persistence layer: one shared connection manager plus a store per table.
pub use db::{BookStore, Database, DbTarget, UserStore};

pub use error::{LibraryError, LibraryResult};

/// The domain types that other layers manipulate.
pub use models::{Availability, Book, User};

pub use services::{BookService, UserService};

/// The interactive application entry point and state container.
pub use ui::{run_app, App};
