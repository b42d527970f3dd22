//! Typed failures shared by the models, stores, and services. Only the
//! terminal shell turns these into plain text; every layer below it keeps the
//! structured key (id or email) so callers can still match on what went
//! wrong.

use std::fmt;

use thiserror::Error;

/// Which kind of record a failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Book,
    User,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Book => write!(f, "book"),
            Entity::User => write!(f, "user"),
        }
    }
}

/// The key a failed lookup was made with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupKey {
    Id(i64),
    Email(String),
}

impl fmt::Display for LookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupKey::Id(id) => write!(f, "id {id}"),
            LookupKey::Email(email) => write!(f, "email {email}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum LibraryError {
    /// Malformed input to an entity constructor or setter.
    #[error("Invalid {field}: {reason}.")]
    Validation {
        field: &'static str,
        reason: &'static str,
    },

    /// No row matched the requested key.
    #[error("No {entity} with {key} exists.")]
    NotFound { entity: Entity, key: LookupKey },

    /// A uniqueness rule was violated, either by the service check or by a
    /// schema constraint.
    #[error("A {entity} with {field} '{value}' already exists.")]
    Conflict {
        entity: Entity,
        field: &'static str,
        value: String,
    },

    /// Borrow/return attempted from the wrong availability state.
    #[error("Book {book_id} is {reason}.")]
    InvalidState { book_id: i64, reason: &'static str },

    /// Anything the SQLite driver (or the filesystem beneath it) reported.
    #[error("{context}")]
    Storage {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}

pub type LibraryResult<T> = Result<T, LibraryError>;

impl LibraryError {
    pub(crate) fn not_found_id(entity: Entity, id: i64) -> Self {
        LibraryError::NotFound {
            entity,
            key: LookupKey::Id(id),
        }
    }

    /// Whether this is a not-found failure, regardless of entity or key.
    pub fn is_not_found(&self) -> bool {
        matches!(self, LibraryError::NotFound { .. })
    }
}

/// Attach a human-readable context to raw driver errors, mirroring the
/// `anyhow::Context` calls the shell uses.
pub(crate) trait StorageContext<T> {
    fn context<C: Into<String>>(self, context: C) -> LibraryResult<T>;
}

impl<T, E> StorageContext<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context<C: Into<String>>(self, context: C) -> LibraryResult<T> {
        self.map_err(|source| LibraryError::Storage {
            context: context.into(),
            source: Box::new(source),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_keeps_the_key() {
        let err = LibraryError::NotFound {
            entity: Entity::User,
            key: LookupKey::Email("ann@example.org".to_string()),
        };
        assert_eq!(err.to_string(), "No user with email ann@example.org exists.");
        assert!(err.is_not_found());
    }

    #[test]
    fn storage_context_wraps_the_driver_error() {
        let raw: Result<(), rusqlite::Error> = Err(rusqlite::Error::QueryReturnedNoRows);
        let err = raw.context("failed to load books").unwrap_err();

        assert_eq!(err.to_string(), "failed to load books");
        let source = std::error::Error::source(&err).expect("source kept");
        assert!(matches!(
            source.downcast_ref::<rusqlite::Error>(),
            Some(rusqlite::Error::QueryReturnedNoRows)
        ));
    }

    #[test]
    fn storage_context_keeps_filesystem_errors_too() {
        let raw: Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"));
        let err = raw.context("failed to create data directory").unwrap_err();

        let source = std::error::Error::source(&err).expect("source kept");
        let io = source.downcast_ref::<std::io::Error>().expect("io error");
        assert_eq!(io.kind(), std::io::ErrorKind::PermissionDenied);
    }
}
