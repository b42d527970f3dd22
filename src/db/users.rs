use std::rc::Rc;

use rusqlite::{params, Connection, Error as SqlError, ErrorCode, OptionalExtension, Row};
use tracing::debug;

use crate::error::{Entity, LibraryError, LibraryResult, LookupKey, StorageContext};
use crate::models::User;

use super::connection::{ensure_users_table, Database};

/// CRUD access to the `users` table. Email uniqueness lives in the schema;
/// violations come back as [`LibraryError::Conflict`].
pub struct UserStore {
    db: Rc<Database>,
}

impl UserStore {
    /// Attach to the shared database, creating the `users` table on first use.
    pub fn new(db: Rc<Database>) -> LibraryResult<Self> {
        db.with_connection(ensure_users_table)?;
        Ok(Self { db })
    }

    pub fn find_all(&self) -> LibraryResult<Vec<User>> {
        self.db.with_connection(|conn| {
            let mut stmt = conn
                .prepare("SELECT id, name, email FROM users ORDER BY id")
                .context("failed to prepare user query")?;

            let users = stmt
                .query_map([], user_from_row)
                .context("failed to load users")?
                .collect::<Result<Vec<_>, _>>()
                .context("failed to collect users")?;

            Ok(users)
        })
    }

    pub fn find_by_id(&self, id: i64) -> LibraryResult<User> {
        self.db
            .with_connection(|conn| {
                query_one(conn, "SELECT id, name, email FROM users WHERE id = ?1", params![id])
            })?
            .ok_or_else(|| LibraryError::not_found_id(Entity::User, id))
    }

    /// Exact email lookup; a miss is keyed by the email rather than an id.
    pub fn find_by_email(&self, email: &str) -> LibraryResult<User> {
        self.db
            .with_connection(|conn| {
                query_one(
                    conn,
                    "SELECT id, name, email FROM users WHERE email = ?1",
                    params![email],
                )
            })?
            .ok_or_else(|| LibraryError::NotFound {
                entity: Entity::User,
                key: LookupKey::Email(email.to_string()),
            })
    }

    /// Insert the user and write the generated id back onto it.
    pub fn save(&self, user: &mut User) -> LibraryResult<i64> {
        let id = self.db.with_connection(|conn| {
            conn.execute(
                "INSERT INTO users (name, email) VALUES (?1, ?2)",
                params![user.name, user.email],
            )
            .map_err(|err| map_email_constraint(err, &user.email))?;
            Ok(conn.last_insert_rowid())
        })?;

        user.id = id;
        debug!(id, "inserted user");
        Ok(id)
    }

    pub fn update(&self, user: &User) -> LibraryResult<()> {
        let updated = self.db.with_connection(|conn| {
            conn.execute(
                "UPDATE users SET name = ?1, email = ?2 WHERE id = ?3",
                params![user.name, user.email, user.id],
            )
            .map_err(|err| map_email_constraint(err, &user.email))
        })?;

        if updated == 0 {
            Err(LibraryError::not_found_id(Entity::User, user.id))
        } else {
            Ok(())
        }
    }

    pub fn delete(&self, id: i64) -> LibraryResult<()> {
        let deleted = self.db.with_connection(|conn| {
            conn.execute("DELETE FROM users WHERE id = ?1", params![id])
                .context("failed to delete user")
        })?;

        if deleted == 0 {
            Err(LibraryError::not_found_id(Entity::User, id))
        } else {
            Ok(())
        }
    }
}

fn query_one(
    conn: &Connection,
    sql: &str,
    args: impl rusqlite::Params,
) -> LibraryResult<Option<User>> {
    conn.query_row(sql, args, user_from_row)
        .optional()
        .context("failed to look up user")
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
    })
}

fn map_email_constraint(err: SqlError, email: &str) -> LibraryError {
    if matches!(err.sqlite_error_code(), Some(ErrorCode::ConstraintViolation)) {
        LibraryError::Conflict {
            entity: Entity::User,
            field: "email",
            value: email.to_string(),
        }
    } else {
        LibraryError::Storage {
            context: "failed to write user".to_string(),
            source: Box::new(err),
        }
    }
}
