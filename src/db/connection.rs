use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::error::{LibraryResult, StorageContext};

/// Where the SQLite database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbTarget {
    File(PathBuf),
    /// A private in-memory database. Re-opening yields a fresh, empty one.
    Memory,
}

/// Owns the single SQLite handle the stores share. The handle is lent out
/// through [`Database::with_connection`], re-established on demand after a
/// [`Database::close`], and released when the manager is dropped.
pub struct Database {
    target: DbTarget,
    conn: RefCell<Option<Connection>>,
}

impl Database {
    /// Connect right away so configuration problems surface at startup.
    pub fn open(target: DbTarget) -> LibraryResult<Self> {
        let conn = connect(&target)?;
        Ok(Self {
            target,
            conn: RefCell::new(Some(conn)),
        })
    }

    pub fn target(&self) -> &DbTarget {
        &self.target
    }

    /// Run `f` against the live connection, reconnecting first if the handle
    /// was closed. Calls must not nest.
    pub fn with_connection<T, F>(&self, f: F) -> LibraryResult<T>
    where
        F: FnOnce(&Connection) -> LibraryResult<T>,
    {
        let mut slot = self.conn.borrow_mut();
        let conn = match slot.take() {
            Some(conn) => conn,
            None => {
                info!(db = ?self.target, "re-opening closed database connection");
                connect(&self.target)?
            }
        };
        let conn = slot.insert(conn);
        f(conn)
    }

    /// Whether a handle is held and still answers queries.
    pub fn is_connected(&self) -> bool {
        match self.conn.borrow().as_ref() {
            Some(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            None => false,
        }
    }

    /// Release the handle. Closing an already closed manager does nothing.
    pub fn close(&self) -> LibraryResult<()> {
        let Some(conn) = self.conn.borrow_mut().take() else {
            return Ok(());
        };
        conn.close()
            .map_err(|(_, source)| source)
            .context("failed to close SQLite database")?;
        info!("database connection closed");
        Ok(())
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(error = %err, "failed to close database on shutdown");
        }
    }
}

/// Open the target, enable foreign keys, and make sure both tables exist.
/// Schema creation runs on every connect so a re-opened in-memory database is
/// immediately usable.
fn connect(target: &DbTarget) -> LibraryResult<Connection> {
    let conn = match target {
        DbTarget::File(path) => {
            create_parent_dir(path)?;
            Connection::open(path).context("failed to open SQLite database")?
        }
        DbTarget::Memory => {
            Connection::open_in_memory().context("failed to open in-memory database")?
        }
    };
    conn.execute("PRAGMA foreign_keys = ON", [])
        .context("failed to enable foreign keys")?;

    ensure_books_table(&conn)?;
    ensure_users_table(&conn)?;

    debug!(db = ?target, "database connection established");
    Ok(conn)
}

fn create_parent_dir(path: &Path) -> LibraryResult<()> {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    fs::create_dir_all(parent)
        .context(format!("failed to create data directory {}", parent.display()))
}

/// ISBNs compare case-insensitively, matching the service-level check.
pub(crate) fn ensure_books_table(conn: &Connection) -> LibraryResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS books (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            author TEXT NOT NULL,
            isbn TEXT NOT NULL UNIQUE COLLATE NOCASE,
            publication_year INTEGER NOT NULL,
            available INTEGER NOT NULL DEFAULT 1
        )",
        [],
    )
    .context("failed to create books table")?;
    Ok(())
}

pub(crate) fn ensure_users_table(conn: &Connection) -> LibraryResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE
        )",
        [],
    )
    .context("failed to create users table")?;
    Ok(())
}
