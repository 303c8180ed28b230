//! SQLite persistence for application records.
//!
//! One rusqlite connection sits behind a mutex; handlers reach it from
//! `spawn_blocking`. Records are only ever reached through
//! [`Database::applications_for`], which pins every query to one owner.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use rusqlite::Connection;

pub mod application_repo;
pub mod error;
pub mod migrations;
pub mod stats_repo;

pub use application_repo::OwnedApplications;
pub use error::DatabaseError;
pub use stats_repo::{DashboardStats, DayCount, StatusCounts};

/// Shared handle to the record store. Clones share one connection.
///
/// Concurrent updates to the same record are last-write-wins.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens the file at `path`, creating parent directories and the
    /// schema as needed.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| DatabaseError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        let db = Self::prepare(conn)?;
        log::info!("Record store ready at {}", path.display());
        Ok(db)
    }

    /// A private, empty store. Used by tests and the test harness.
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Self::prepare(Connection::open_in_memory()?)
    }

    fn prepare(mut conn: Connection) -> Result<Self, DatabaseError> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        migrations::run_all(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `f` while holding the connection lock.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&Connection) -> Result<T, DatabaseError>,
    {
        let guard = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        f(&guard)
    }
}

/// `~/.trackmyprep/data/trackmyprep.db`, or `None` without a home directory.
pub fn default_database_path() -> Option<PathBuf> {
    let home = dirs::home_dir()?;
    Some(home.join(".trackmyprep").join("data").join("trackmyprep.db"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(db: &Database) -> u32 {
        db.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM applications", [], |r| r.get(0))?)
        })
        .unwrap()
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("records.db");

        let db = Database::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(count(&db), 0);
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO applications (id, owner_id, company, role, status, priority, category, created_at)
                 VALUES ('a1', 'u1', 'Acme', 'SDE', 'Applied', 'High', 'Remote', '2026-01-01T00:00:00.000000Z')",
                [],
            )?;
            Ok(())
        })
        .unwrap();
        drop(db);

        let reopened = Database::open(&path).unwrap();
        assert_eq!(count(&reopened), 1);
    }

    #[test]
    fn test_in_memory_stores_are_independent() {
        let first = Database::open_in_memory().unwrap();
        let second = Database::open_in_memory().unwrap();
        first
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO applications (id, owner_id, company, role, status, priority, category, created_at)
                     VALUES ('a1', 'u1', 'Acme', 'SDE', 'Applied', 'High', 'Remote', '2026-01-01T00:00:00.000000Z')",
                    [],
                )?;
                Ok(())
            })
            .unwrap();
        assert_eq!(count(&first), 1);
        assert_eq!(count(&second), 0);
    }

    #[test]
    fn test_default_database_path() {
        let path = default_database_path().unwrap();
        assert!(path.ends_with(".trackmyprep/data/trackmyprep.db"));
    }
}
