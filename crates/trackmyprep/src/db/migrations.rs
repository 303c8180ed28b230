//! Schema versioning.
//!
//! Applied versions are recorded in `_migrations`. On open, every step
//! newer than the recorded maximum runs inside its own transaction.

use rusqlite::{params, Connection};

use super::error::DatabaseError;

struct Step {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const STEPS: &[Step] = &[
    Step {
        version: 1,
        name: "create_applications_table",
        sql: include_str!("sql/001_create_applications.sql"),
    },
    Step {
        version: 2,
        name: "add_owner_status_index",
        sql: include_str!("sql/002_add_status_index.sql"),
    },
];

const BOOKKEEPING: &str = "CREATE TABLE IF NOT EXISTS _migrations (
    version INTEGER PRIMARY KEY,
    description TEXT NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);";

fn applied_version(conn: &Connection) -> Result<u32, DatabaseError> {
    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM _migrations",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

/// Brings the schema up to date. Returns how many steps were applied.
pub fn run_all(conn: &mut Connection) -> Result<usize, DatabaseError> {
    conn.execute_batch(BOOKKEEPING)?;
    let from = applied_version(conn)?;

    let pending: Vec<&Step> = STEPS.iter().filter(|s| s.version > from).collect();
    for step in &pending {
        log::info!("Applying schema v{} ({})", step.version, step.name);

        let tx = conn.transaction()?;
        if let Err(e) = tx.execute_batch(step.sql) {
            return Err(DatabaseError::Migration {
                version: step.version,
                reason: e.to_string(),
            });
        }
        tx.execute(
            "INSERT INTO _migrations (version, description) VALUES (?1, ?2)",
            params![step.version, step.name],
        )?;
        tx.commit()?;
    }

    if pending.is_empty() {
        log::debug!("Schema is current at v{}", from);
    }
    Ok(pending.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    const INSERT: &str = "INSERT INTO applications
        (id, owner_id, company, role, status, priority, category, created_at)
        VALUES (?1, 'u', ?2, 'SDE', ?3, 'High', 'Remote', '2026-01-01T00:00:00.000000Z')";

    fn fresh() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        assert_eq!(run_all(&mut conn).unwrap(), STEPS.len());
        conn
    }

    #[test]
    fn test_second_run_applies_nothing() {
        let mut conn = fresh();
        assert_eq!(run_all(&mut conn).unwrap(), 0);
        assert_eq!(applied_version(&conn).unwrap(), 2);
    }

    #[test]
    fn test_partial_history_resumes() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(BOOKKEEPING).unwrap();
        conn.execute_batch(STEPS[0].sql).unwrap();
        conn.execute(
            "INSERT INTO _migrations (version, description) VALUES (1, 'create_applications_table')",
            [],
        )
        .unwrap();

        assert_eq!(run_all(&mut conn).unwrap(), 1);
    }

    #[test]
    fn test_check_constraints() {
        let conn = fresh();
        assert!(conn.execute(INSERT, params!["a", "Acme", "Applied"]).is_ok());
        assert!(conn.execute(INSERT, params!["b", "Acme", "Ghosted"]).is_err());
        assert!(conn.execute(INSERT, params!["c", "  ", "Offer"]).is_err());
    }
}
