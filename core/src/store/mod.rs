//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! Generators and the simulator work on in-memory tables; callers hand
//! finished tables to the store. Nothing else executes SQL.

use crate::{
    error::{SimError, SimResult},
    types::Seed,
};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

mod import;
mod report;
mod unit;

pub struct SimStore {
    conn: Connection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub kind: String,
    pub seed: String,
    pub version: String,
    pub started_at: String,
}

impl SimStore {
    pub fn open(path: &str) -> SimResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (:memory: ignores it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> SimResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> SimResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_units.sql"))?;
        Ok(())
    }

    // ── Run ────────────────────────────────────────────────────

    pub fn insert_run(&self, run_id: &str, kind: &str, seed: Seed, version: &str) -> SimResult<()> {
        let started_at = chrono::Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO run (run_id, kind, seed, version, started_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![run_id, kind, format!("{seed:#x}"), version, started_at],
        )?;
        Ok(())
    }

    pub fn run(&self, run_id: &str) -> SimResult<Option<RunRecord>> {
        self.conn
            .query_row(
                "SELECT run_id, kind, seed, version, started_at FROM run WHERE run_id = ?1",
                params![run_id],
                |row| {
                    Ok(RunRecord {
                        run_id: row.get(0)?,
                        kind: row.get(1)?,
                        seed: row.get(2)?,
                        version: row.get(3)?,
                        started_at: row.get(4)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn runs(&self) -> SimResult<Vec<RunRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT run_id, kind, seed, version, started_at FROM run ORDER BY started_at ASC, run_id ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(RunRecord {
                run_id: row.get(0)?,
                kind: row.get(1)?,
                seed: row.get(2)?,
                version: row.get(3)?,
                started_at: row.get(4)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Reject anything that is not a plain SQL identifier before it is
    /// interpolated into a statement.
    fn check_identifier(name: &str) -> SimResult<()> {
        let valid = !name.is_empty()
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            && !name.starts_with(|c: char| c.is_ascii_digit());
        if valid {
            Ok(())
        } else {
            Err(SimError::invalid(format!("not a valid table name: {name:?}")))
        }
    }
}
