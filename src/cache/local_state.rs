use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;

const STATE_DB: &str = "state.db";
const HAS_VISITED_KEY: &str = "has_visited";

/// Small persisted state kept next to the client.
///
/// Holds the ids of prompts submitted from this machine (an "I can edit this"
/// hint layered over server-side ownership) and the first-run flag.
pub struct LocalState {
    conn: Connection,
    #[allow(dead_code)]
    path: Option<PathBuf>,
}

impl LocalState {
    /// Open or create the state database inside `dir`.
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(STATE_DB);
        let conn = Connection::open(&path)?;

        let state = Self {
            conn,
            path: Some(path),
        };
        state.init_schema()?;
        Ok(state)
    }

    /// Open a throwaway state that lives only as long as this value.
    pub fn open_in_memory() -> Result<Self> {
        let state = Self {
            conn: Connection::open_in_memory()?,
            path: None,
        };
        state.init_schema()?;
        Ok(state)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS created_prompts (
                id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    fn get_meta(&self, key: &str) -> Result<Option<String>> {
        let value: Option<String> = self
            .conn
            .query_row("SELECT value FROM meta WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
            [key, value],
        )?;
        Ok(())
    }

    pub fn has_visited(&self) -> Result<bool> {
        Ok(self.get_meta(HAS_VISITED_KEY)?.as_deref() == Some("true"))
    }

    pub fn mark_visited(&self) -> Result<()> {
        self.set_meta(HAS_VISITED_KEY, "true")
    }

    /// Remember that this client submitted prompt `id`.
    pub fn record_created(&self, id: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO created_prompts (id, created_at) VALUES (?1, ?2)",
            params![id, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn is_created_here(&self, id: &str) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row("SELECT 1 FROM created_prompts WHERE id = ?1", [id], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(found.is_some())
    }

    /// Ids submitted from this client, oldest first.
    pub fn created_ids(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM created_prompts ORDER BY created_at, rowid")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(ids)
    }
}
