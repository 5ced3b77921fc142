// Persisted session identity: which player id we are in which game.
//
// The store is keyed by game code so one install can sit in several games
// at once. Backed by SQLite; tests use the ":memory:" path.

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

/// Durable mapping from game code to the player id this client holds there.
pub trait SessionStore: Send + Sync {
    /// The player id previously remembered for `game_code`, if any.
    fn player_for(&self, game_code: &str) -> Result<Option<String>>;

    /// Remember `player_id` as our identity in `game_code`, replacing any
    /// previous entry.
    fn remember(&self, game_code: &str, player_id: &str) -> Result<()>;

    /// Drop the remembered identity for `game_code`. No-op if absent.
    fn forget(&self, game_code: &str) -> Result<()>;
}

pub struct SqliteSessionStore {
    conn: Mutex<Connection>,
}

impl SqliteSessionStore {
    /// Open (or create) the session database at `path`. Pass `":memory:"`
    /// for an ephemeral store.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && path.to_str() != Some(":memory:") {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating session db directory {parent:?}"))?;
            }
        }
        let conn = Connection::open(path)
            .with_context(|| format!("opening session db at {path:?}"))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS sessions (
                game_code  TEXT PRIMARY KEY,
                player_id  TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
            [],
        )
        .context("creating sessions table")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("session db mutex poisoned"))
    }
}

impl SessionStore for SqliteSessionStore {
    fn player_for(&self, game_code: &str) -> Result<Option<String>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT player_id FROM sessions WHERE game_code = ?1",
            params![game_code],
            |row| row.get(0),
        )
        .optional()
        .context("reading session")
    }

    fn remember(&self, game_code: &str, player_id: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO sessions (game_code, player_id, updated_at)
             VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(game_code) DO UPDATE
             SET player_id = excluded.player_id, updated_at = excluded.updated_at",
            params![game_code, player_id],
        )
        .context("writing session")?;
        Ok(())
    }

    fn forget(&self, game_code: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "DELETE FROM sessions WHERE game_code = ?1",
            params![game_code],
        )
        .context("deleting session")?;
        Ok(())
    }
}
