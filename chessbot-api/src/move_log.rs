//! Move Log: durable per-color record of every physical move.
//!
//! Each color owns one append-only list of entries in the
//! `{from}-{to}-{color}-{piece}-{flag}` format. The log survives a server
//! crash so the physical board can be put back afterwards.
//!
//! Stores:
//! - Redis lists `WHITE` / `BLACK` (RPUSH / LRANGE / DEL), optionally prefixed
//! - SQLite table `move_log(id, color, entry)`
//! - in-memory, for tests and dry runs

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use chessbot_core::{Color, LogEntry};
use redis::Commands;
use rusqlite::{params, Connection};
use tracing::info;

use crate::error::LogStoreError;

/// Append-only per-color log storage.
pub trait MoveLogStore: Send {
    /// Append `entry` to the end of `color`'s list.
    fn append(&mut self, color: Color, entry: &LogEntry) -> Result<(), LogStoreError>;

    /// All of `color`'s entries, oldest first.
    fn read_all(&mut self, color: Color) -> Result<Vec<LogEntry>, LogStoreError>;

    /// Remove both lists.
    fn clear(&mut self) -> Result<(), LogStoreError>;

    /// Whether both lists are empty.
    fn is_empty(&mut self) -> Result<bool, LogStoreError> {
        Ok(self.read_all(Color::White)?.is_empty() && self.read_all(Color::Black)?.is_empty())
    }
}

/// Open the store named by `url`.
pub fn open_store(url: &str, prefix: &str) -> Result<Box<dyn MoveLogStore>, LogStoreError> {
    if url.starts_with("redis://") || url.starts_with("rediss://") {
        Ok(Box::new(RedisStore::connect(url, prefix)?))
    } else if let Some(path) = url.strip_prefix("sqlite://") {
        Ok(Box::new(SqliteStore::open(path)?))
    } else if url == "memory://" {
        info!("Using in-memory move log; nothing survives a restart");
        Ok(Box::new(MemoryStore::new()))
    } else {
        Err(LogStoreError::UnsupportedUrl(url.to_string()))
    }
}

fn parse_entries(raw: Vec<String>) -> Result<Vec<LogEntry>, LogStoreError> {
    raw.iter()
        .map(|entry| entry.parse().map_err(LogStoreError::from))
        .collect()
}

// =============================================================================
// Redis
// =============================================================================

/// Redis-backed log: one list per color.
pub struct RedisStore {
    conn: redis::Connection,
    prefix: String,
}

impl RedisStore {
    /// Connect and verify the server answers.
    pub fn connect(url: &str, prefix: &str) -> Result<Self, LogStoreError> {
        let client = redis::Client::open(url)?;
        let mut conn = client.get_connection()?;
        let _: String = redis::cmd("PING").query(&mut conn)?;
        info!(url = %url, prefix = %prefix, "Connected to Redis move log");
        Ok(Self {
            conn,
            prefix: prefix.to_string(),
        })
    }

    /// List key holding `color`'s entries.
    pub fn key(&self, color: Color) -> String {
        format!("{}{}", self.prefix, color.name())
    }
}

impl MoveLogStore for RedisStore {
    fn append(&mut self, color: Color, entry: &LogEntry) -> Result<(), LogStoreError> {
        let key = self.key(color);
        let _: () = self.conn.rpush(key, entry.to_string())?;
        Ok(())
    }

    fn read_all(&mut self, color: Color) -> Result<Vec<LogEntry>, LogStoreError> {
        let key = self.key(color);
        let raw: Vec<String> = self.conn.lrange(key, 0, -1)?;
        parse_entries(raw)
    }

    fn clear(&mut self) -> Result<(), LogStoreError> {
        let keys = vec![self.key(Color::White), self.key(Color::Black)];
        let _: () = self.conn.del(keys)?;
        Ok(())
    }
}

// =============================================================================
// SQLite
// =============================================================================

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS move_log (
    id    INTEGER PRIMARY KEY AUTOINCREMENT,
    color TEXT NOT NULL,
    entry TEXT NOT NULL
)";

/// SQLite-backed log; insertion order is the `id` order.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LogStoreError> {
        let conn = Connection::open(path.as_ref())?;
        conn.execute_batch(SCHEMA)?;
        info!(path = %path.as_ref().display(), "Opened SQLite move log");
        Ok(Self { conn })
    }

    /// Throwaway database that lives as long as the store.
    pub fn in_memory() -> Result<Self, LogStoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }
}

impl MoveLogStore for SqliteStore {
    fn append(&mut self, color: Color, entry: &LogEntry) -> Result<(), LogStoreError> {
        self.conn.execute(
            "INSERT INTO move_log (color, entry) VALUES (?1, ?2)",
            params![color.name(), entry.to_string()],
        )?;
        Ok(())
    }

    fn read_all(&mut self, color: Color) -> Result<Vec<LogEntry>, LogStoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT entry FROM move_log WHERE color = ?1 ORDER BY id")?;
        let raw = stmt
            .query_map(params![color.name()], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        parse_entries(raw)
    }

    fn clear(&mut self) -> Result<(), LogStoreError> {
        self.conn.execute("DELETE FROM move_log", [])?;
        Ok(())
    }
}

// =============================================================================
// Memory
// =============================================================================

#[derive(Default, Debug)]
struct Lists {
    white: Vec<String>,
    black: Vec<String>,
}

impl Lists {
    fn get_mut(&mut self, color: Color) -> &mut Vec<String> {
        match color {
            Color::White => &mut self.white,
            Color::Black => &mut self.black,
        }
    }
}

/// In-process log. Clones share the same lists.
#[derive(Clone, Default, Debug)]
pub struct MemoryStore {
    lists: Arc<Mutex<Lists>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw entries for `color`, as they would sit in Redis.
    pub fn raw(&self, color: Color) -> Vec<String> {
        let mut lists = self.lists.lock().unwrap_or_else(PoisonError::into_inner);
        lists.get_mut(color).clone()
    }

    /// Push a raw string, bypassing entry formatting.
    pub fn push_raw(&self, color: Color, entry: &str) {
        let mut lists = self.lists.lock().unwrap_or_else(PoisonError::into_inner);
        lists.get_mut(color).push(entry.to_string());
    }
}

impl MoveLogStore for MemoryStore {
    fn append(&mut self, color: Color, entry: &LogEntry) -> Result<(), LogStoreError> {
        self.push_raw(color, &entry.to_string());
        Ok(())
    }

    fn read_all(&mut self, color: Color) -> Result<Vec<LogEntry>, LogStoreError> {
        parse_entries(self.raw(color))
    }

    fn clear(&mut self) -> Result<(), LogStoreError> {
        let mut lists = self.lists.lock().unwrap_or_else(PoisonError::into_inner);
        *lists = Lists::default();
        Ok(())
    }
}
