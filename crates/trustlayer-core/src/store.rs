//! Key/value persistence for chat history
//!
//! Mirrors browser local storage: string keys, string values. The history
//! itself is a JSON array of [`ChatMessage`] stored under [`HISTORY_KEY`].

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use crate::state::ChatMessage;

pub const HISTORY_KEY: &str = "chatHistory";

pub trait HistoryStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Reads the stored history. Absent, unreadable or malformed values all
/// come back as an empty history.
pub fn load_history(store: &dyn HistoryStore, key: &str) -> Vec<ChatMessage> {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            log::warn!("could not read history {}: {:#}", key, e);
            return Vec::new();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(messages) => messages,
        Err(e) => {
            log::warn!("ignoring malformed history {}: {}", key, e);
            Vec::new()
        }
    }
}

pub fn save_history(store: &mut dyn HistoryStore, key: &str, messages: &[ChatMessage]) -> Result<()> {
    let raw = serde_json::to_string(messages)?;
    store.set(key, &raw)
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One `<key>.json` file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(anyhow!("invalid storage key {:?}", key));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl HistoryStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        Ok(Some(raw))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)?;

        // Never leave a partially written history file
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// A single `kv` table in a SQLite database
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).with_context(|| format!("opening {}", path.display()))?;
        Self::init(conn)
    }

    pub fn in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (key TEXT PRIMARY KEY, value TEXT NOT NULL)",
            [],
        )?;
        Ok(Self { conn })
    }
}

impl HistoryStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreKind {
    #[default]
    File,
    Sqlite,
    Memory,
}

impl StoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::File => "file",
            StoreKind::Sqlite => "sqlite",
            StoreKind::Memory => "memory",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "file" | "json" => Some(StoreKind::File),
            "sqlite" => Some(StoreKind::Sqlite),
            "memory" => Some(StoreKind::Memory),
            _ => None,
        }
    }

    pub fn all() -> Vec<StoreKind> {
        vec![StoreKind::File, StoreKind::Sqlite, StoreKind::Memory]
    }
}

/// Default location for persisted history, e.g. `~/.local/share/trustlayer`
pub fn default_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| anyhow!("Could not determine data directory"))?;
    Ok(data_dir.join("trustlayer"))
}

pub fn open_store(kind: StoreKind, dir: &Path) -> Result<Box<dyn HistoryStore>> {
    let store: Box<dyn HistoryStore> = match kind {
        StoreKind::File => Box::new(FileStore::new(dir)),
        StoreKind::Sqlite => Box::new(SqliteStore::open(&dir.join("history.db"))?),
        StoreKind::Memory => Box::new(MemoryStore::new()),
    };
    log::info!("history store: {} ({})", kind.as_str(), dir.display());
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> Vec<ChatMessage> {
        vec![
            ChatMessage::user("I think this is a scam"),
            ChatMessage::bot("✅ Agent connected: Anna – Scam Specialist"),
        ]
    }

    #[test]
    fn test_memory_round_trip() {
        let mut store = MemoryStore::new();
        save_history(&mut store, HISTORY_KEY, &sample()).unwrap();
        assert_eq!(load_history(&store, HISTORY_KEY), sample());
    }

    #[test]
    fn test_missing_history_is_empty() {
        let store = MemoryStore::new();
        assert!(load_history(&store, HISTORY_KEY).is_empty());
    }

    #[test]
    fn test_malformed_history_is_empty() {
        let mut store = MemoryStore::new();
        store.set(HISTORY_KEY, "{not json").unwrap();
        assert!(load_history(&store, HISTORY_KEY).is_empty());

        store.set(HISTORY_KEY, r#"{"text":"not a list","sender":"bot"}"#).unwrap();
        assert!(load_history(&store, HISTORY_KEY).is_empty());
    }

    #[test]
    fn test_file_store_round_trip() {
        let tmp = TempDir::new().unwrap();
        let mut store = FileStore::new(tmp.path().join("nested"));
        assert_eq!(store.get(HISTORY_KEY).unwrap(), None);

        save_history(&mut store, HISTORY_KEY, &sample()).unwrap();
        assert!(tmp.path().join("nested").join("chatHistory.json").exists());

        let reopened = FileStore::new(tmp.path().join("nested"));
        assert_eq!(load_history(&reopened, HISTORY_KEY), sample());
    }

    #[test]
    fn test_file_store_rejects_path_keys() {
        let tmp = TempDir::new().unwrap();
        let mut store = FileStore::new(tmp.path());
        assert!(store.set("../escape", "x").is_err());
        assert!(store.get("").is_err());
    }

    #[test]
    fn test_sqlite_store_overwrites() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("history.db");
        {
            let mut store = SqliteStore::open(&path).unwrap();
            store.set(HISTORY_KEY, "[]").unwrap();
            save_history(&mut store, HISTORY_KEY, &sample()).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(load_history(&store, HISTORY_KEY), sample());
        assert_eq!(store.get("other").unwrap(), None);
    }

    #[test]
    fn test_open_store_kinds() {
        let tmp = TempDir::new().unwrap();
        for kind in StoreKind::all() {
            let mut store = open_store(kind, tmp.path()).unwrap();
            save_history(&mut *store, HISTORY_KEY, &sample()).unwrap();
            assert_eq!(load_history(&*store, HISTORY_KEY), sample());
        }
    }

    #[test]
    fn test_store_kind_from_str() {
        assert_eq!(StoreKind::from_str("SQLite"), Some(StoreKind::Sqlite));
        assert_eq!(StoreKind::from_str("json"), Some(StoreKind::File));
        assert_eq!(StoreKind::from_str("redis"), None);
    }
}
