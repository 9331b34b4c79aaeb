pub mod app_meta;
pub mod index_store;
pub mod memory;
pub mod posting;
pub mod schema;

use sqlite::Connection;
use std::path::{Path, PathBuf};

use crate::security::{KeyError, KeywordHasher};

pub use memory::MemoryStore;
pub use posting::{Posting, PostingCursor, PostingStore};

const DEFAULT_PAGE_SIZE: usize = 64;

/// Knobs for opening a [`Store`].
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Persist HMAC hashes of keywords instead of the plaintext.
    pub hash_keywords: bool,
    /// Rows fetched per cursor round trip.
    pub page_size: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            hash_keywords: true,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// SQLite-backed posting store.
pub struct Store {
    conn: Connection,
    hasher: Option<KeywordHasher>,
    page_size: usize,
}

impl Store {
    pub fn open(db_path: &Path, options: &StoreOptions) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = sqlite::open(db_path)?;
        Self::init(conn, options)
    }

    /// Reset the database at `db_path` whatever keyword mode it was built in.
    pub fn reset_at(db_path: &Path) -> Result<(), StoreError> {
        let conn = sqlite::open(db_path)?;
        Self::configure(&conn)?;
        schema::run_migrations(&conn)?;
        Store {
            conn,
            hasher: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
        .reset()
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::open_in_memory_with(&StoreOptions::default())
    }

    pub fn open_in_memory_with(options: &StoreOptions) -> Result<Self, StoreError> {
        let conn = sqlite::open(":memory:")?;
        Self::init(conn, options)
    }

    fn init(conn: Connection, options: &StoreOptions) -> Result<Self, StoreError> {
        Self::configure(&conn)?;
        schema::run_migrations(&conn)?;
        let mut store = Store {
            conn,
            hasher: None,
            page_size: options.page_size.max(1),
        };
        store.check_hash_mode(options.hash_keywords)?;
        if options.hash_keywords {
            store.hasher = Some(store.load_or_create_hasher()?);
        }
        Ok(store)
    }

    fn configure(conn: &Connection) -> Result<(), sqlite::Error> {
        conn.execute(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -64000;",
        )?;
        Ok(())
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// The form a keyword takes on disk.
    pub(crate) fn stored_keyword(&self, keyword: &str) -> String {
        match &self.hasher {
            Some(hasher) => hasher.hash(keyword),
            None => keyword.to_string(),
        }
    }
}

pub fn default_db_path() -> PathBuf {
    let mut path = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("relay-search");
    path.push("relay-search.db");
    path
}

#[derive(Debug)]
pub enum StoreError {
    Sqlite(sqlite::Error),
    Key(KeyError),
    Unavailable(String),
    /// The index was built with keyword hashing on and is being opened with
    /// it off, or the other way round.
    HashModeMismatch { stored: String, requested: String },
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Sqlite(e) => write!(f, "sqlite error: {}", e),
            StoreError::Key(e) => write!(f, "key error: {}", e),
            StoreError::Unavailable(msg) => write!(f, "store unavailable: {}", msg),
            StoreError::HashModeMismatch { stored, requested } => write!(
                f,
                "index keywords are stored {} but {} was requested; run `reset` to rebuild",
                stored, requested
            ),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlite::Error> for StoreError {
    fn from(e: sqlite::Error) -> Self {
        StoreError::Sqlite(e)
    }
}

impl From<KeyError> for StoreError {
    fn from(e: KeyError) -> Self {
        StoreError::Key(e)
    }
}
