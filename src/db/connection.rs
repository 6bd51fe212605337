// src/db/connection.rs
//
// Store handle and connection management
//
// PRINCIPLES:
// - One explicit handle per store, no global connection
// - Single writer: the pool holds exactly one connection
// - Foreign keys enforced on every connection

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use std::path::{Path, PathBuf};

use crate::db::migrations::initialize_database;
use crate::error::{AppError, AppResult};

/// Type alias for connection pool
pub type ConnectionPool = Pool<SqliteConnectionManager>;

/// Type alias for a pooled connection
pub type PooledConn = PooledConnection<SqliteConnectionManager>;

/// Explicit handle on the persistent library store
///
/// Opened once, handed to the `SyncEngine`, closed explicitly. Independent
/// instances never share state, so each test can own an in-memory store.
pub struct LibraryStore {
    pool: ConnectionPool,
    location: Option<PathBuf>,
}

impl LibraryStore {
    /// Open (or create) the store file at `path` and bring its schema up to date
    pub fn open(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch(
                "PRAGMA foreign_keys = ON;
                 PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA busy_timeout = 5000;",
            )
        });

        let store = Self {
            pool: build_pool(manager)?,
            location: Some(path.to_path_buf()),
        };
        store.initialize()?;
        log::info!("Opened library store at {}", path.display());
        Ok(store)
    }

    /// Open a private in-memory store
    pub fn open_in_memory() -> AppResult<Self> {
        let manager = SqliteConnectionManager::memory()
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));

        let store = Self {
            pool: build_pool(manager)?,
            location: None,
        };
        store.initialize()?;
        Ok(store)
    }

    /// Get the store's connection
    pub fn connection(&self) -> AppResult<PooledConn> {
        self.pool
            .get()
            .map_err(|e| AppError::Pool(format!("Failed to get database connection: {}", e)))
    }

    /// Backing file, `None` for in-memory stores
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    /// Release the connection
    pub fn close(self) {
        if let Some(path) = &self.location {
            log::debug!("Closing library store at {}", path.display());
        }
        drop(self.pool);
    }

    fn initialize(&self) -> AppResult<()> {
        let conn = self.connection()?;
        initialize_database(&conn)
    }
}

/// Pool configuration:
/// - Exactly one connection, never recycled (an in-memory database lives and
///   dies with its connection)
fn build_pool(manager: SqliteConnectionManager) -> AppResult<ConnectionPool> {
    Pool::builder()
        .max_size(1)
        .min_idle(Some(1))
        .idle_timeout(None)
        .max_lifetime(None)
        .build(manager)
        .map_err(|e| AppError::Pool(format!("Failed to create connection pool: {}", e)))
}
