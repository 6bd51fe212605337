// src/db/mod.rs
//
// Database module
//
// Provides:
// - The explicit store handle
// - Schema migrations
// - Database utilities

pub mod connection;
pub mod migrations;

pub use connection::{ConnectionPool, LibraryStore, PooledConn};

pub use migrations::{
    get_database_stats, initialize_database, verify_database_integrity, DatabaseStats,
};
