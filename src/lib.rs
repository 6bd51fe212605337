// src/lib.rs
// Ene Library - local anime library core
//
// Architecture:
// - Domain-centric: entities and naming heuristics are pure
// - Explicit: one store handle, passed in, closed explicitly
// - Local-first: the filesystem is scanned, the store keeps watch history
// - Single writer: all store writes go through the SyncEngine

// ============================================================================
// MODULES
// ============================================================================

pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod repositories;
pub mod services;

// ============================================================================
// PUBLIC API - Configuration
// ============================================================================

pub use config::{LibraryConfig, FUZZY_MATCH_THRESHOLD, VIDEO_EXTENSIONS};

// ============================================================================
// PUBLIC API - Domain Entities
// ============================================================================

pub use domain::{
    clean_title,
    extract_episode_number,
    match_form,
    normalize_title,
    validate_episode,
    validate_show,
    DomainError,
    // Episode
    Episode,
    EpisodeMap,
    EpisodeState,
    RowKey,
    // Show
    Show,
    ShowList,
    TitleMatcher,
};

// ============================================================================
// PUBLIC API - Error Types
// ============================================================================

pub use error::{AppError, AppResult};

// ============================================================================
// PUBLIC API - Database
// ============================================================================

pub use db::{initialize_database, ConnectionPool, LibraryStore};

// ============================================================================
// PUBLIC API - Repositories
// ============================================================================

pub use repositories::{
    EpisodeRepository,
    ShowRepository,
    SqliteEpisodeRepository,
    SqliteShowRepository,
};

// ============================================================================
// PUBLIC API - Services
// ============================================================================

pub use services::{
    DiscoveryEngine,
    EpisodeView,
    PurgeReport,
    SeriesService,
    ShowOverview,
    SyncEngine,
    SyncReport,
};
