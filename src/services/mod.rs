// src/services/mod.rs
//
// Services Module - Orchestration Layer
//
// CRITICAL RULES:
// - DiscoveryEngine reads the filesystem, never the store
// - SyncEngine is the only writer to the store
// - SeriesService is the single entry point for the application

pub mod discovery_engine;
pub mod series_service;
pub mod sync_engine;


pub use discovery_engine::{is_theme_song, search_pattern, DiscoveryEngine};

pub use series_service::{EpisodeView, SeriesService, ShowOverview};

pub use sync_engine::{
    delta_episodes,
    delta_shows,
    EpisodeDelta,
    PurgeReport,
    SyncEngine,
    SyncReport,
};
