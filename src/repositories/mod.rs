// src/repositories/mod.rs
//
// Repository layer
//
// CRITICAL RULES:
// - Repositories are DUMB data mappers
// - NO business logic
// - NO transaction management (callers pass a connection or a transaction)
// - Explicit SQL only

pub mod episode_repository;
pub mod show_repository;

pub use episode_repository::{EpisodeRepository, SqliteEpisodeRepository};
pub use show_repository::{ShowRepository, SqliteShowRepository};
