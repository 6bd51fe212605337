pub mod entity;
pub mod invariants;

pub use entity::{Episode, EpisodeState, UNKNOWN_EPISODE_NUMBER};
pub use invariants::validate_episode;
