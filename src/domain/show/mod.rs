pub mod entity;
pub mod invariants;

pub use entity::{EpisodeMap, Show};
pub use invariants::validate_show;
