// src/domain/mod.rs
//
// Domain Root - entities, invariants and naming heuristics.
//
// Nothing in here touches the filesystem or the store.

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod episode;
pub mod naming;
pub mod show;
pub mod show_list;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

pub use episode::{validate_episode, Episode, EpisodeState, UNKNOWN_EPISODE_NUMBER};
pub use naming::{clean_title, extract_episode_number, match_form, normalize_title, TitleMatcher};
pub use show::{validate_show, EpisodeMap, Show};
pub use show_list::ShowList;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque identifier of a persisted row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowKey(pub i64);

impl std::fmt::Display for RowKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// DOMAIN ERROR TYPES
// ============================================================================

/// Domain-level errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Invalid episode state value: {0}")]
    InvalidStateValue(i64),
}

/// Domain result type
pub type DomainResult<T> = Result<T, DomainError>;
