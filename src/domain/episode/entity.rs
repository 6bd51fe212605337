use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use crate::domain::{DomainError, RowKey};

/// Episode number used when no number could be extracted from the file name.
pub const UNKNOWN_EPISODE_NUMBER: i32 = -1;

/// One discovered media file belonging to a Show
///
/// Identity is the absolute path: equality and hashing ignore every other field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    /// Absolute filesystem path (identity key)
    pub path: PathBuf,

    /// File name derived from `path`
    pub name: String,

    /// Parsed episode number, `UNKNOWN_EPISODE_NUMBER` when unparseable
    pub number: i32,

    /// Watch state
    pub state: EpisodeState,

    /// Persisted row identifier, `None` until first saved
    pub key: Option<RowKey>,
}

/// Watch state of an episode
///
/// The discriminants are the values stored in the `state` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeState {
    New = 1,
    Unwatched = 2,
    Watched = 3,
}

impl Episode {
    /// Create a freshly discovered episode (`New`, unknown number, not persisted)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = file_name_of(&path);
        Self {
            path,
            name,
            number: UNKNOWN_EPISODE_NUMBER,
            state: EpisodeState::New,
            key: None,
        }
    }

    /// Rebuild an episode from stored values
    pub fn restore(path: impl Into<PathBuf>, number: i32, state: EpisodeState, key: RowKey) -> Self {
        let mut episode = Self::new(path);
        episode.number = number;
        episode.state = state;
        episode.key = Some(key);
        episode
    }

    pub fn update_state(&mut self, state: EpisodeState) {
        self.state = state;
    }

    pub fn has_number(&self) -> bool {
        self.number != UNKNOWN_EPISODE_NUMBER
    }

    /// Display ordering: by number, unknown numbers first, ties broken by path
    pub fn cmp_by_number(&self, other: &Self) -> Ordering {
        self.number
            .cmp(&other.number)
            .then_with(|| self.path.cmp(&other.path))
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl PartialEq for Episode {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for Episode {}

impl Hash for Episode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

impl EpisodeState {
    pub fn as_i64(self) -> i64 {
        self as i64
    }
}

impl TryFrom<i64> for EpisodeState {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(EpisodeState::New),
            2 => Ok(EpisodeState::Unwatched),
            3 => Ok(EpisodeState::Watched),
            other => Err(DomainError::InvalidStateValue(other)),
        }
    }
}

impl std::fmt::Display for EpisodeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EpisodeState::New => write!(f, "new"),
            EpisodeState::Unwatched => write!(f, "unwatched"),
            EpisodeState::Watched => write!(f, "watched"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_new_episode_defaults() {
        let episode = Episode::new("/videos/Mushishi - 03.mkv");
        assert_eq!(episode.name, "Mushishi - 03.mkv");
        assert_eq!(episode.number, UNKNOWN_EPISODE_NUMBER);
        assert_eq!(episode.state, EpisodeState::New);
        assert!(episode.key.is_none());
        assert!(!episode.has_number());
    }

    #[test]
    fn test_equality_is_by_path_only() {
        let mut a = Episode::new("/videos/a.mkv");
        let mut b = Episode::new("/videos/a.mkv");
        a.number = 1;
        b.number = 7;
        b.state = EpisodeState::Watched;
        assert_eq!(a, b);

        let set: HashSet<Episode> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_unknown_number_orders_first() {
        let mut first = Episode::new("/v/z.mkv");
        first.number = UNKNOWN_EPISODE_NUMBER;
        let mut second = Episode::new("/v/a.mkv");
        second.number = 1;
        assert_eq!(first.cmp_by_number(&second), Ordering::Less);
    }

    #[test]
    fn test_state_round_trips_through_column_value() {
        for state in [EpisodeState::New, EpisodeState::Unwatched, EpisodeState::Watched] {
            assert_eq!(EpisodeState::try_from(state.as_i64()).unwrap(), state);
        }
        assert!(EpisodeState::try_from(0).is_err());
        assert!(EpisodeState::try_from(4).is_err());
    }
}
