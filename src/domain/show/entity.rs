use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::domain::episode::Episode;
use crate::domain::RowKey;

/// Episodes of a show keyed by their absolute path
pub type EpisodeMap = BTreeMap<PathBuf, Episode>;

/// A titled collection of episode files believed to belong to the same series
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Show {
    /// Canonical display and lookup key, unique within a ShowList
    pub title: String,

    /// External show identifier (e.g. AniList media id), linked outside this crate
    pub show_id: Option<i64>,

    /// External list-entry identifier
    pub list_id: Option<i64>,

    /// Episodes, unique per path
    pub episodes: EpisodeMap,

    /// Persisted row identifier, `None` until first saved
    pub key: Option<RowKey>,
}

impl Show {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Build a show from a list of episodes
    pub fn with_episodes(title: impl Into<String>, episodes: impl IntoIterator<Item = Episode>) -> Self {
        let mut show = Self::new(title);
        for episode in episodes {
            show.add_or_update_episode(episode);
        }
        show
    }

    /// Insert the episode, or refresh the stored episode's number when the path is
    /// already present. State and key of an existing episode are left untouched.
    pub fn add_or_update_episode(&mut self, episode: Episode) {
        match self.episodes.get_mut(&episode.path) {
            Some(existing) => existing.number = episode.number,
            None => {
                self.episodes.insert(episode.path.clone(), episode);
            }
        }
    }

    /// Union `other`'s episodes into this show (idempotent).
    ///
    /// Key and external ids from `other` only fill what this show does not have yet.
    pub fn merge(&mut self, other: Show) {
        self.key = self.key.or(other.key);
        self.show_id = self.show_id.or(other.show_id);
        self.list_id = self.list_id.or(other.list_id);
        for episode in other.episodes.into_values() {
            self.add_or_update_episode(episode);
        }
    }

    pub fn episode(&self, path: &Path) -> Option<&Episode> {
        self.episodes.get(path)
    }

    pub fn episode_mut(&mut self, path: &Path) -> Option<&mut Episode> {
        self.episodes.get_mut(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.episodes.contains_key(path)
    }

    pub fn remove_episode(&mut self, path: &Path) -> Option<Episode> {
        self.episodes.remove(path)
    }

    /// Number of episodes
    pub fn len(&self) -> usize {
        self.episodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }

    /// Any external id keeps a show alive even with no episodes on disk
    pub fn is_anchored(&self) -> bool {
        self.show_id.is_some() || self.list_id.is_some()
    }

    /// Episodes sorted for display
    pub fn episodes_by_number(&self) -> Vec<&Episode> {
        let mut episodes: Vec<&Episode> = self.episodes.values().collect();
        episodes.sort_by(|a, b| a.cmp_by_number(b));
        episodes
    }
}
