// src/domain/show_list.rs
//
// Title-keyed collection of shows.
//
// Lookups never create entries implicitly; creation goes through
// `get_or_create` so the side effect is visible at the call site.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;

use crate::domain::show::{EpisodeMap, Show};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShowList {
    shows: BTreeMap<String, Show>,
}

impl ShowList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the show with `title`, inserting an empty one first if absent
    pub fn get_or_create(&mut self, title: &str) -> &mut Show {
        self.shows
            .entry(title.to_string())
            .or_insert_with(|| Show::new(title))
    }

    /// Insert the show, or merge it into the show already holding its title
    pub fn add(&mut self, show: Show) {
        match self.shows.get_mut(&show.title) {
            Some(existing) => existing.merge(show),
            None => {
                self.shows.insert(show.title.clone(), show);
            }
        }
    }

    pub fn get(&self, title: &str) -> Option<&Show> {
        self.shows.get(title)
    }

    pub fn get_mut(&mut self, title: &str) -> Option<&mut Show> {
        self.shows.get_mut(title)
    }

    pub fn get_episodes(&self, title: &str) -> Option<&EpisodeMap> {
        self.shows.get(title).map(|show| &show.episodes)
    }

    pub fn contains(&self, title: &str) -> bool {
        self.shows.contains_key(title)
    }

    pub fn remove(&mut self, title: &str) -> Option<Show> {
        self.shows.remove(title)
    }

    /// Move the show stored under `old` to `new`, merging into `new` if it exists.
    /// Returns false when `old` is absent.
    pub fn rename(&mut self, old: &str, new: &str) -> bool {
        match self.shows.remove(old) {
            Some(mut show) => {
                show.title = new.to_string();
                self.add(show);
                true
            }
            None => false,
        }
    }

    /// Fold a fresh discovery result into this list.
    ///
    /// Paths already owned by a show stay with that show, whatever title the scan
    /// produced for them; only unknown paths land under the scanned title, which
    /// brings its key and external ids along when it is new to this list.
    /// Returns the number of episodes that were not known before.
    pub fn merge_scan(&mut self, scan: ShowList) -> usize {
        let owners: HashMap<PathBuf, String> = self
            .shows
            .values()
            .flat_map(|show| {
                show.episodes
                    .keys()
                    .map(move |path| (path.clone(), show.title.clone()))
            })
            .collect();

        let mut added = 0;
        for mut show in scan.shows.into_values() {
            let mut unowned = EpisodeMap::new();
            for (path, episode) in std::mem::take(&mut show.episodes) {
                match owners.get(&path) {
                    Some(owner) => self.get_or_create(owner).add_or_update_episode(episode),
                    None => {
                        unowned.insert(path, episode);
                    }
                }
            }

            if unowned.is_empty() {
                continue;
            }
            added += unowned.len();
            show.episodes = unowned;
            self.add(show);
        }
        added
    }

    /// Add whatever `other` holds that this list does not: unknown paths and
    /// shows. Paths this list already owns are left exactly as they are.
    ///
    /// Used to carry live-only data (episodes missing on disk, empty shows) over
    /// into a freshly reconciled list. Returns the number of episodes added.
    pub fn absorb(&mut self, other: ShowList) -> usize {
        let known: HashSet<PathBuf> = self
            .shows
            .values()
            .flat_map(|show| show.episodes.keys().cloned())
            .collect();

        let mut added = 0;
        for mut show in other.shows.into_values() {
            let had_episodes = !show.is_empty();
            show.episodes.retain(|path, _| !known.contains(path));
            if had_episodes && show.is_empty() {
                continue;
            }
            added += show.len();
            self.add(show);
        }
        added
    }

    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.shows.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Show> {
        self.shows.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Show> {
        self.shows.values_mut()
    }

    /// (title, episode count) for every show
    pub fn overview(&self) -> impl Iterator<Item = (&str, usize)> {
        self.shows.values().map(|show| (show.title.as_str(), show.len()))
    }

    pub fn episode_count(&self) -> usize {
        self.shows.values().map(Show::len).sum()
    }

    pub fn len(&self) -> usize {
        self.shows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shows.is_empty()
    }
}

impl IntoIterator for ShowList {
    type Item = Show;
    type IntoIter = std::collections::btree_map::IntoValues<String, Show>;

    fn into_iter(self) -> Self::IntoIter {
        self.shows.into_values()
    }
}

impl FromIterator<Show> for ShowList {
    fn from_iter<I: IntoIterator<Item = Show>>(iter: I) -> Self {
        let mut list = ShowList::new();
        for show in iter {
            list.add(show);
        }
        list
    }
}
