// src/services/sync_engine.rs
//
// Sync Engine - in-memory ShowList <-> library store
//
// CRITICAL RULES:
// - Exclusive owner of the store handle
// - Every multi-row write runs in ONE transaction
// - Keys and adopted state reach the in-memory model only after commit, so a
//   failed write leaves the model as it was
// - Stored episodes missing from a scan are reported, never purged implicitly

use rusqlite::Connection;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;

use crate::db::LibraryStore;
use crate::domain::{validate_episode, validate_show, Episode, EpisodeState, RowKey, Show, ShowList};
use crate::error::{AppError, AppResult};
use crate::repositories::{
    EpisodeRepository, ShowRepository, SqliteEpisodeRepository, SqliteShowRepository,
};

/// Titles in `current` with no stored row, sorted
pub fn delta_shows<'a>(
    current: impl IntoIterator<Item = &'a str>,
    stored: &HashSet<String>,
) -> Vec<String> {
    let mut added: Vec<String> = current
        .into_iter()
        .filter(|title| !stored.contains(*title))
        .map(str::to_string)
        .collect();
    added.sort();
    added.dedup();
    added
}

/// Path differences between a show in memory and its stored rows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EpisodeDelta {
    /// In memory, not stored yet
    pub added: Vec<PathBuf>,
    /// Stored, absent from memory
    pub removed: Vec<PathBuf>,
}

impl EpisodeDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

pub fn delta_episodes(show: &Show, stored_paths: &HashSet<PathBuf>) -> EpisodeDelta {
    let added = show
        .episodes
        .keys()
        .filter(|path| !stored_paths.contains(*path))
        .cloned()
        .collect();

    let mut removed: Vec<PathBuf> = stored_paths
        .iter()
        .filter(|path| !show.contains(path))
        .cloned()
        .collect();
    removed.sort();

    EpisodeDelta { added, removed }
}

/// Outcome of `SyncEngine::sync_library`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub shows_added: Vec<String>,
    pub episodes_added: usize,
    pub numbers_updated: usize,
    /// Stored episodes absent from the synced list, per show. Still in the store.
    pub missing: BTreeMap<String, Vec<PathBuf>>,
}

impl SyncReport {
    /// `true` when the sync wrote nothing
    pub fn is_noop(&self) -> bool {
        self.shows_added.is_empty() && self.episodes_added == 0 && self.numbers_updated == 0
    }

    pub fn missing_count(&self) -> usize {
        self.missing.values().map(Vec::len).sum()
    }
}

/// Outcome of `SyncEngine::purge_missing_episodes`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    pub removed: Vec<PathBuf>,
    /// The show row went too: no episodes left and no external id anchoring it
    pub show_deleted: bool,
}

/// Keys handed out by a write, applied to the model once the write committed
struct AssignedKeys {
    show: RowKey,
    episodes: Vec<(PathBuf, RowKey)>,
}

impl AssignedKeys {
    fn apply(self, show: &mut Show) {
        show.key = Some(self.show);
        for (path, key) in self.episodes {
            if let Some(episode) = show.episode_mut(&path) {
                episode.key = Some(key);
            }
        }
    }
}

pub struct SyncEngine {
    store: LibraryStore,
}

impl SyncEngine {
    pub fn new(store: LibraryStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &LibraryStore {
        &self.store
    }

    /// Release the store
    pub fn close(self) {
        self.store.close();
    }

    /// Rebuild the whole library (keys, external ids, numbers, states) from the store
    pub fn load_library(&self) -> AppResult<ShowList> {
        let conn = self.store.connection()?;
        let show_repo = SqliteShowRepository::new(&conn);
        let episode_repo = SqliteEpisodeRepository::new(&conn);

        let mut library = ShowList::new();
        for mut show in show_repo.list_all()? {
            if let Some(key) = show.key {
                for episode in episode_repo.list_by_show(key)? {
                    show.add_or_update_episode(episode);
                }
            }
            library.add(show);
        }

        log::info!(
            "Loaded {} show(s) with {} episode(s) from the store",
            library.len(),
            library.episode_count()
        );
        Ok(library)
    }

    /// Reconcile `shows` (usually a fresh scan) with the store in one transaction.
    ///
    /// 1. Paths already stored under another title move to that title
    /// 2. Unknown shows and episodes are inserted, episodes as NEW
    /// 3. Known episodes adopt their stored key and state; changed numbers are written
    /// 4. Stored episodes absent from `shows` are reported, not deleted
    pub fn sync_library(&self, shows: &mut ShowList) -> AppResult<SyncReport> {
        let mut conn = self.store.connection()?;
        let tx = conn.transaction()?;
        let (reconciled, report) = reconcile(&tx, shows)?;
        tx.commit()?;

        *shows = reconciled;

        for (title, paths) in &report.missing {
            log::warn!(
                "{} stored episode(s) of {:?} missing on disk, kept in the store",
                paths.len(),
                title
            );
        }
        log::info!(
            "Sync: {} show(s) added, {} episode(s) added, {} number(s) updated, {} missing",
            report.shows_added.len(),
            report.episodes_added,
            report.numbers_updated,
            report.missing_count()
        );
        Ok(report)
    }

    /// Upsert the show row and every episode of the show (atomic)
    pub fn save_show(&self, show: &mut Show) -> AppResult<()> {
        let mut conn = self.store.connection()?;
        let tx = conn.transaction()?;
        let keys = write_show(&tx, show)?;
        tx.commit()?;

        keys.apply(show);
        Ok(())
    }

    /// `save_show` for every show of the list, all in one transaction
    pub fn save_show_list(&self, shows: &mut ShowList) -> AppResult<()> {
        let mut conn = self.store.connection()?;
        let tx = conn.transaction()?;

        let mut assigned = Vec::with_capacity(shows.len());
        for show in shows.iter() {
            assigned.push((show.title.clone(), write_show(&tx, show)?));
        }
        tx.commit()?;

        let count = assigned.len();
        for (title, keys) in assigned {
            if let Some(show) = shows.get_mut(&title) {
                keys.apply(show);
            }
        }
        log::info!("Saved {} show(s)", count);
        Ok(())
    }

    /// Upsert one episode row.
    ///
    /// Without `parent` the owning show is resolved through the episode's key.
    pub fn save_episode(&self, episode: &mut Episode, parent: Option<&Show>) -> AppResult<()> {
        let conn = self.store.connection()?;
        let show_repo = SqliteShowRepository::new(&conn);

        let show_key = match parent {
            Some(show) => match show.key {
                Some(key) => key,
                None => show_repo
                    .find_by_title(&show.title)?
                    .and_then(|stored| stored.key)
                    .ok_or_else(|| AppError::NotPersisted(show.title.clone()))?,
            },
            None => {
                let episode_key = episode
                    .key
                    .ok_or_else(|| AppError::NotPersisted(episode.path.display().to_string()))?;
                show_repo
                    .find_by_episode(episode_key)?
                    .ok_or(AppError::NotFound)?
            }
        };

        validate_episode(episode)?;
        let key = SqliteEpisodeRepository::new(&conn).save(show_key, episode)?;
        episode.key = Some(key);
        Ok(())
    }

    /// Rename a show in the store and in memory (atomic).
    ///
    /// Renaming onto a stored title merges: episodes move to that row and the old
    /// row is deleted. Otherwise the row keeps its key and only the title changes.
    pub fn rename_show(&self, shows: &mut ShowList, old: &str, new: &str) -> AppResult<()> {
        let show = shows
            .get(old)
            .ok_or_else(|| AppError::ShowNotFound(old.to_string()))?;
        if old == new {
            return Ok(());
        }

        let mut conn = self.store.connection()?;
        let tx = conn.transaction()?;
        let renamed_key = {
            let show_repo = SqliteShowRepository::new(&tx);
            let episode_repo = SqliteEpisodeRepository::new(&tx);

            let source = match show.key {
                Some(key) => Some(key),
                None => show_repo.find_by_title(old)?.and_then(|stored| stored.key),
            };
            let target = show_repo.find_by_title(new)?.and_then(|stored| stored.key);

            match (source, target) {
                (Some(source), Some(target)) => {
                    let moved = episode_repo.move_to_show(source, target)?;
                    show_repo.fill_external_ids(target, show.show_id, show.list_id)?;
                    show_repo.delete(source)?;
                    log::info!("Merged {:?} into {:?}, {} episode(s) moved", old, new, moved);
                    Some(target)
                }
                (Some(source), None) => {
                    show_repo.rename(source, new)?;
                    log::info!("Renamed {:?} to {:?}", old, new);
                    Some(source)
                }
                (None, target) => target,
            }
        };
        tx.commit()?;

        shows.rename(old, new);
        if let (Some(key), Some(renamed)) = (renamed_key, shows.get_mut(new)) {
            renamed.key = Some(key);
        }
        Ok(())
    }

    /// Hard delete of a show and all of its episode rows, then drop it from memory
    pub fn delete_show(&self, shows: &mut ShowList, title: &str) -> AppResult<Show> {
        let show = shows
            .get(title)
            .ok_or_else(|| AppError::ShowNotFound(title.to_string()))?;

        let mut conn = self.store.connection()?;
        let tx = conn.transaction()?;
        {
            let show_repo = SqliteShowRepository::new(&tx);
            let episode_repo = SqliteEpisodeRepository::new(&tx);

            let key = match show.key {
                Some(key) => Some(key),
                None => show_repo.find_by_title(title)?.and_then(|stored| stored.key),
            };
            if let Some(key) = key {
                let episodes = episode_repo.delete_by_show(key)?;
                show_repo.delete(key)?;
                log::info!("Deleted {:?} with {} episode row(s)", title, episodes);
            }
        }
        tx.commit()?;

        shows
            .remove(title)
            .ok_or_else(|| AppError::ShowNotFound(title.to_string()))
    }

    /// Every non-watched episode of the show becomes unwatched, in the store with
    /// one statement and then in memory. Returns the number of rows updated.
    pub fn mark_all_unseen(&self, show: &mut Show) -> AppResult<usize> {
        let key = show
            .key
            .ok_or_else(|| AppError::NotPersisted(show.title.clone()))?;

        let conn = self.store.connection()?;
        let updated = SqliteEpisodeRepository::new(&conn).mark_unseen_by_show(key)?;

        for episode in show.episodes.values_mut() {
            if episode.state != EpisodeState::Watched {
                episode.update_state(EpisodeState::Unwatched);
            }
        }
        Ok(updated)
    }

    /// Single-episode state change, e.g. WATCHED once the player reports completion
    pub fn set_episode_state(&self, episode: &mut Episode, state: EpisodeState) -> AppResult<()> {
        let key = episode
            .key
            .ok_or_else(|| AppError::NotPersisted(episode.path.display().to_string()))?;

        let conn = self.store.connection()?;
        if !SqliteEpisodeRepository::new(&conn).update_state(key, state)? {
            return Err(AppError::NotFound);
        }

        episode.update_state(state);
        Ok(())
    }

    /// Opt-in hard delete of stored episodes the in-memory show no longer has.
    ///
    /// A show left with no episodes and no external id is deleted as well.
    pub fn purge_missing_episodes(&self, show: &Show) -> AppResult<PurgeReport> {
        let mut conn = self.store.connection()?;
        let tx = conn.transaction()?;
        let report = {
            let show_repo = SqliteShowRepository::new(&tx);
            let episode_repo = SqliteEpisodeRepository::new(&tx);

            let key = match show.key {
                Some(key) => Some(key),
                None => show_repo.find_by_title(&show.title)?.and_then(|stored| stored.key),
            };
            let Some(key) = key else {
                return Ok(PurgeReport::default());
            };

            let stored_paths: HashSet<PathBuf> = episode_repo
                .list_by_show(key)?
                .into_iter()
                .map(|episode| episode.path)
                .collect();
            let delta = delta_episodes(show, &stored_paths);

            for path in &delta.removed {
                episode_repo.delete_by_path(key, path)?;
            }

            let show_deleted = show.is_empty() && !show.is_anchored();
            if show_deleted {
                show_repo.delete(key)?;
            }

            PurgeReport {
                removed: delta.removed,
                show_deleted,
            }
        };
        tx.commit()?;

        log::info!(
            "Purged {} missing episode(s) of {:?}{}",
            report.removed.len(),
            show.title,
            if report.show_deleted { ", show deleted" } else { "" }
        );
        Ok(report)
    }
}

/// Upsert `show` and all of its episodes on `conn`; keys are returned, not applied
fn write_show(conn: &Connection, show: &Show) -> AppResult<AssignedKeys> {
    validate_show(show)?;

    let show_repo = SqliteShowRepository::new(conn);
    let episode_repo = SqliteEpisodeRepository::new(conn);

    let show_key = match show.key {
        Some(key) if show_repo.update(key, show)? => key,
        _ => match show_repo.find_by_title(&show.title)?.and_then(|stored| stored.key) {
            Some(key) => {
                show_repo.update(key, show)?;
                key
            }
            None => show_repo.insert(show)?,
        },
    };

    let mut episodes = Vec::with_capacity(show.len());
    for episode in show.episodes.values() {
        episodes.push((episode.path.clone(), episode_repo.save(show_key, episode)?));
    }

    Ok(AssignedKeys {
        show: show_key,
        episodes,
    })
}

/// Build the reconciled copy of `shows` while writing the differences on `conn`
fn reconcile(conn: &Connection, shows: &ShowList) -> AppResult<(ShowList, SyncReport)> {
    let show_repo = SqliteShowRepository::new(conn);
    let episode_repo = SqliteEpisodeRepository::new(conn);

    let mut reconciled = route_to_stored_owners(shows, episode_repo.list_owners()?);
    let stored_titles = show_repo.list_titles()?;
    let added_titles: HashSet<String> = delta_shows(reconciled.titles(), &stored_titles)
        .into_iter()
        .collect();

    let mut report = SyncReport::default();
    for show in reconciled.iter_mut() {
        validate_show(show)?;

        let show_key = if added_titles.contains(&show.title) {
            report.shows_added.push(show.title.clone());
            show_repo.insert(show)?
        } else {
            let stored = show_repo
                .find_by_title(&show.title)?
                .ok_or_else(|| AppError::ShowNotFound(show.title.clone()))?;
            let key = stored.key.ok_or(AppError::NotFound)?;
            show_repo.fill_external_ids(key, show.show_id, show.list_id)?;
            show.show_id = show.show_id.or(stored.show_id);
            show.list_id = show.list_id.or(stored.list_id);
            key
        };
        show.key = Some(show_key);

        let stored_episodes = episode_repo.list_by_show(show_key)?;
        let stored_paths: HashSet<PathBuf> = stored_episodes
            .iter()
            .map(|episode| episode.path.clone())
            .collect();
        let delta = delta_episodes(show, &stored_paths);

        for path in &delta.added {
            if let Some(episode) = show.episode_mut(path) {
                episode.update_state(EpisodeState::New);
                episode.key = Some(episode_repo.insert(show_key, episode)?);
                report.episodes_added += 1;
            }
        }

        for stored in stored_episodes {
            let Some(current) = show.episode_mut(&stored.path) else {
                continue;
            };
            if current.number != stored.number {
                if let Some(key) = stored.key {
                    episode_repo.update_number(key, current.number)?;
                    report.numbers_updated += 1;
                }
            }
            current.key = stored.key;
            current.update_state(stored.state);
        }

        if !delta.removed.is_empty() {
            report.missing.insert(show.title.clone(), delta.removed);
        }
    }

    report.shows_added.sort();
    Ok((reconciled, report))
}

/// Copy of `shows` where every path already stored sits under its stored owner.
///
/// A scanned show whose paths all belong to other shows is dropped.
fn route_to_stored_owners(shows: &ShowList, owners: Vec<(PathBuf, String)>) -> ShowList {
    let owners: HashMap<PathBuf, String> = owners.into_iter().collect();

    let mut routed = ShowList::new();
    for show in shows.iter() {
        let mut shell = show.clone();
        shell.episodes.clear();
        let mut keep_shell = show.is_empty();

        for episode in show.episodes.values() {
            match owners.get(&episode.path) {
                Some(owner) if owner != &show.title => {
                    log::debug!(
                        "{} stays with stored show {:?} (scanned as {:?})",
                        episode.path.display(),
                        owner,
                        show.title
                    );
                    routed.get_or_create(owner).add_or_update_episode(episode.clone());
                }
                _ => {
                    keep_shell = true;
                    shell.add_or_update_episode(episode.clone());
                }
            }
        }

        if keep_shell {
            routed.add(shell);
        }
    }
    routed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_shows_is_a_sorted_difference() {
        let stored: HashSet<String> = ["B".to_string()].into_iter().collect();
        assert_eq!(delta_shows(["C", "B", "A"], &stored), vec!["A", "C"]);
        assert!(delta_shows(["B"], &stored).is_empty());
    }

    #[test]
    fn test_delta_episodes_by_path() {
        let show = Show::with_episodes("X", [Episode::new("/v/a.mkv"), Episode::new("/v/b.mkv")]);
        let stored: HashSet<PathBuf> = [PathBuf::from("/v/b.mkv"), PathBuf::from("/v/c.mkv")]
            .into_iter()
            .collect();

        let delta = delta_episodes(&show, &stored);
        assert_eq!(delta.added, vec![PathBuf::from("/v/a.mkv")]);
        assert_eq!(delta.removed, vec![PathBuf::from("/v/c.mkv")]);
        assert!(!delta.is_empty());
    }

    #[test]
    fn test_report_noop_ignores_missing() {
        let mut report = SyncReport::default();
        report.missing.insert("X".to_string(), vec![PathBuf::from("/v/a.mkv")]);
        assert!(report.is_noop());
        assert_eq!(report.missing_count(), 1);
    }
}
