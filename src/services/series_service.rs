// src/services/series_service.rs
//
// Series Service - the library as the application sees it
//
// RULES:
// - Owns the live ShowList; every mutation goes through here
// - Filesystem work is delegated to DiscoveryEngine, store work to SyncEngine
// - Store errors leave the live list as it was before the call

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::LibraryConfig;
use crate::db::LibraryStore;
use crate::domain::{Episode, EpisodeState, Show, ShowList};
use crate::error::{AppError, AppResult};
use crate::services::discovery_engine::DiscoveryEngine;
use crate::services::sync_engine::{PurgeReport, SyncEngine, SyncReport};

/// One row of the show overview
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShowOverview {
    pub title: String,
    pub episode_count: usize,
    pub unwatched_count: usize,
}

/// Display shape of one episode
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EpisodeView {
    pub path: PathBuf,
    pub name: String,
    pub number: i32,
    pub state: EpisodeState,
}

impl From<&Episode> for EpisodeView {
    fn from(episode: &Episode) -> Self {
        Self {
            path: episode.path.clone(),
            name: episode.name.clone(),
            number: episode.number,
            state: episode.state,
        }
    }
}

pub struct SeriesService {
    roots: Vec<PathBuf>,
    discovery: DiscoveryEngine,
    sync: SyncEngine,
    shows: ShowList,
}

impl SeriesService {
    pub fn new(config: &LibraryConfig, store: LibraryStore) -> Self {
        Self {
            roots: config.local_paths.clone(),
            discovery: DiscoveryEngine::new(config),
            sync: SyncEngine::new(store),
            shows: ShowList::new(),
        }
    }

    /// Open the store named by the configuration
    pub fn open(config: &LibraryConfig) -> AppResult<Self> {
        let store = LibraryStore::open(&config.database_path)?;
        Ok(Self::new(config, store))
    }

    pub fn shows(&self) -> &ShowList {
        &self.shows
    }

    pub fn sync_engine(&self) -> &SyncEngine {
        &self.sync
    }

    /// Load the stored library; shows already in memory are folded in by path
    pub fn fetch_shows_from_db(&mut self) -> AppResult<usize> {
        let mut library = self.sync.load_library()?;
        library.merge_scan(std::mem::take(&mut self.shows));
        self.shows = library;
        Ok(self.shows.len())
    }

    /// Scan every root into memory without touching the store.
    /// Returns the number of episodes not known before.
    pub fn fetch_shows_from_files(&mut self) -> AppResult<usize> {
        let scan = self.discovery.traverse(&self.roots)?;
        Ok(self.shows.merge_scan(scan))
    }

    /// Targeted scan of one show into memory. Returns the number of new episodes.
    pub fn fetch_show_from_files(&mut self, name: &str) -> AppResult<usize> {
        let show = self.discovery.discover_show(name, &self.roots)?;
        let scan: ShowList = std::iter::once(show).collect();
        Ok(self.shows.merge_scan(scan))
    }

    /// Scan every root and reconcile the scan with the store.
    ///
    /// The reconciled scan becomes the live list, so keys and stored watch state
    /// are current; live-only data (episodes missing on disk, shows without files)
    /// is carried over.
    pub fn refresh(&mut self) -> AppResult<SyncReport> {
        let mut scan = self.discovery.traverse(&self.roots)?;
        let report = self.sync.sync_library(&mut scan)?;

        let live = std::mem::replace(&mut self.shows, scan);
        self.shows.absorb(live);
        Ok(report)
    }

    pub fn shows_overview(&self) -> Vec<ShowOverview> {
        self.shows
            .iter()
            .map(|show| ShowOverview {
                title: show.title.clone(),
                episode_count: show.len(),
                unwatched_count: show
                    .episodes
                    .values()
                    .filter(|e| e.state != EpisodeState::Watched)
                    .count(),
            })
            .collect()
    }

    /// Episodes of one show, ordered by number
    pub fn episodes(&self, title: &str) -> AppResult<Vec<EpisodeView>> {
        let show = self.show(title)?;
        Ok(show
            .episodes_by_number()
            .into_iter()
            .map(EpisodeView::from)
            .collect())
    }

    pub fn save_shows(&mut self) -> AppResult<()> {
        self.sync.save_show_list(&mut self.shows)
    }

    pub fn rename_show(&mut self, old: &str, new: &str) -> AppResult<()> {
        self.sync.rename_show(&mut self.shows, old, new)
    }

    pub fn delete_show(&mut self, title: &str) -> AppResult<Show> {
        self.sync.delete_show(&mut self.shows, title)
    }

    pub fn mark_all_unseen(&mut self, title: &str) -> AppResult<usize> {
        let show = self
            .shows
            .get_mut(title)
            .ok_or_else(|| AppError::ShowNotFound(title.to_string()))?;
        self.sync.mark_all_unseen(show)
    }

    /// Completion reported by the player
    pub fn mark_episode_watched(&mut self, title: &str, path: &Path) -> AppResult<()> {
        let episode = self
            .shows
            .get_mut(title)
            .ok_or_else(|| AppError::ShowNotFound(title.to_string()))?
            .episode_mut(path)
            .ok_or(AppError::NotFound)?;
        self.sync.set_episode_state(episode, EpisodeState::Watched)
    }

    /// Forget episodes whose file is gone, in memory and in the store
    pub fn purge_missing(&mut self, title: &str) -> AppResult<PurgeReport> {
        let mut remaining = self.show(title)?.clone();
        remaining.episodes.retain(|path, _| path.is_file());

        let report = self.sync.purge_missing_episodes(&remaining)?;
        if report.show_deleted {
            self.shows.remove(title);
        } else if let Some(show) = self.shows.get_mut(title) {
            *show = remaining;
        }
        Ok(report)
    }

    /// The live library as JSON: title -> show with its episodes
    pub fn snapshot_json(&self) -> AppResult<String> {
        Ok(serde_json::to_string(&self.shows)?)
    }

    pub fn close(self) {
        self.sync.close();
    }

    fn show(&self, title: &str) -> AppResult<&Show> {
        self.shows
            .get(title)
            .ok_or_else(|| AppError::ShowNotFound(title.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        media: TempDir,
        _data: TempDir,
        config: LibraryConfig,
    }

    fn fixture(files: &[&str]) -> Fixture {
        let media = TempDir::new().unwrap();
        let data = TempDir::new().unwrap();
        for name in files {
            fs::write(media.path().join(name), b"").unwrap();
        }
        let config = LibraryConfig {
            local_paths: vec![media.path().to_path_buf()],
            search_subfolders: false,
            database_path: data.path().join("ene").join("ene.db"),
            fuzzy_threshold: 90,
        };
        Fixture { media, _data: data, config }
    }

    #[test]
    fn test_refresh_then_reload_from_store() {
        let fx = fixture(&["Mushishi - 01.mkv", "Mushishi - 02.mkv", "Mushishi NCOP.mkv"]);
        let mut service = SeriesService::open(&fx.config).unwrap();

        let report = service.refresh().unwrap();
        assert_eq!(report.shows_added, vec!["Mushishi"]);
        assert_eq!(report.episodes_added, 2);

        let first = fx.media.path().join("Mushishi - 01.mkv");
        service.mark_episode_watched("Mushishi", &first).unwrap();
        assert_eq!(
            service.shows_overview(),
            vec![ShowOverview {
                title: "Mushishi".to_string(),
                episode_count: 2,
                unwatched_count: 1,
            }]
        );
        service.close();

        let mut reopened = SeriesService::open(&fx.config).unwrap();
        assert_eq!(reopened.fetch_shows_from_db().unwrap(), 1);
        let episodes = reopened.episodes("Mushishi").unwrap();
        let states: Vec<(i32, EpisodeState)> = episodes.iter().map(|e| (e.number, e.state)).collect();
        assert_eq!(states, vec![(1, EpisodeState::Watched), (2, EpisodeState::New)]);

        assert!(reopened.refresh().unwrap().is_noop());
        assert_eq!(reopened.shows().episode_count(), 2);
    }

    #[test]
    fn test_files_only_until_saved() {
        let fx = fixture(&["bar - 01.mkv"]);
        let mut service = SeriesService::open(&fx.config).unwrap();

        assert_eq!(service.fetch_shows_from_files().unwrap(), 1);
        assert!(service.sync_engine().load_library().unwrap().is_empty());
        assert!(matches!(
            service.mark_all_unseen("bar"),
            Err(AppError::NotPersisted(_))
        ));

        service.save_shows().unwrap();
        assert!(service.shows().get("bar").unwrap().key.is_some());
        assert_eq!(service.mark_all_unseen("bar").unwrap(), 1);
        assert_eq!(service.sync_engine().load_library().unwrap().episode_count(), 1);
    }

    #[test]
    fn test_refresh_after_file_scan_adopts_keys() {
        let fx = fixture(&["bar - 01.mkv"]);
        let mut service = SeriesService::open(&fx.config).unwrap();
        let path = fx.media.path().join("bar - 01.mkv");

        service.fetch_shows_from_files().unwrap();
        service.refresh().unwrap();

        let show = service.shows().get("bar").unwrap();
        assert!(show.key.is_some());
        assert!(show.episode(&path).unwrap().key.is_some());
        assert_eq!(service.mark_all_unseen("bar").unwrap(), 1);
        service.mark_episode_watched("bar", &path).unwrap();
        assert_eq!(service.shows_overview()[0].unwatched_count, 0);
    }

    #[test]
    fn test_refresh_after_file_scan_keeps_stored_state() {
        let fx = fixture(&["bar - 01.mkv", "bar - 02.mkv"]);
        let first = fx.media.path().join("bar - 01.mkv");
        {
            let mut service = SeriesService::open(&fx.config).unwrap();
            service.refresh().unwrap();
            service.mark_episode_watched("bar", &first).unwrap();
            service.close();
        }

        let mut reopened = SeriesService::open(&fx.config).unwrap();
        reopened.fetch_shows_from_files().unwrap();
        assert!(reopened.refresh().unwrap().is_noop());

        let show = reopened.shows().get("bar").unwrap();
        assert!(show.key.is_some());
        let episode = show.episode(&first).unwrap();
        assert!(episode.key.is_some());
        assert_eq!(episode.state, EpisodeState::Watched);
        assert!(show.episodes.values().all(|e| e.key.is_some()));
    }

    #[test]
    fn test_fetch_single_show() {
        let fx = fixture(&["isekai foo e1.mkv", "isekai foo e2.mkv", "bar - 01.mkv"]);
        let mut service = SeriesService::open(&fx.config).unwrap();

        assert_eq!(service.fetch_show_from_files("isekai foo").unwrap(), 2);
        assert_eq!(service.shows().titles().collect::<Vec<_>>(), vec!["isekai foo"]);
        let numbers: Vec<i32> = service
            .episodes("isekai foo")
            .unwrap()
            .iter()
            .map(|e| e.number)
            .collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[test]
    fn test_purge_missing_after_file_removed() {
        let fx = fixture(&["X - 01.mkv", "X - 02.mkv"]);
        let mut service = SeriesService::open(&fx.config).unwrap();
        service.refresh().unwrap();

        fs::remove_file(fx.media.path().join("X - 02.mkv")).unwrap();
        let report = service.refresh().unwrap();
        assert_eq!(report.missing_count(), 1);
        assert_eq!(service.shows().get("X").unwrap().len(), 2);

        let purge = service.purge_missing("X").unwrap();
        assert_eq!(purge.removed, vec![fx.media.path().join("X - 02.mkv")]);
        assert_eq!(service.shows().get("X").unwrap().len(), 1);

        fs::remove_file(fx.media.path().join("X - 01.mkv")).unwrap();
        let purge = service.purge_missing("X").unwrap();
        assert!(purge.show_deleted);
        assert!(!service.shows().contains("X"));
    }

    #[test]
    fn test_rename_delete_and_snapshot() {
        let fx = fixture(&["old - 01.mkv"]);
        let mut service = SeriesService::open(&fx.config).unwrap();
        service.refresh().unwrap();

        service.rename_show("old", "New Title").unwrap();
        let snapshot: serde_json::Value =
            serde_json::from_str(&service.snapshot_json().unwrap()).unwrap();
        assert!(snapshot.get("New Title").is_some());
        assert!(snapshot.get("old").is_none());

        // a rescan keeps the file with the renamed show
        assert!(service.refresh().unwrap().shows_added.is_empty());
        assert!(!service.shows().contains("old"));

        let removed = service.delete_show("New Title").unwrap();
        assert_eq!(removed.len(), 1);
        assert!(service.shows().is_empty());
        assert!(matches!(
            service.episodes("New Title"),
            Err(AppError::ShowNotFound(_))
        ));
    }
}
