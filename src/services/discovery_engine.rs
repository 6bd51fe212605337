// src/services/discovery_engine.rs
//
// Discovery Engine - filesystem -> ShowList
//
// RULES:
// - Reads the filesystem, never the store
// - A scan is all-or-nothing: results are built in a fresh ShowList and only
//   returned when every root was read successfully
// - Directory enumeration order is kept; nothing is sorted here

use regex::Regex;
use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use walkdir::WalkDir;

use crate::config::{is_video_extension, LibraryConfig};
use crate::domain::naming::TitleMatcher;
use crate::domain::{clean_title, extract_episode_number, match_form, Episode, Show, ShowList};
use crate::error::{AppError, AppResult};

/// Creditless openings/endings and OP/ED rips; literal markers, case-sensitive
static THEME_SONG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"NCOP|NCED| OP\d+| ED\d+").unwrap());

/// `true` for opening/ending theme files that are never episodes
pub fn is_theme_song(filename: &str) -> bool {
    THEME_SONG.is_match(filename)
}

/// Wildcard pattern for a targeted search: every whitespace-delimited token of
/// `name`, lower-cased and escaped, wrapped in `.*`
pub fn search_pattern(name: &str) -> String {
    let mut pattern = String::from(".*");
    for token in name.split_whitespace() {
        pattern.push_str(&regex::escape(&token.to_lowercase()));
        pattern.push_str(".*");
    }
    pattern
}

pub struct DiscoveryEngine {
    search_subfolders: bool,
    matcher: TitleMatcher,
    database_file_name: Option<OsString>,
}

impl DiscoveryEngine {
    pub fn new(config: &LibraryConfig) -> Self {
        Self {
            search_subfolders: config.search_subfolders,
            matcher: TitleMatcher::new(config.fuzzy_threshold),
            database_file_name: config.database_file_name().map(OsStr::to_os_string),
        }
    }

    /// Recursively scan every root and group the video files found into shows.
    ///
    /// Any unreadable root or directory fails the whole scan.
    pub fn traverse(&self, roots: &[PathBuf]) -> AppResult<ShowList> {
        let mut shows = ShowList::new();
        let mut files_added = 0;

        for root in roots {
            let root = std::path::absolute(root)?;
            for (directory, filenames) in files_by_directory(&root)? {
                if self.holds_database(&filenames) {
                    log::debug!(
                        "Skipping {}: it holds the library database",
                        directory.display()
                    );
                    continue;
                }
                files_added += self.discover(&directory, &filenames, &mut shows);
            }
        }

        log::info!(
            "Scanned {} root(s): {} episode file(s) in {} show(s)",
            roots.len(),
            files_added,
            shows.len()
        );
        Ok(shows)
    }

    /// Match the files of one directory to shows, creating shows as needed.
    ///
    /// Returns the number of files accepted as episodes.
    pub fn discover<I, S>(&self, base_path: &Path, filenames: I, shows: &mut ShowList) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut accepted = 0;

        for name in filenames {
            let path = base_path.join(name.as_ref());
            if !is_video_extension(&path) {
                log::debug!("Ignoring {}: unsupported extension", path.display());
                continue;
            }

            let filename = name.as_ref().to_string_lossy();
            if is_theme_song(&filename) {
                log::debug!("Ignoring {}: opening/ending theme", path.display());
                continue;
            }

            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let cleaned = clean_title(&stem);
            let target = self.resolve_title(&cleaned.title, shows);

            let mut episode = Episode::new(path);
            episode.number = extract_episode_number(&match_form(&filename), &cleaned.literal);
            shows.get_or_create(&target).add_or_update_episode(episode);
            accepted += 1;
        }

        accepted
    }

    /// Every entry of `directory` whose lower-cased name matches `name`'s tokens.
    ///
    /// A matching directory is taken as the show's folder: its files become the
    /// result and the search stops there. Non-matching directories are searched
    /// only when subfolder search is enabled.
    pub fn find_episodes(&self, name: &str, directory: &Path) -> AppResult<Vec<PathBuf>> {
        if name.split_whitespace().next().is_none() {
            return Ok(Vec::new());
        }

        let pattern = Regex::new(&search_pattern(name))
            .map_err(|e| AppError::Other(format!("Invalid search pattern for {:?}: {}", name, e)))?;
        self.search(&pattern, directory)
    }

    /// Targeted refresh of one show: every matching video file under the roots
    pub fn discover_show(&self, name: &str, roots: &[PathBuf]) -> AppResult<Show> {
        let mut show = Show::new(name);

        for root in roots {
            let root = std::path::absolute(root)?;
            for path in self.find_episodes(name, &root)? {
                if !is_video_extension(&path) {
                    continue;
                }
                let filename = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                if is_theme_song(&filename) {
                    continue;
                }

                let mut episode = Episode::new(path);
                episode.number = extract_episode_number(&match_form(&filename), name);
                show.add_or_update_episode(episode);
            }
        }

        log::info!("Found {} episode(s) for {:?}", show.len(), name);
        Ok(show)
    }

    fn search(&self, pattern: &Regex, directory: &Path) -> AppResult<Vec<PathBuf>> {
        let mut episodes = Vec::new();

        for entry in std::fs::read_dir(directory)? {
            let path = entry?.path();
            let entry_name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_lowercase())
                .unwrap_or_default();

            if pattern.is_match(&entry_name) {
                if path.is_dir() {
                    return list_file_names(&path)
                        .map(|names| names.into_iter().map(|n| path.join(n)).collect());
                }
                episodes.push(path);
            } else if path.is_dir() && self.search_subfolders {
                episodes.extend(self.search(pattern, &path)?);
            }
        }

        Ok(episodes)
    }

    /// Exact title first, then the closest known title above the threshold
    fn resolve_title(&self, title: &str, shows: &ShowList) -> String {
        if shows.contains(title) {
            return title.to_string();
        }
        match self.matcher.best_match(title, shows.titles()) {
            Some(existing) => {
                log::debug!("Grouping {:?} under existing show {:?}", title, existing);
                existing.to_string()
            }
            None => title.to_string(),
        }
    }

    fn holds_database(&self, filenames: &[OsString]) -> bool {
        match &self.database_file_name {
            Some(db_name) => filenames.iter().any(|name| name == db_name),
            None => false,
        }
    }
}

/// Every file under `root`, grouped by parent directory.
///
/// Directories keep the order WalkDir first reaches them; files keep their
/// enumeration order within a directory.
fn files_by_directory(root: &Path) -> AppResult<Vec<(PathBuf, Vec<OsString>)>> {
    let mut groups: Vec<(PathBuf, Vec<OsString>)> = Vec::new();
    let mut index: HashMap<PathBuf, usize> = HashMap::new();

    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(parent) = entry.path().parent() else {
            continue;
        };

        let slot = match index.get(parent) {
            Some(&slot) => slot,
            None => {
                groups.push((parent.to_path_buf(), Vec::new()));
                index.insert(parent.to_path_buf(), groups.len() - 1);
                groups.len() - 1
            }
        };
        groups[slot].1.push(entry.file_name().to_os_string());
    }

    Ok(groups)
}

/// Names of the regular files directly inside `directory`, in enumeration order
fn list_file_names(directory: &Path) -> AppResult<Vec<OsString>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(directory)? {
        let entry = entry?;
        if entry.path().is_file() {
            names.push(entry.file_name());
        }
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn engine(search_subfolders: bool) -> DiscoveryEngine {
        DiscoveryEngine::new(&LibraryConfig {
            local_paths: Vec::new(),
            search_subfolders,
            database_path: PathBuf::from("/data/ene/ene.db"),
            fuzzy_threshold: 90,
        })
    }

    fn touch(dir: &Path, names: &[&str]) {
        fs::create_dir_all(dir).unwrap();
        for name in names {
            fs::write(dir.join(name), b"").unwrap();
        }
    }

    fn sorted(mut paths: Vec<PathBuf>) -> Vec<PathBuf> {
        paths.sort();
        paths
    }

    #[test]
    fn test_search_pattern() {
        assert_eq!(search_pattern("foo bar"), ".*foo.*bar.*");
        assert_eq!(search_pattern("Re:Zero (2016)"), r".*re:zero.*\(2016\).*");
    }

    #[test]
    fn test_theme_songs() {
        assert!(is_theme_song("Show NCOP.mkv"));
        assert!(is_theme_song("Show NCED 2.mkv"));
        assert!(is_theme_song("Show OP1.mkv"));
        assert!(is_theme_song("Show ED2.mkv"));
        assert!(!is_theme_song("Show - 01.mkv"));
        assert!(!is_theme_song("Show op1.mkv"));
    }

    #[test]
    fn test_discover_filters_and_groups() {
        let mut shows = ShowList::new();
        let accepted = engine(false).discover(
            Path::new("/anime"),
            [
                "[Group] Mushishi - 01 [1080p].mkv",
                "[Group] Mushishi - 02 [1080p].mkv",
                "Mushishi - 02.srt",
                "Show NCOP.mkv",
                "Show OP1.mkv",
                "Show ED2.mkv",
                "Steins;Gate - 03.mp4",
            ],
            &mut shows,
        );

        assert_eq!(accepted, 3);
        assert_eq!(shows.titles().collect::<Vec<_>>(), vec!["Mushishi", "Steins;Gate"]);

        let mushishi = shows.get("Mushishi").unwrap();
        let numbers: Vec<i32> = mushishi.episodes_by_number().iter().map(|e| e.number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert!(shows.iter().all(|show| show
            .episodes
            .values()
            .all(|e| !e.name.contains("OP1") && !e.name.contains("ED2") && !e.name.contains("NCOP"))));
    }

    #[test]
    fn test_discover_numbers_underscored_and_season_names() {
        let mut shows = ShowList::new();
        engine(false).discover(
            Path::new("/anime"),
            [
                "[SubsPlease] Mob_Psycho_100_-_07 (1080p).mkv",
                "[Group] Show S2 - 03.mkv",
                "[Group] Show_S2_-_04.mkv",
            ],
            &mut shows,
        );

        let mob = shows.get("Mob Psycho 100").unwrap();
        let numbers: Vec<i32> = mob.episodes.values().map(|e| e.number).collect();
        assert_eq!(numbers, vec![7]);

        let season = shows.get("Show Season 2").unwrap();
        let numbers: Vec<i32> = season.episodes_by_number().iter().map(|e| e.number).collect();
        assert_eq!(numbers, vec![3, 4]);
    }

    #[test]
    fn test_discover_groups_near_titles() {
        let mut shows = ShowList::new();
        engine(false).discover(
            Path::new("/anime"),
            ["Steins Gate - 01.mkv", "Steins;Gate - 02.mkv"],
            &mut shows,
        );

        assert_eq!(shows.len(), 1);
        assert_eq!(shows.get("Steins Gate").unwrap().len(), 2);
    }

    #[test]
    fn test_traverse_recurses_and_skips_database_directory() {
        let root = TempDir::new().unwrap();
        touch(root.path(), &["foo - 01.mkv"]);
        touch(&root.path().join("nested").join("deeper"), &["foo - 02.mkv", "bar - 01.avi"]);
        touch(&root.path().join("data"), &["ene.db", "stray - 01.mkv"]);

        let shows = engine(false).traverse(&[root.path().to_path_buf()]).unwrap();

        assert_eq!(shows.get("foo").unwrap().len(), 2);
        assert_eq!(shows.get("bar").unwrap().len(), 1);
        assert!(shows.get("stray").is_none());
        for show in shows.iter() {
            for episode in show.episodes.values() {
                assert!(episode.path.is_absolute());
            }
        }
    }

    #[test]
    fn test_traverse_counts_each_file_once() {
        let root = TempDir::new().unwrap();
        touch(root.path(), &["foo - 01.mkv", "foo - 02.mkv"]);
        touch(&root.path().join("a"), &["foo - 03.mkv"]);
        touch(&root.path().join("a").join("b"), &["foo - 04.mkv", "notes.txt"]);

        let shows = engine(false).traverse(&[root.path().to_path_buf()]).unwrap();

        assert_eq!(shows.len(), 1);
        assert_eq!(shows.episode_count(), 4);
        let numbers: Vec<i32> = shows
            .get("foo")
            .unwrap()
            .episodes_by_number()
            .iter()
            .map(|e| e.number)
            .collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_traverse_missing_root_fails_whole_scan() {
        let root = TempDir::new().unwrap();
        touch(root.path(), &["foo - 01.mkv"]);
        let missing = root.path().join("does-not-exist");

        let result = engine(false).traverse(&[root.path().to_path_buf(), missing]);
        assert!(matches!(result, Err(AppError::Io(_))));
    }

    #[test]
    fn test_find_episodes_matches_tokens() {
        let root = TempDir::new().unwrap();
        let names: Vec<String> = (1..=5).map(|n| format!("isekai foo e{}.mkv", n)).collect();
        let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
        touch(root.path(), &name_refs);
        touch(root.path(), &["bar e1.mkv", "foo isekai e9.mkv"]);

        let found = engine(false).find_episodes("isekai foo", root.path()).unwrap();

        let expected: Vec<PathBuf> = names.iter().map(|n| root.path().join(n)).collect();
        assert_eq!(found.len(), 5);
        assert_eq!(sorted(found), sorted(expected));
    }

    #[test]
    fn test_find_episodes_takes_matching_folder_contents() {
        let root = TempDir::new().unwrap();
        let folder = root.path().join("[Group] Isekai Foo");
        touch(&folder, &["01.mkv", "02.mkv"]);
        touch(root.path(), &["unrelated.mkv"]);

        let found = engine(false).find_episodes("isekai foo", root.path()).unwrap();
        assert_eq!(
            sorted(found),
            vec![folder.join("01.mkv"), folder.join("02.mkv")]
        );
    }

    #[test]
    fn test_find_episodes_subfolder_option() {
        let root = TempDir::new().unwrap();
        let nested = root.path().join("Ongoing").join("Winter");
        touch(&nested, &["isekai foo - 01.mkv"]);

        assert!(engine(false).find_episodes("isekai foo", root.path()).unwrap().is_empty());
        assert_eq!(
            engine(true).find_episodes("isekai foo", root.path()).unwrap(),
            vec![nested.join("isekai foo - 01.mkv")]
        );
    }

    #[test]
    fn test_discover_show_filters_files() {
        let root = TempDir::new().unwrap();
        touch(
            root.path(),
            &["isekai foo - 01.mkv", "isekai foo - 02.mkv", "isekai foo - 01.srt", "isekai foo NCOP.mkv"],
        );

        let show = engine(false)
            .discover_show("isekai foo", &[root.path().to_path_buf()])
            .unwrap();
        assert_eq!(show.title, "isekai foo");
        let numbers: Vec<i32> = show.episodes_by_number().iter().map(|e| e.number).collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[test]
    fn test_discover_show_numbers_underscored_names() {
        let root = TempDir::new().unwrap();
        touch(root.path(), &["mob_psycho_100_-_01.mkv", "mob_psycho_100_-_02.mkv"]);

        let show = engine(false)
            .discover_show("mob psycho 100", &[root.path().to_path_buf()])
            .unwrap();
        let numbers: Vec<i32> = show.episodes_by_number().iter().map(|e| e.number).collect();
        assert_eq!(numbers, vec![1, 2]);
    }
}
