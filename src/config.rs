// src/config.rs
//
// Library configuration.
//
// Keys match the application's TOML config file. Reading and writing that
// file belongs to the application; this crate only parses what it is handed.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::AppResult;

/// Canonical similarity threshold for grouping files under an existing show
pub const FUZZY_MATCH_THRESHOLD: u8 = 90;

/// Supported video extensions, lower-case without the dot
pub const VIDEO_EXTENSIONS: [&str; 4] = ["mkv", "mp4", "avi", "m4v"];

/// File name of the SQLite store
pub const DATABASE_FILE_NAME: &str = "ene.db";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Root directories scanned for video files
    #[serde(rename = "Local Paths")]
    pub local_paths: Vec<PathBuf>,

    /// Descend into non-matching folders during a targeted show search
    #[serde(rename = "Search Subfolders")]
    pub search_subfolders: bool,

    #[serde(rename = "Database Path")]
    pub database_path: PathBuf,

    #[serde(rename = "Fuzzy Match Threshold")]
    pub fuzzy_threshold: u8,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            local_paths: vec![default_video_dir()],
            search_subfolders: false,
            database_path: default_database_path(),
            fuzzy_threshold: FUZZY_MATCH_THRESHOLD,
        }
    }
}

impl LibraryConfig {
    pub fn from_toml_str(raw: &str) -> AppResult<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn load(path: &Path) -> AppResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Name of the database file, used to skip its directory while scanning
    pub fn database_file_name(&self) -> Option<&std::ffi::OsStr> {
        self.database_path.file_name()
    }
}

/// `true` when the extension is one of `VIDEO_EXTENSIONS` (case-insensitive)
pub fn is_video_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            VIDEO_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

fn default_video_dir() -> PathBuf {
    dirs::video_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Videos")))
        .unwrap_or_else(|| PathBuf::from("Videos"))
}

/// Database is stored in the application data directory:
/// {DATA_DIR}/ene/ene.db
fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("ene")
        .join(DATABASE_FILE_NAME)
}
