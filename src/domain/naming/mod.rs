// src/domain/naming/mod.rs
//
// Pure file-name heuristics: title cleaning, episode numbers, similarity.

pub mod episode_number;
pub mod similarity;
pub mod title;

pub use episode_number::extract_episode_number;
pub use similarity::{ratio, token_sort_ratio, TitleMatcher};
pub use title::{clean_title, match_form, normalize_title, CleanTitle, TitleRules, SEASON_MARKER};
