// src/domain/naming/title.rs
//
// Canonical show titles from raw file stems.
//
// The rewrites run in a fixed order; later patterns assume the earlier ones
// already removed tags and separators. Best effort, never fails.

use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Parenthesized groups starting with this character are kept ("(Season 2)").
pub const SEASON_MARKER: char = 'S';

static RULES: LazyLock<TitleRules> = LazyLock::new(TitleRules::default);

/// Ordered rewrite rules for title cleaning
pub struct TitleRules {
    separators: Regex,
    bracketed: Regex,
    parenthesized: Regex,
    first_season: Regex,
    leading_counter: Regex,
    episode_marker: Regex,
    trailing_number: Regex,
    trailing_episode: Regex,
    later_season: Regex,
    whitespace: Regex,
}

impl Default for TitleRules {
    fn default() -> Self {
        Self {
            separators: Regex::new(r"[_,]").unwrap(),
            // [Group], [1080p]
            bracketed: Regex::new(r"\[[^\]]*\]").unwrap(),
            // (Group), (BD 1080p); "(Season 2)" survives via SEASON_MARKER
            parenthesized: Regex::new(r"\(([^)]*)\)").unwrap(),
            // S01 / S1, standalone or glued to an episode marker (S01E03)
            first_season: Regex::new(r"(?i)\bS0?1(\b|E\d)").unwrap(),
            // "03. Show Name"
            leading_counter: Regex::new(r"^\s*\d+\.\s*").unwrap(),
            // E01 / EP01 through end of string
            episode_marker: Regex::new(r"(?i)(^|[^a-z])EP?\d+.*$").unwrap(),
            // " - 01", " - 01v2 [x264]"
            trailing_number: Regex::new(r"\s-\s*\d+v?.*$").unwrap(),
            // "- Episode 08 - recap"
            trailing_episode: Regex::new(r"(?i)-\s*(Episode\s*)?\d+.*$").unwrap(),
            // S2 / S02 .. S9
            later_season: Regex::new(r"(?i)\bS0?([2-9])\b").unwrap(),
            whitespace: Regex::new(r"\s+").unwrap(),
        }
    }
}

/// Result of cleaning one file stem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanTitle {
    /// Canonical show title
    pub title: String,

    /// The title as it is spelled in the file name (separators replaced,
    /// season tag not spelled out), for locating it in `match_form(filename)`
    pub literal: String,
}

impl TitleRules {
    /// Map a file stem to a canonical show title.
    ///
    /// Returns `stem` unchanged when cleaning would leave nothing.
    pub fn normalize(&self, stem: &str) -> String {
        self.clean(stem).title
    }

    /// Clean `stem`, keeping both the canonical title and its literal spelling
    pub fn clean(&self, stem: &str) -> CleanTitle {
        let title = self.separators.replace_all(stem, " ");
        let title = self.bracketed.replace_all(&title, "");
        let title = self
            .parenthesized
            .replace_all(&title, |caps: &Captures| {
                if caps[1].starts_with(SEASON_MARKER) {
                    caps[0].to_string()
                } else {
                    String::new()
                }
            });
        let title = self.first_season.replace_all(&title, "${1}");
        let title = self.leading_counter.replace(&title, "");
        let title = self.episode_marker.replace(&title, "${1}");
        let title = self.trailing_number.replace(&title, "");
        let literal = self.trailing_episode.replace(&title, "");
        let title = self.later_season.replace_all(&literal, "Season ${1}");
        let title = self.whitespace.replace_all(title.trim(), " ");

        if title.is_empty() {
            return CleanTitle {
                title: stem.to_string(),
                literal: self.match_form(stem).trim().to_string(),
            };
        }
        CleanTitle {
            title: title.into_owned(),
            literal: self.whitespace.replace_all(literal.trim(), " ").into_owned(),
        }
    }

    /// `text` with separators turned into spaces and whitespace runs collapsed
    pub fn match_form(&self, text: &str) -> String {
        let text = self.separators.replace_all(text, " ");
        self.whitespace.replace_all(&text, " ").into_owned()
    }
}

/// Canonical show title for a file stem (filename without extension)
pub fn normalize_title(stem: &str) -> String {
    RULES.normalize(stem)
}

/// Canonical title and literal spelling for a file stem
pub fn clean_title(stem: &str) -> CleanTitle {
    RULES.clean(stem)
}

/// Spelling of a file name that `CleanTitle::literal` can be found in
pub fn match_form(text: &str) -> String {
    RULES.match_form(text)
}
