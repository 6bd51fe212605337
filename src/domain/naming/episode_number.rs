// src/domain/naming/episode_number.rs
//
// Episode number extraction from a file name once the show title is known.

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

use crate::domain::episode::UNKNOWN_EPISODE_NUMBER;

static DIGIT_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]+").unwrap());

/// Extract the episode number from `filename`, or `UNKNOWN_EPISODE_NUMBER`.
///
/// The first literal occurrence of `title` is removed, then the first digit run
/// not preceded by `(` or `x` and not followed by `x` or `p` wins. That skips
/// resolutions (`1080p`), codecs (`x264`) and disc markers (`CD1x2`). The
/// extension is ignored so `.mp4` / `.m4v` never count.
pub fn extract_episode_number(filename: &str, title: &str) -> i32 {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);
    let remainder = if title.is_empty() {
        stem.to_string()
    } else {
        stem.replacen(title, "", 1)
    };

    for run in DIGIT_RUN.find_iter(&remainder) {
        let before = remainder[..run.start()].chars().next_back();
        let after = remainder[run.end()..].chars().next();
        if matches!(before, Some('(') | Some('x')) || matches!(after, Some('x') | Some('p')) {
            continue;
        }
        return run.as_str().parse().unwrap_or(UNKNOWN_EPISODE_NUMBER);
    }
    UNKNOWN_EPISODE_NUMBER
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_is_not_an_episode() {
        assert_eq!(extract_episode_number("foo 1080p.mkv", "foo"), -1);
    }

    #[test]
    fn test_trailing_number() {
        assert_eq!(extract_episode_number("foo - 08.mkv", "foo"), 8);
    }

    #[test]
    fn test_title_digits_are_removed_first() {
        assert_eq!(
            extract_episode_number("Mob Psycho 100 - 07.mkv", "Mob Psycho 100"),
            7
        );
    }

    #[test]
    fn test_codec_and_parenthesized_numbers_skipped() {
        assert_eq!(extract_episode_number("foo x264 (2019) 05.mkv", "foo"), 5);
        assert_eq!(extract_episode_number("foo CD1x2.avi", "foo"), -1);
    }

    #[test]
    fn test_extension_digits_ignored() {
        assert_eq!(extract_episode_number("foo.mp4", "foo"), -1);
        assert_eq!(extract_episode_number("foo 3.m4v", "foo"), 3);
    }

    #[test]
    fn test_overflow_is_unknown() {
        assert_eq!(extract_episode_number("foo 99999999999999.mkv", "foo"), -1);
    }
}
