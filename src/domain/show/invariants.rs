use super::entity::Show;
use crate::domain::episode::validate_episode;
use crate::domain::{DomainError, DomainResult};

/// Validates all Show invariants, including those of its episodes
pub fn validate_show(show: &Show) -> DomainResult<()> {
    validate_title(&show.title)?;
    validate_episode_keys(show)?;
    for episode in show.episodes.values() {
        validate_episode(episode)?;
    }
    Ok(())
}

/// Title cannot be empty
fn validate_title(title: &str) -> DomainResult<()> {
    if title.trim().is_empty() {
        return Err(DomainError::InvariantViolation(
            "Show title cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Every map key must be the path of the episode stored under it
fn validate_episode_keys(show: &Show) -> DomainResult<()> {
    for (path, episode) in &show.episodes {
        if *path != episode.path {
            return Err(DomainError::InvariantViolation(format!(
                "Episode {:?} stored under mismatched key {:?}",
                episode.path, path
            )));
        }
    }
    Ok(())
}

/// Invariants that must hold true for Show domain:
///
/// 1. Title is unique within a ShowList (enforced by ShowList keys)
/// 2. len(show) == number of episodes
/// 3. Episodes are unique per path
/// 4. Merging two shows with the same title unions their episodes

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::episode::Episode;
    use std::path::PathBuf;

    #[test]
    fn test_valid_show() {
        let show = Show::with_episodes("Mushishi", [Episode::new("/anime/Mushishi - 01.mkv")]);
        assert!(validate_show(&show).is_ok());
    }

    #[test]
    fn test_blank_title_fails() {
        assert!(validate_show(&Show::new("  ")).is_err());
    }

    #[test]
    fn test_mismatched_episode_key_fails() {
        let mut show = Show::new("Mushishi");
        show.episodes.insert(
            PathBuf::from("/anime/other.mkv"),
            Episode::new("/anime/Mushishi - 01.mkv"),
        );
        assert!(validate_show(&show).is_err());
    }
}
