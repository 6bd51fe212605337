use super::entity::{Episode, UNKNOWN_EPISODE_NUMBER};
use crate::domain::{DomainError, DomainResult};

/// Validates all Episode invariants
pub fn validate_episode(episode: &Episode) -> DomainResult<()> {
    validate_path(episode)?;
    validate_number(episode)?;
    Ok(())
}

/// Path must be absolute and name a file
fn validate_path(episode: &Episode) -> DomainResult<()> {
    if !episode.path.is_absolute() {
        return Err(DomainError::InvariantViolation(format!(
            "Episode path {:?} is not absolute",
            episode.path
        )));
    }
    if episode.name.is_empty() {
        return Err(DomainError::InvariantViolation(format!(
            "Episode path {:?} has no file name",
            episode.path
        )));
    }
    Ok(())
}

/// -1 is the only negative number allowed
fn validate_number(episode: &Episode) -> DomainResult<()> {
    if episode.number < UNKNOWN_EPISODE_NUMBER {
        return Err(DomainError::InvariantViolation(format!(
            "Episode number {} is below the unknown sentinel",
            episode.number
        )));
    }
    Ok(())
}

/// Critical Episode Invariants:
///
/// 1. Identity is the absolute path; equality and hash derive from it
/// 2. `name` is the file name of `path`
/// 3. `number` is -1 only when extraction failed
/// 4. `key` is None until the episode row has been saved
