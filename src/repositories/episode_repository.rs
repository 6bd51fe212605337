// src/repositories/episode_repository.rs
//
// Episode rows <-> Episode entities
//
// Paths are stored as UTF-8 text; non-UTF-8 components are replaced lossily.

use rusqlite::{params, Connection, Row};
use std::path::{Path, PathBuf};

use crate::domain::{Episode, EpisodeState, RowKey};
use crate::error::AppResult;

pub trait EpisodeRepository {
    fn list_by_show(&self, show_key: RowKey) -> AppResult<Vec<Episode>>;
    /// (path, owning show title) for every stored episode
    fn list_owners(&self) -> AppResult<Vec<(PathBuf, String)>>;
    /// Plain insert, fails on an existing (show, path) pair
    fn insert(&self, show_key: RowKey, episode: &Episode) -> AppResult<RowKey>;
    /// Update by key when the row exists, otherwise upsert by (show, path)
    fn save(&self, show_key: RowKey, episode: &Episode) -> AppResult<RowKey>;
    fn update_number(&self, key: RowKey, number: i32) -> AppResult<()>;
    fn update_state(&self, key: RowKey, state: EpisodeState) -> AppResult<bool>;
    /// Every non-watched episode of the show becomes unwatched
    fn mark_unseen_by_show(&self, show_key: RowKey) -> AppResult<usize>;
    /// Repoint episodes to another show; rows whose path already exists there stay put
    fn move_to_show(&self, from: RowKey, to: RowKey) -> AppResult<usize>;
    fn delete_by_show(&self, show_key: RowKey) -> AppResult<usize>;
    fn delete_by_path(&self, show_key: RowKey, path: &Path) -> AppResult<bool>;
}

/// SQLite implementation bound to a connection or an open transaction
pub struct SqliteEpisodeRepository<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteEpisodeRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Convert a database row to an Episode entity.
    ///
    /// An unknown state value is an explicit error, not a silent default.
    fn row_to_episode(row: &Row) -> rusqlite::Result<Episode> {
        let path: String = row.get("path")?;
        let state_value: i64 = row.get("state")?;
        let state = EpisodeState::try_from(state_value).map_err(|e| {
            log::warn!("Rejecting stored episode {:?}: {}", path, e);
            rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Integer,
                Box::new(e),
            )
        })?;

        Ok(Episode::restore(
            PathBuf::from(path),
            row.get("number")?,
            state,
            RowKey(row.get("id")?),
        ))
    }
}

pub(crate) fn path_to_text(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

impl EpisodeRepository for SqliteEpisodeRepository<'_> {
    fn list_by_show(&self, show_key: RowKey) -> AppResult<Vec<Episode>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, path, number, state
             FROM episodes WHERE show_id = ?1
             ORDER BY number, path",
        )?;

        let episodes = stmt
            .query_map(params![show_key.0], Self::row_to_episode)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(episodes)
    }

    fn list_owners(&self) -> AppResult<Vec<(PathBuf, String)>> {
        let mut stmt = self.conn.prepare(
            "SELECT e.path, s.title
             FROM episodes e
             JOIN shows s ON s.id = e.show_id
             ORDER BY s.title, e.path",
        )?;

        let owners = stmt
            .query_map([], |row| {
                Ok((PathBuf::from(row.get::<_, String>(0)?), row.get(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(owners)
    }

    fn insert(&self, show_key: RowKey, episode: &Episode) -> AppResult<RowKey> {
        self.conn.execute(
            "INSERT INTO episodes (path, number, show_id, state) VALUES (?1, ?2, ?3, ?4)",
            params![
                path_to_text(&episode.path),
                episode.number,
                show_key.0,
                episode.state.as_i64(),
            ],
        )?;
        Ok(RowKey(self.conn.last_insert_rowid()))
    }

    fn save(&self, show_key: RowKey, episode: &Episode) -> AppResult<RowKey> {
        let path = path_to_text(&episode.path);

        if let Some(key) = episode.key {
            let rows = self.conn.execute(
                "UPDATE episodes SET path = ?1, number = ?2, show_id = ?3, state = ?4
                 WHERE id = ?5",
                params![path, episode.number, show_key.0, episode.state.as_i64(), key.0],
            )?;
            if rows > 0 {
                return Ok(key);
            }
        }

        self.conn.execute(
            "INSERT INTO episodes (path, number, show_id, state) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (show_id, path) DO UPDATE
             SET number = excluded.number, state = excluded.state",
            params![path, episode.number, show_key.0, episode.state.as_i64()],
        )?;

        let id: i64 = self.conn.query_row(
            "SELECT id FROM episodes WHERE show_id = ?1 AND path = ?2",
            params![show_key.0, path],
            |row| row.get(0),
        )?;
        Ok(RowKey(id))
    }

    fn update_number(&self, key: RowKey, number: i32) -> AppResult<()> {
        self.conn.execute(
            "UPDATE episodes SET number = ?1 WHERE id = ?2",
            params![number, key.0],
        )?;
        Ok(())
    }

    fn update_state(&self, key: RowKey, state: EpisodeState) -> AppResult<bool> {
        let rows = self.conn.execute(
            "UPDATE episodes SET state = ?1 WHERE id = ?2",
            params![state.as_i64(), key.0],
        )?;
        Ok(rows > 0)
    }

    fn mark_unseen_by_show(&self, show_key: RowKey) -> AppResult<usize> {
        let rows = self.conn.execute(
            "UPDATE episodes SET state = ?1 WHERE show_id = ?2 AND state != ?3",
            params![
                EpisodeState::Unwatched.as_i64(),
                show_key.0,
                EpisodeState::Watched.as_i64(),
            ],
        )?;
        Ok(rows)
    }

    fn move_to_show(&self, from: RowKey, to: RowKey) -> AppResult<usize> {
        let rows = self.conn.execute(
            "UPDATE OR IGNORE episodes SET show_id = ?1 WHERE show_id = ?2",
            params![to.0, from.0],
        )?;
        Ok(rows)
    }

    fn delete_by_show(&self, show_key: RowKey) -> AppResult<usize> {
        let rows = self
            .conn
            .execute("DELETE FROM episodes WHERE show_id = ?1", params![show_key.0])?;
        Ok(rows)
    }

    fn delete_by_path(&self, show_key: RowKey, path: &Path) -> AppResult<bool> {
        let rows = self.conn.execute(
            "DELETE FROM episodes WHERE show_id = ?1 AND path = ?2",
            params![show_key.0, path_to_text(path)],
        )?;
        Ok(rows > 0)
    }
}
