// src/repositories/show_repository.rs
//
// Show rows <-> Show entities (without episodes)

use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashSet;

use crate::domain::{RowKey, Show};
use crate::error::AppResult;

pub trait ShowRepository {
    fn list_all(&self) -> AppResult<Vec<Show>>;
    fn list_titles(&self) -> AppResult<HashSet<String>>;
    fn find_by_title(&self, title: &str) -> AppResult<Option<Show>>;
    fn find_by_key(&self, key: RowKey) -> AppResult<Option<Show>>;
    fn find_by_episode(&self, episode_key: RowKey) -> AppResult<Option<RowKey>>;
    fn insert(&self, show: &Show) -> AppResult<RowKey>;
    /// Returns false when no row has `key`
    fn update(&self, key: RowKey, show: &Show) -> AppResult<bool>;
    fn rename(&self, key: RowKey, title: &str) -> AppResult<()>;
    /// Fill external ids the row does not have yet
    fn fill_external_ids(&self, key: RowKey, show_id: Option<i64>, list_id: Option<i64>) -> AppResult<()>;
    fn delete(&self, key: RowKey) -> AppResult<bool>;
}

/// SQLite implementation bound to a connection or an open transaction
pub struct SqliteShowRepository<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteShowRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn row_to_show(row: &Row) -> rusqlite::Result<Show> {
        let mut show = Show::new(row.get::<_, String>("title")?);
        show.key = Some(RowKey(row.get("id")?));
        show.show_id = row.get("external_show_id")?;
        show.list_id = row.get("external_list_id")?;
        Ok(show)
    }
}

impl ShowRepository for SqliteShowRepository<'_> {
    fn list_all(&self) -> AppResult<Vec<Show>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, external_show_id, external_list_id
             FROM shows
             ORDER BY title",
        )?;

        let shows = stmt
            .query_map([], Self::row_to_show)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(shows)
    }

    fn list_titles(&self) -> AppResult<HashSet<String>> {
        let mut stmt = self.conn.prepare("SELECT title FROM shows")?;
        let titles = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<HashSet<String>, _>>()?;
        Ok(titles)
    }

    fn find_by_title(&self, title: &str) -> AppResult<Option<Show>> {
        let show = self
            .conn
            .query_row(
                "SELECT id, title, external_show_id, external_list_id
                 FROM shows WHERE title = ?1",
                params![title],
                Self::row_to_show,
            )
            .optional()?;
        Ok(show)
    }

    fn find_by_key(&self, key: RowKey) -> AppResult<Option<Show>> {
        let show = self
            .conn
            .query_row(
                "SELECT id, title, external_show_id, external_list_id
                 FROM shows WHERE id = ?1",
                params![key.0],
                Self::row_to_show,
            )
            .optional()?;
        Ok(show)
    }

    fn find_by_episode(&self, episode_key: RowKey) -> AppResult<Option<RowKey>> {
        let key = self
            .conn
            .query_row(
                "SELECT s.id FROM shows s
                 INNER JOIN episodes e ON e.show_id = s.id
                 WHERE e.id = ?1",
                params![episode_key.0],
                |row| row.get(0),
            )
            .optional()?;
        Ok(key.map(RowKey))
    }

    fn insert(&self, show: &Show) -> AppResult<RowKey> {
        self.conn.execute(
            "INSERT INTO shows (title, external_show_id, external_list_id) VALUES (?1, ?2, ?3)",
            params![show.title, show.show_id, show.list_id],
        )?;
        Ok(RowKey(self.conn.last_insert_rowid()))
    }

    fn update(&self, key: RowKey, show: &Show) -> AppResult<bool> {
        let rows = self.conn.execute(
            "UPDATE shows SET title = ?1, external_show_id = ?2, external_list_id = ?3
             WHERE id = ?4",
            params![show.title, show.show_id, show.list_id, key.0],
        )?;
        Ok(rows > 0)
    }

    fn rename(&self, key: RowKey, title: &str) -> AppResult<()> {
        self.conn.execute(
            "UPDATE shows SET title = ?1 WHERE id = ?2",
            params![title, key.0],
        )?;
        Ok(())
    }

    fn fill_external_ids(&self, key: RowKey, show_id: Option<i64>, list_id: Option<i64>) -> AppResult<()> {
        self.conn.execute(
            "UPDATE shows
             SET external_show_id = COALESCE(external_show_id, ?1),
                 external_list_id = COALESCE(external_list_id, ?2)
             WHERE id = ?3",
            params![show_id, list_id, key.0],
        )?;
        Ok(())
    }

    fn delete(&self, key: RowKey) -> AppResult<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM shows WHERE id = ?1", params![key.0])?;
        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::LibraryStore;

    #[test]
    fn test_insert_and_find() {
        let store = LibraryStore::open_in_memory().unwrap();
        let conn = store.connection().unwrap();
        let repo = SqliteShowRepository::new(&conn);

        let mut show = Show::new("Mushishi");
        show.show_id = Some(457);
        let key = repo.insert(&show).unwrap();

        let found = repo.find_by_title("Mushishi").unwrap().unwrap();
        assert_eq!(found.key, Some(key));
        assert_eq!(found.show_id, Some(457));
        assert!(found.list_id.is_none());
        assert!(repo.find_by_title("Other").unwrap().is_none());
        assert_eq!(repo.find_by_key(key).unwrap().unwrap().title, "Mushishi");
    }

    #[test]
    fn test_duplicate_title_is_rejected() {
        let store = LibraryStore::open_in_memory().unwrap();
        let conn = store.connection().unwrap();
        let repo = SqliteShowRepository::new(&conn);

        repo.insert(&Show::new("X")).unwrap();
        assert!(repo.insert(&Show::new("X")).is_err());
    }

    #[test]
    fn test_fill_external_ids_keeps_existing() {
        let store = LibraryStore::open_in_memory().unwrap();
        let conn = store.connection().unwrap();
        let repo = SqliteShowRepository::new(&conn);

        let mut show = Show::new("X");
        show.show_id = Some(1);
        let key = repo.insert(&show).unwrap();

        repo.fill_external_ids(key, Some(2), Some(3)).unwrap();
        let stored = repo.find_by_key(key).unwrap().unwrap();
        assert_eq!(stored.show_id, Some(1));
        assert_eq!(stored.list_id, Some(3));
    }

    #[test]
    fn test_list_titles_and_delete() {
        let store = LibraryStore::open_in_memory().unwrap();
        let conn = store.connection().unwrap();
        let repo = SqliteShowRepository::new(&conn);

        let a = repo.insert(&Show::new("A")).unwrap();
        repo.insert(&Show::new("B")).unwrap();
        assert_eq!(repo.list_titles().unwrap().len(), 2);

        assert!(repo.delete(a).unwrap());
        assert!(!repo.delete(a).unwrap());
        let titles: Vec<String> = repo.list_all().unwrap().into_iter().map(|s| s.title).collect();
        assert_eq!(titles, vec!["B".to_string()]);
    }
}
