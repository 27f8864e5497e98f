//! `SQLite` preference store

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::{params, Connection, OptionalExtension};

use super::{PreferenceStore, Preferences};
use crate::error::Result;
use crate::models::UserId;
use crate::util::now_ms;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS preferences (
    user_id TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);
";

/// Preferences stored as one JSON value per user
pub struct SqlitePreferenceStore {
    conn: Mutex<Connection>,
}

impl SqlitePreferenceStore {
    /// Open (or create) the database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read(&self, user: &UserId) -> Result<Option<Preferences>> {
        let value: Option<String> = self
            .conn()
            .query_row(
                "SELECT value FROM preferences WHERE user_id = ?",
                [user.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        value
            .map(|value| serde_json::from_str(&value))
            .transpose()
            .map_err(Into::into)
    }

    fn write(&self, user: &UserId, preferences: &Preferences) -> Result<()> {
        let value = serde_json::to_string(preferences)?;
        self.conn().execute(
            "INSERT INTO preferences (user_id, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(user_id) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![user.as_str(), value, now_ms()],
        )?;
        Ok(())
    }
}

impl PreferenceStore for SqlitePreferenceStore {
    async fn load(&self, user: &UserId) -> Result<Option<Preferences>> {
        self.read(user)
    }

    async fn save(&self, user: &UserId, preferences: &Preferences) -> Result<()> {
        self.write(user, preferences)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::models::{RecordKind, SortConfig, SortDirection, SortField};
    use pretty_assertions::assert_eq;

    fn preferences() -> Preferences {
        let mut preferences = Preferences {
            sort: SortConfig::new(SortField::Title, SortDirection::Ascending),
            ..Preferences::default()
        };
        preferences.filter.kind = Some(RecordKind::Checklist);
        preferences.filter.colors.insert("red".to_string());
        preferences
    }

    #[tokio::test]
    async fn missing_user_loads_none() {
        let store = SqlitePreferenceStore::open_in_memory().unwrap();
        assert_eq!(store.load(&UserId::from("nobody")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn save_overwrites_previous_value() {
        let store = SqlitePreferenceStore::open_in_memory().unwrap();
        let user = UserId::from("alice");

        store.save(&user, &Preferences::default()).await.unwrap();
        store.save(&user, &preferences()).await.unwrap();

        assert_eq!(store.load(&user).await.unwrap(), Some(preferences()));
    }

    #[tokio::test]
    async fn preferences_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.db");
        let user = UserId::from("alice");

        SqlitePreferenceStore::open(&path)
            .unwrap()
            .save(&user, &preferences())
            .await
            .unwrap();

        let reopened = SqlitePreferenceStore::open(&path).unwrap();
        assert_eq!(reopened.load(&user).await.unwrap(), Some(preferences()));
    }

    #[tokio::test]
    async fn corrupt_value_is_a_serialization_error() {
        let store = SqlitePreferenceStore::open_in_memory().unwrap();
        store
            .conn()
            .execute(
                "INSERT INTO preferences (user_id, value, updated_at) VALUES ('alice', 'not json', 0)",
                [],
            )
            .unwrap();

        let result = store.load(&UserId::from("alice")).await;
        assert!(matches!(result, Err(Error::Serialization(_))));
    }
}
