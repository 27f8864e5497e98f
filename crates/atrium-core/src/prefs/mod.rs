//! Per-user view preferences (structured filter and sort) and their
//! debounced persistence.

mod sqlite;

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::models::{SortConfig, StructuredFilter, UserId};

pub use sqlite::SqlitePreferenceStore;

/// Persisted view preferences
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub filter: StructuredFilter,
    #[serde(default)]
    pub sort: SortConfig,
}

/// Storage for preferences, keyed by user
pub trait PreferenceStore: Send + Sync + 'static {
    /// Stored preferences, `None` if the user never saved any
    fn load(&self, user: &UserId) -> impl Future<Output = Result<Option<Preferences>>> + Send;

    fn save(
        &self,
        user: &UserId,
        preferences: &Preferences,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Load preferences, falling back to defaults when the store fails.
pub async fn load_or_default<P: PreferenceStore>(store: &P, user: &UserId) -> Preferences {
    match store.load(user).await {
        Ok(preferences) => preferences.unwrap_or_default(),
        Err(error) => {
            tracing::warn!("Failed to load preferences for {user}, using defaults: {error}");
            Preferences::default()
        }
    }
}

/// In-memory preference store
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    entries: Mutex<HashMap<UserId, Preferences>>,
    saves: AtomicUsize,
    fail_loads: AtomicBool,
}

impl MemoryPreferenceStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<UserId, Preferences>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of successful saves so far
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Stored value without going through the async API
    pub fn stored(&self, user: &UserId) -> Option<Preferences> {
        self.entries().get(user).cloned()
    }

    pub fn insert(&self, user: UserId, preferences: Preferences) {
        self.entries().insert(user, preferences);
    }

    /// Make every subsequent load fail
    pub fn fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    async fn load(&self, user: &UserId) -> Result<Option<Preferences>> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(Error::Backend("preference store unavailable".to_string()));
        }
        Ok(self.stored(user))
    }

    async fn save(&self, user: &UserId, preferences: &Preferences) -> Result<()> {
        self.insert(user.clone(), preferences.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Debounced writer: only the last change inside the delay window is saved.
pub struct PreferenceSaver<P> {
    store: Arc<P>,
    delay: Duration,
    version: Arc<AtomicU64>,
}

impl<P: PreferenceStore> PreferenceSaver<P> {
    pub fn new(store: Arc<P>, delay: Duration) -> Self {
        Self {
            store,
            delay,
            version: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn store(&self) -> &Arc<P> {
        &self.store
    }

    /// Schedule a save of `preferences`, superseding any pending one.
    ///
    /// Returns `None` when called outside a tokio runtime; nothing is saved then.
    pub fn schedule(&self, user: UserId, preferences: Preferences) -> Option<JoinHandle<()>> {
        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        let Ok(runtime) = Handle::try_current() else {
            tracing::warn!("No runtime available, skipping preference save");
            return None;
        };

        let store = Arc::clone(&self.store);
        let latest = Arc::clone(&self.version);
        let delay = self.delay;
        Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if latest.load(Ordering::SeqCst) != version {
                return;
            }
            match store.save(&user, &preferences).await {
                Ok(()) => tracing::debug!("Saved preferences for {user}"),
                Err(error) => tracing::warn!("Failed to save preferences for {user}: {error}"),
            }
        }))
    }

    /// Drop any pending save.
    pub fn cancel(&self) {
        self.version.fetch_add(1, Ordering::SeqCst);
    }
}

impl<P> Drop for PreferenceSaver<P> {
    fn drop(&mut self) {
        self.version.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SortDirection, SortField};
    use pretty_assertions::assert_eq;

    fn sorted_by(field: SortField) -> Preferences {
        Preferences {
            sort: SortConfig::new(field, SortDirection::Ascending),
            ..Preferences::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn only_last_change_in_window_is_saved() {
        let store = Arc::new(MemoryPreferenceStore::new());
        let saver = PreferenceSaver::new(Arc::clone(&store), Duration::from_millis(500));
        let user = UserId::from("alice");

        let first = saver.schedule(user.clone(), sorted_by(SortField::Title)).unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        let second = saver.schedule(user.clone(), sorted_by(SortField::CreatedAt)).unwrap();

        first.await.unwrap();
        second.await.unwrap();

        assert_eq!(store.saves(), 1);
        assert_eq!(store.stored(&user), Some(sorted_by(SortField::CreatedAt)));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_pending_save() {
        let store = Arc::new(MemoryPreferenceStore::new());
        let saver = PreferenceSaver::new(Arc::clone(&store), Duration::from_millis(500));

        let pending = saver
            .schedule(UserId::from("alice"), Preferences::default())
            .unwrap();
        saver.cancel();
        pending.await.unwrap();

        assert_eq!(store.saves(), 0);
    }

    #[test]
    fn schedule_outside_runtime_is_skipped() {
        let store = Arc::new(MemoryPreferenceStore::new());
        let saver = PreferenceSaver::new(store, Duration::from_millis(500));
        assert!(saver
            .schedule(UserId::from("alice"), Preferences::default())
            .is_none());
    }

    #[tokio::test]
    async fn load_failure_falls_back_to_defaults() {
        let store = MemoryPreferenceStore::new();
        let user = UserId::from("alice");
        store.insert(user.clone(), sorted_by(SortField::Title));
        assert_eq!(load_or_default(&store, &user).await, sorted_by(SortField::Title));

        store.fail_loads(true);
        assert_eq!(load_or_default(&store, &user).await, Preferences::default());
    }

    #[test]
    fn preferences_deserialize_with_missing_fields() {
        let preferences: Preferences = serde_json::from_str(r#"{"sort": {"field": "title"}}"#).unwrap();
        assert_eq!(preferences.sort.field, SortField::Title);
        assert_eq!(preferences.sort.direction, SortDirection::Descending);
        assert!(preferences.filter.is_empty());
    }
}
