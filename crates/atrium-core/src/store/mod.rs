//! Reactive record store.
//!
//! Owns the three source subscriptions, the optimistic overlay, the
//! pending-delete set and the view state. All of it lives in one
//! [`StoreState`] value behind an `Arc`; every transition produces a new
//! value and bumps the version published on a watch channel. The projection
//! is recomputed lazily, at most once per version.

mod mutations;

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::watch;

use crate::backend::{RecordBackend, SnapshotSink, SourceUpdate, Subscription};
use crate::config::EngineConfig;
use crate::models::{
    PreviewHandle, RecordId, SortConfig, SpaceScope, StructuredFilter, UserId,
};
use crate::overlay::{OptimisticOverlay, PreviewRegistry};
use crate::prefs::{load_or_default, PreferenceSaver, PreferenceStore, Preferences};
use crate::projection::{project, DisplayWindow, Projection, ProjectionInput, ViewQuery};
use crate::sources::{OwnerIndex, SourceKind, SourceSnapshots};
use crate::util::normalize_text_option;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One complete value of everything the projection is derived from
#[derive(Debug, Clone)]
struct StoreState {
    version: u64,
    user: Option<UserId>,
    sources: SourceSnapshots,
    owners: OwnerIndex,
    overlay: OptimisticOverlay,
    pending_deletes: HashSet<RecordId>,
    query: ViewQuery,
    window: DisplayWindow,
}

impl StoreState {
    fn new(config: &EngineConfig) -> Self {
        let mut sources = SourceSnapshots::default();
        // Nobody signed in yet: nothing to wait for.
        for kind in SourceKind::ALL {
            sources.reset(kind, true);
        }
        Self {
            version: 0,
            user: None,
            sources,
            owners: OwnerIndex::default(),
            overlay: OptimisticOverlay::default(),
            pending_deletes: HashSet::new(),
            query: ViewQuery::default(),
            window: DisplayWindow::new(config.page_size),
        }
    }

    /// Forget pending deletes whose record is now trashed or gone.
    fn prune_pending_deletes(&mut self) {
        if self.pending_deletes.is_empty() {
            return;
        }
        let mut trashed: HashMap<&RecordId, bool> = HashMap::new();
        for record in self.sources.iter_merge_order() {
            trashed.insert(&record.id, record.is_trashed());
        }
        let settled: Vec<RecordId> = self
            .pending_deletes
            .iter()
            .filter(|id| trashed.get(id).copied().unwrap_or(true))
            .cloned()
            .collect();
        for id in settled {
            tracing::debug!("Delete of {id} settled");
            self.pending_deletes.remove(&id);
        }
    }

    fn preferences(&self) -> Preferences {
        Preferences {
            filter: self.query.filter.clone(),
            sort: self.query.sort,
        }
    }
}

#[derive(Default)]
struct Subscriptions {
    owned: Option<Subscription>,
    shared: Option<Subscription>,
    space: Option<Subscription>,
}

impl Subscriptions {
    fn slot(&mut self, kind: SourceKind) -> &mut Option<Subscription> {
        match kind {
            SourceKind::Owned => &mut self.owned,
            SourceKind::Shared => &mut self.shared,
            SourceKind::Space => &mut self.space,
        }
    }
}

struct Inner<B, P> {
    backend: Arc<B>,
    saver: PreferenceSaver<P>,
    previews: PreviewRegistry,
    config: EngineConfig,
    state: Mutex<Arc<StoreState>>,
    subscriptions: Mutex<Subscriptions>,
    changes: watch::Sender<u64>,
    memo: Mutex<Option<(u64, Arc<Projection>)>>,
    loading_more: AtomicBool,
}

impl<B, P> Inner<B, P> {
    fn snapshot(&self) -> Arc<StoreState> {
        Arc::clone(&lock(&self.state))
    }

    /// Apply `change` to a fresh copy of the state and publish it if it
    /// reports a change.
    fn transition(&self, change: impl FnOnce(&mut StoreState) -> bool) -> bool {
        let version = {
            let mut current = lock(&self.state);
            let mut next = (**current).clone();
            if !change(&mut next) {
                return false;
            }
            next.version = current.version + 1;
            let version = next.version;
            *current = Arc::new(next);
            version
        };
        self.changes.send_replace(version);
        true
    }

    fn accept(&self, kind: SourceKind, generation: u64, update: SourceUpdate) {
        self.transition(|state| {
            if !state.sources.accept(kind, generation, update) {
                tracing::debug!("Dropped stale {kind} delivery");
                return false;
            }
            state.owners = OwnerIndex::build(&state.sources);
            state.prune_pending_deletes();
            true
        });
    }
}

/// Aggregating store for one collection type.
///
/// Cheap to clone; clones share the same state.
pub struct RecordStore<B, P> {
    inner: Arc<Inner<B, P>>,
}

impl<B, P> Clone for RecordStore<B, P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: RecordBackend, P: PreferenceStore> RecordStore<B, P> {
    pub fn new(backend: Arc<B>, preferences: Arc<P>, config: EngineConfig) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                backend,
                saver: PreferenceSaver::new(preferences, config.preference_save_debounce()),
                previews: PreviewRegistry::default(),
                config,
                state: Mutex::new(Arc::new(StoreState::new(&config))),
                subscriptions: Mutex::new(Subscriptions::default()),
                changes,
                memo: Mutex::new(None),
                loading_more: AtomicBool::new(false),
            }),
        }
    }

    /// Sign `user` in: load their preferences, then subscribe every source.
    pub async fn start(&self, user: UserId) {
        let preferences = load_or_default(self.inner.saver.store().as_ref(), &user).await;
        self.inner.transition(|state| {
            state.query.filter = preferences.filter;
            state.query.sort = preferences.sort;
            true
        });
        self.set_user(Some(user));
    }

    /// Switch identity, re-keying every subscription. `None` signs out.
    pub fn set_user(&self, user: Option<UserId>) {
        let mut generations = [0; 3];
        self.inner.transition(|state| {
            state.user.clone_from(&user);
            state.overlay = OptimisticOverlay::default();
            state.pending_deletes.clear();
            let space_active = state.query.scope.space_id().is_some();
            for (slot, kind) in generations.iter_mut().zip(SourceKind::ALL) {
                let skipped = user.is_none() || (kind == SourceKind::Space && !space_active);
                *slot = state.sources.reset(kind, skipped);
            }
            state.owners = OwnerIndex::build(&state.sources);
            state.window.reset();
            true
        });
        if user.is_none() {
            self.inner.saver.cancel();
        }
        tracing::info!(
            "Re-keying subscriptions for {}",
            user.as_ref().map_or("signed-out user", UserId::as_str)
        );
        for (kind, generation) in SourceKind::ALL.into_iter().zip(generations) {
            self.resubscribe(kind, generation);
        }
    }

    /// Open another space (or the personal scope); only the Space source is re-keyed.
    pub fn set_scope(&self, scope: SpaceScope) {
        let scope = scope.normalized();
        let mut generation = 0;
        let changed = self.inner.transition(|state| {
            if state.query.scope == scope {
                return false;
            }
            let skipped = state.user.is_none() || scope.space_id().is_none();
            state.query.scope = scope.clone();
            generation = state.sources.reset(SourceKind::Space, skipped);
            state.owners = OwnerIndex::build(&state.sources);
            state.window.reset();
            true
        });
        if changed {
            tracing::info!("Switched scope to {scope:?}");
            self.resubscribe(SourceKind::Space, generation);
        }
    }

    /// Replace the live subscription of `kind` with one delivering under `generation`.
    ///
    /// Must not be called with the state lock held: the backend may deliver
    /// the initial snapshot synchronously.
    fn resubscribe(&self, kind: SourceKind, generation: u64) {
        let state = self.inner.snapshot();
        let subscription = state.user.as_ref().and_then(|user| {
            let sink = self.sink(kind, generation);
            match kind {
                SourceKind::Owned => Some(self.inner.backend.subscribe_owned(user, sink)),
                SourceKind::Shared => Some(self.inner.backend.subscribe_shared(user, sink)),
                SourceKind::Space => state
                    .query
                    .scope
                    .space_id()
                    .map(|space| self.inner.backend.subscribe_space(space, user, sink)),
            }
        });
        let previous = std::mem::replace(lock(&self.inner.subscriptions).slot(kind), subscription);
        drop(previous);
    }

    fn sink(&self, kind: SourceKind, generation: u64) -> SnapshotSink {
        let inner: Weak<Inner<B, P>> = Arc::downgrade(&self.inner);
        Arc::new(move |update| {
            if let Some(inner) = inner.upgrade() {
                inner.accept(kind, generation, update);
            }
        })
    }

    /// Current projection, recomputed at most once per state version.
    pub fn view(&self) -> Arc<Projection> {
        let state = self.inner.snapshot();
        let mut memo = lock(&self.inner.memo);
        if let Some((version, projection)) = memo.as_ref() {
            if *version == state.version {
                return Arc::clone(projection);
            }
        }
        let projection = Arc::new(project(&ProjectionInput {
            sources: &state.sources,
            optimistic: state.overlay.records(),
            pending_deletes: &state.pending_deletes,
            query: &state.query,
            display_limit: state.window.limit(),
            min_search_chars: self.inner.config.min_search_chars,
        }));
        *memo = Some((state.version, Arc::clone(&projection)));
        projection
    }

    /// Receiver that observes every state version.
    pub fn subscribe_changes(&self) -> watch::Receiver<u64> {
        self.inner.changes.subscribe()
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.snapshot().version
    }

    #[must_use]
    pub fn user(&self) -> Option<UserId> {
        self.inner.snapshot().user.clone()
    }

    #[must_use]
    pub fn query(&self) -> ViewQuery {
        self.inner.snapshot().query.clone()
    }

    #[must_use]
    pub fn display_limit(&self) -> usize {
        self.inner.snapshot().window.limit()
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Bytes behind a local preview attachment, while its create is in flight.
    #[must_use]
    pub fn resolve_preview(&self, handle: &PreviewHandle) -> Option<Arc<Vec<u8>>> {
        self.inner.previews.resolve(handle)
    }

    #[must_use]
    pub fn live_previews(&self) -> usize {
        self.inner.previews.live_count()
    }

    pub fn set_search(&self, search: impl Into<String>) {
        let search = search.into();
        self.inner.transition(|state| {
            if state.query.search == search {
                return false;
            }
            state.query.search = search;
            state.window.reset();
            true
        });
    }

    pub fn set_active_label(&self, label: Option<String>) {
        let label = normalize_text_option(label);
        self.inner.transition(|state| {
            if state.query.active_label == label {
                return false;
            }
            state.query.active_label = label;
            state.window.reset();
            true
        });
    }

    pub fn set_filter(&self, filter: StructuredFilter) {
        let changed = self.inner.transition(|state| {
            if state.query.filter == filter {
                return false;
            }
            state.query.filter = filter;
            state.window.reset();
            true
        });
        if changed {
            self.schedule_preference_save();
        }
    }

    pub fn set_sort(&self, sort: SortConfig) {
        let changed = self.inner.transition(|state| {
            if state.query.sort == sort {
                return false;
            }
            state.query.sort = sort;
            true
        });
        if changed {
            self.schedule_preference_save();
        }
    }

    /// Clear search, active label and structured filter.
    pub fn clear_filters(&self) {
        let mut had_filter = false;
        self.inner.transition(|state| {
            had_filter = state.query.filter != StructuredFilter::default();
            if state.query.search.is_empty() && state.query.active_label.is_none() && !had_filter {
                return false;
            }
            state.query.search.clear();
            state.query.active_label = None;
            state.query.filter = StructuredFilter::default();
            state.window.reset();
            true
        });
        if had_filter {
            self.schedule_preference_save();
        }
    }

    fn schedule_preference_save(&self) {
        let state = self.inner.snapshot();
        if let Some(user) = state.user.clone() {
            self.inner.saver.schedule(user, state.preferences());
        }
    }

    /// Grow the display window by one batch after a short delay.
    ///
    /// Returns `false` when nothing more is available or another call is
    /// already pending.
    pub async fn load_more(&self) -> bool {
        if !self.view().has_more {
            return false;
        }
        if self.inner.loading_more.swap(true, Ordering::SeqCst) {
            tracing::debug!("load_more already pending");
            return false;
        }
        let _pending = LoadMoreGuard(&self.inner.loading_more);

        tokio::time::sleep(self.inner.config.load_more_delay()).await;
        self.inner.transition(|state| {
            state.window.grow();
            tracing::debug!("Display window grown to {}", state.window.limit());
            true
        })
    }
}

struct LoadMoreGuard<'a>(&'a AtomicBool);

impl Drop for LoadMoreGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
