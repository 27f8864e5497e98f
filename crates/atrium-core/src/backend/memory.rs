//! In-memory record collaborator.
//!
//! Keeps every partition in one table and pushes fresh snapshots to live
//! subscriptions after each write, like the managed store does. Used by
//! tests and by the CLI; it also exposes knobs to hold, fail and stall
//! calls so interleavings can be driven deterministically.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use super::{RecordBackend, SnapshotSink, Subscription};
use crate::error::{Error, Result};
use crate::models::{
    Attachment, AttachmentRef, LocalFile, NewRecord, Record, RecordId, RecordPatch, SpaceId,
    UserId,
};
use crate::sources::SourceKind;
use crate::util::now_ms;

/// Write calls that can be held, failed or counted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Update,
    SetPinned,
    SetArchived,
    SoftDelete,
    Restore,
    PermanentlyDelete,
    UploadAttachment,
    DeleteAttachment,
    AddAttachments,
    RemoveAttachments,
}

#[derive(Debug, Clone)]
enum Target {
    Owned(UserId),
    Shared(UserId),
    Space(SpaceId),
}

impl Target {
    const fn kind(&self) -> SourceKind {
        match self {
            Self::Owned(_) => SourceKind::Owned,
            Self::Shared(_) => SourceKind::Shared,
            Self::Space(_) => SourceKind::Space,
        }
    }

    fn select(&self, records: &[Record]) -> Vec<Record> {
        records
            .iter()
            .filter(|record| match self {
                Self::Owned(user) => &record.owner_id == user,
                Self::Shared(user) => {
                    &record.owner_id != user && record.shared_with.contains(user)
                }
                Self::Space(space) => record.space_id.as_ref() == Some(space),
            })
            .cloned()
            .collect()
    }
}

struct Subscriber {
    id: u64,
    target: Target,
    sink: SnapshotSink,
}

#[derive(Default)]
struct Tables {
    records: Vec<Record>,
    objects: BTreeMap<String, Vec<u8>>,
    subscribers: Vec<Subscriber>,
    next_subscriber: u64,
    failures: HashMap<Operation, String>,
    stalled: HashSet<SourceKind>,
}

type Delivery = (SnapshotSink, Vec<Record>);

impl Tables {
    fn deliveries(&self) -> Vec<Delivery> {
        self.subscribers
            .iter()
            .filter(|subscriber| !self.stalled.contains(&subscriber.target.kind()))
            .map(|subscriber| {
                (
                    Arc::clone(&subscriber.sink),
                    subscriber.target.select(&self.records),
                )
            })
            .collect()
    }

    fn record_mut(&mut self, owner: &UserId, id: &RecordId) -> Result<&mut Record> {
        self.records
            .iter_mut()
            .find(|record| &record.id == id && &record.owner_id == owner)
            .ok_or_else(|| Error::NotFound(format!("{id} in partition {owner}")))
    }
}

fn lock_tables(tables: &Mutex<Tables>) -> MutexGuard<'_, Tables> {
    tables.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory implementation of [`RecordBackend`].
pub struct InMemoryBackend {
    tables: Arc<Mutex<Tables>>,
    holds: watch::Sender<HashSet<Operation>>,
    calls: watch::Sender<HashMap<Operation, usize>>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        let (holds, _) = watch::channel(HashSet::new());
        let (calls, _) = watch::channel(HashMap::new());
        Self {
            tables: Arc::new(Mutex::new(Tables::default())),
            holds,
            calls,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        lock_tables(&self.tables)
    }

    /// Store `records` as-is (ids and owners included) and notify subscribers.
    pub fn seed(&self, records: impl IntoIterator<Item = Record>) {
        let deliveries = {
            let mut tables = self.lock();
            for record in records {
                tables.records.retain(|existing| existing.id != record.id);
                tables.records.push(record);
            }
            let deliveries = tables.deliveries();
            deliveries
        };
        deliver(deliveries);
    }

    /// Every stored record, across all partitions.
    #[must_use]
    pub fn records(&self) -> Vec<Record> {
        self.lock().records.clone()
    }

    #[must_use]
    pub fn record(&self, id: &RecordId) -> Option<Record> {
        self.lock()
            .records
            .iter()
            .find(|record| &record.id == id)
            .cloned()
    }

    /// Paths of uploaded objects still in storage.
    #[must_use]
    pub fn object_paths(&self) -> Vec<String> {
        self.lock().objects.keys().cloned().collect()
    }

    #[must_use]
    pub fn subscriber_count(&self, kind: SourceKind) -> usize {
        self.lock()
            .subscribers
            .iter()
            .filter(|subscriber| subscriber.target.kind() == kind)
            .count()
    }

    /// Make the next call of `operation` fail with `message`.
    pub fn fail_next(&self, operation: Operation, message: impl Into<String>) {
        self.lock().failures.insert(operation, message.into());
    }

    /// Park calls of `operation` until [`Self::release`].
    pub fn hold(&self, operation: Operation) {
        self.holds.send_modify(|held| {
            held.insert(operation);
        });
    }

    pub fn release(&self, operation: Operation) {
        self.holds.send_modify(|held| {
            held.remove(&operation);
        });
    }

    /// Number of calls of `operation` received so far, held ones included.
    #[must_use]
    pub fn calls(&self, operation: Operation) -> usize {
        self.calls.borrow().get(&operation).copied().unwrap_or(0)
    }

    /// Wait until `operation` has been called at least `count` times.
    pub async fn wait_for_calls(&self, operation: Operation, count: usize) {
        let mut calls = self.calls.subscribe();
        let _ = calls
            .wait_for(|calls| calls.get(&operation).copied().unwrap_or(0) >= count)
            .await;
    }

    /// Stop delivering to subscriptions of `kind` until [`Self::flush_source`].
    pub fn stall_source(&self, kind: SourceKind) {
        self.lock().stalled.insert(kind);
    }

    /// Resume a stalled source and push its current snapshot.
    pub fn flush_source(&self, kind: SourceKind) {
        let deliveries = {
            let mut tables = self.lock();
            tables.stalled.remove(&kind);
            let deliveries: Vec<Delivery> = tables
                .subscribers
                .iter()
                .filter(|subscriber| subscriber.target.kind() == kind)
                .map(|subscriber| {
                    (
                        Arc::clone(&subscriber.sink),
                        subscriber.target.select(&tables.records),
                    )
                })
                .collect();
            deliveries
        };
        deliver(deliveries);
    }

    /// Push an error to every live subscription of `kind`.
    pub fn fail_source(&self, kind: SourceKind, message: &str) {
        let sinks: Vec<SnapshotSink> = self
            .lock()
            .subscribers
            .iter()
            .filter(|subscriber| subscriber.target.kind() == kind)
            .map(|subscriber| Arc::clone(&subscriber.sink))
            .collect();
        for sink in sinks {
            sink(Err(Error::Backend(message.to_string())));
        }
    }

    fn subscribe(&self, target: Target, sink: SnapshotSink) -> Subscription {
        let (id, initial) = {
            let mut tables = self.lock();
            let id = tables.next_subscriber;
            tables.next_subscriber += 1;
            let initial = if tables.stalled.contains(&target.kind()) {
                None
            } else {
                Some(target.select(&tables.records))
            };
            tables.subscribers.push(Subscriber {
                id,
                target,
                sink: Arc::clone(&sink),
            });
            (id, initial)
        };

        if let Some(records) = initial {
            sink(Ok(records));
        }

        let tables = Arc::downgrade(&self.tables);
        Subscription::new(move || {
            if let Some(tables) = tables.upgrade() {
                lock_tables(&tables)
                    .subscribers
                    .retain(|subscriber| subscriber.id != id);
            }
        })
    }

    async fn checkpoint(&self, operation: Operation) -> Result<()> {
        self.calls.send_modify(|calls| {
            *calls.entry(operation).or_default() += 1;
        });
        let mut holds = self.holds.subscribe();
        let _ = holds
            .wait_for(|held| !held.contains(&operation))
            .await;
        let failure = self.lock().failures.remove(&operation);
        failure.map_or(Ok(()), |message| Err(Error::Backend(message)))
    }

    /// Apply `change` to the tables, then notify subscribers if it succeeded.
    fn write<T>(&self, change: impl FnOnce(&mut Tables) -> Result<T>) -> Result<T> {
        let (value, deliveries) = {
            let mut tables = self.lock();
            let value = change(&mut *tables)?;
            let deliveries = tables.deliveries();
            (value, deliveries)
        };
        deliver(deliveries);
        Ok(value)
    }
}

fn deliver(deliveries: Vec<Delivery>) {
    for (sink, records) in deliveries {
        sink(Ok(records));
    }
}

impl RecordBackend for InMemoryBackend {
    fn subscribe_owned(&self, user: &UserId, sink: SnapshotSink) -> Subscription {
        self.subscribe(Target::Owned(user.clone()), sink)
    }

    fn subscribe_shared(&self, user: &UserId, sink: SnapshotSink) -> Subscription {
        self.subscribe(Target::Shared(user.clone()), sink)
    }

    fn subscribe_space(&self, space: &SpaceId, _user: &UserId, sink: SnapshotSink) -> Subscription {
        self.subscribe(Target::Space(space.clone()), sink)
    }

    async fn create(&self, owner: &UserId, input: &NewRecord) -> Result<RecordId> {
        self.checkpoint(Operation::Create).await?;
        let id = RecordId::new();
        let record = Record::from_new(id.clone(), owner.clone(), input, now_ms());
        self.write(|tables| {
            tables.records.push(record);
            Ok(())
        })?;
        Ok(id)
    }

    async fn update(&self, owner: &UserId, id: &RecordId, patch: &RecordPatch) -> Result<()> {
        self.checkpoint(Operation::Update).await?;
        self.write(|tables| {
            patch.apply(tables.record_mut(owner, id)?, now_ms());
            Ok(())
        })
    }

    async fn set_pinned(&self, owner: &UserId, id: &RecordId, pinned: bool) -> Result<()> {
        self.checkpoint(Operation::SetPinned).await?;
        self.write(|tables| {
            let record = tables.record_mut(owner, id)?;
            record.pinned = pinned;
            record.updated_at = now_ms();
            Ok(())
        })
    }

    async fn set_archived(&self, owner: &UserId, id: &RecordId, archived: bool) -> Result<()> {
        self.checkpoint(Operation::SetArchived).await?;
        self.write(|tables| {
            let record = tables.record_mut(owner, id)?;
            record.archived = archived;
            record.updated_at = now_ms();
            Ok(())
        })
    }

    async fn soft_delete(&self, owner: &UserId, id: &RecordId) -> Result<()> {
        self.checkpoint(Operation::SoftDelete).await?;
        self.write(|tables| {
            tables.record_mut(owner, id)?.deleted_at = Some(now_ms());
            Ok(())
        })
    }

    async fn restore(&self, owner: &UserId, id: &RecordId) -> Result<()> {
        self.checkpoint(Operation::Restore).await?;
        self.write(|tables| {
            let record = tables.record_mut(owner, id)?;
            record.deleted_at = None;
            record.updated_at = now_ms();
            Ok(())
        })
    }

    async fn permanently_delete(&self, owner: &UserId, id: &RecordId) -> Result<()> {
        self.checkpoint(Operation::PermanentlyDelete).await?;
        self.write(|tables| {
            tables.record_mut(owner, id)?;
            tables.records.retain(|record| &record.id != id);
            Ok(())
        })
    }

    async fn upload_attachment(
        &self,
        owner: &UserId,
        id: &RecordId,
        file: &LocalFile,
    ) -> Result<AttachmentRef> {
        self.checkpoint(Operation::UploadAttachment).await?;
        let path = format!("{owner}/{id}/{}-{}", uuid::Uuid::now_v7(), file.name);
        self.lock().objects.insert(path.clone(), file.bytes.clone());
        Ok(AttachmentRef {
            url: format!("memory://{path}"),
            path,
            name: file.name.clone(),
            mime_type: file.mime_type.clone(),
            size_bytes: file.size_bytes(),
        })
    }

    async fn delete_attachment(&self, path: &str) -> Result<()> {
        self.checkpoint(Operation::DeleteAttachment).await?;
        self.lock()
            .objects
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(path.to_string()))
    }

    async fn add_attachments(
        &self,
        owner: &UserId,
        id: &RecordId,
        refs: &[AttachmentRef],
    ) -> Result<()> {
        self.checkpoint(Operation::AddAttachments).await?;
        self.write(|tables| {
            let record = tables.record_mut(owner, id)?;
            record
                .attachments
                .extend(refs.iter().cloned().map(Attachment::from_ref));
            record.updated_at = now_ms();
            Ok(())
        })
    }

    async fn remove_attachments(
        &self,
        owner: &UserId,
        id: &RecordId,
        refs: &[AttachmentRef],
    ) -> Result<()> {
        self.checkpoint(Operation::RemoveAttachments).await?;
        self.write(|tables| {
            let record = tables.record_mut(owner, id)?;
            record.attachments.retain(|attachment| {
                attachment
                    .remote_path()
                    .map_or(true, |path| refs.iter().all(|reference| reference.path != path))
            });
            record.updated_at = now_ms();
            Ok(())
        })
    }
}
