//! Contract of the remote read/write collaborator.
//!
//! The real transport lives outside this crate. Subscriptions push full
//! collection snapshots into a sink every time anything in the collection
//! changes; writes are plain async calls addressed to an owner partition.

mod memory;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::error::Result;
use crate::models::{
    AttachmentRef, LocalFile, NewRecord, Record, RecordId, RecordPatch, SpaceId, UserId,
};

pub use memory::{InMemoryBackend, Operation};

/// One delivery from a live subscription.
pub type SourceUpdate = Result<Vec<Record>>;

/// Callback receiving every delivery of a subscription.
pub type SnapshotSink = Arc<dyn Fn(SourceUpdate) + Send + Sync>;

/// Live subscription handle; dropping it unsubscribes.
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(unsubscribe: impl FnOnce() + Send + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    /// Handle with nothing to tear down.
    #[must_use]
    pub const fn inert() -> Self {
        Self { unsubscribe: None }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Subscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}

/// Remote collaborator for one collection type (notes, tables, docs).
pub trait RecordBackend: Send + Sync + 'static {
    /// Records owned by `user`.
    fn subscribe_owned(&self, user: &UserId, sink: SnapshotSink) -> Subscription;

    /// Records other users explicitly shared with `user`.
    fn subscribe_shared(&self, user: &UserId, sink: SnapshotSink) -> Subscription;

    /// Records that belong to `space`, as visible to `user`.
    fn subscribe_space(&self, space: &SpaceId, user: &UserId, sink: SnapshotSink)
        -> Subscription;

    fn create(
        &self,
        owner: &UserId,
        input: &NewRecord,
    ) -> impl Future<Output = Result<RecordId>> + Send;

    fn update(
        &self,
        owner: &UserId,
        id: &RecordId,
        patch: &RecordPatch,
    ) -> impl Future<Output = Result<()>> + Send;

    fn set_pinned(
        &self,
        owner: &UserId,
        id: &RecordId,
        pinned: bool,
    ) -> impl Future<Output = Result<()>> + Send;

    fn set_archived(
        &self,
        owner: &UserId,
        id: &RecordId,
        archived: bool,
    ) -> impl Future<Output = Result<()>> + Send;

    fn soft_delete(&self, owner: &UserId, id: &RecordId)
        -> impl Future<Output = Result<()>> + Send;

    fn restore(&self, owner: &UserId, id: &RecordId) -> impl Future<Output = Result<()>> + Send;

    fn permanently_delete(
        &self,
        owner: &UserId,
        id: &RecordId,
    ) -> impl Future<Output = Result<()>> + Send;

    fn upload_attachment(
        &self,
        owner: &UserId,
        id: &RecordId,
        file: &LocalFile,
    ) -> impl Future<Output = Result<AttachmentRef>> + Send;

    fn delete_attachment(&self, path: &str) -> impl Future<Output = Result<()>> + Send;

    fn add_attachments(
        &self,
        owner: &UserId,
        id: &RecordId,
        refs: &[AttachmentRef],
    ) -> impl Future<Output = Result<()>> + Send;

    fn remove_attachments(
        &self,
        owner: &UserId,
        id: &RecordId,
        refs: &[AttachmentRef],
    ) -> impl Future<Output = Result<()>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn dropping_subscription_runs_unsubscribe_once() {
        let flag = Arc::new(AtomicBool::new(false));
        let observed = Arc::clone(&flag);
        let subscription = Subscription::new(move || {
            assert!(!observed.swap(true, Ordering::SeqCst));
        });
        assert!(format!("{subscription:?}").contains("active: true"));
        drop(subscription);
        assert!(flag.load(Ordering::SeqCst));
    }

    #[test]
    fn inert_subscription_is_inactive() {
        let subscription = Subscription::inert();
        assert!(format!("{subscription:?}").contains("active: false"));
    }
}
