//! Write entry points of [`RecordStore`].
//!
//! Every mutation except `create` is addressed to the record's effective
//! owner, looked up in the identity index over all three sources and falling
//! back to the signed-in user.

use std::sync::Arc;

use tokio::task::JoinSet;

use super::{Inner, RecordStore};
use crate::backend::RecordBackend;
use crate::error::{Error, Result};
use crate::models::{
    Attachment, AttachmentRef, LocalFile, NewRecord, PreviewHandle, Record, RecordId,
    RecordPatch, UserId,
};
use crate::overlay::{register_previews, synthesize};
use crate::prefs::PreferenceStore;
use crate::projection::merge;
use crate::util::now_ms;

/// Removes an optimistic record and releases its previews when dropped,
/// including when the create future is dropped mid-flight.
struct OptimisticCreate<B, P> {
    inner: Arc<Inner<B, P>>,
    id: RecordId,
    handles: Vec<PreviewHandle>,
}

impl<B, P> Drop for OptimisticCreate<B, P> {
    fn drop(&mut self) {
        for handle in &self.handles {
            self.inner.previews.release(handle);
        }
        let id = &self.id;
        self.inner.transition(|state| {
            if !state.overlay.contains(id) {
                return false;
            }
            state.overlay = state.overlay.without(id);
            true
        });
    }
}

impl<B: RecordBackend, P: PreferenceStore> RecordStore<B, P> {
    fn current_user(&self) -> Result<UserId> {
        self.inner
            .snapshot()
            .user
            .clone()
            .ok_or(Error::Unauthenticated)
    }

    /// Owner partition writes to `id` must go to.
    pub fn effective_owner(&self, id: &RecordId) -> Result<UserId> {
        let user = self.current_user()?;
        Ok(self.inner.snapshot().owners.resolve(id, &user))
    }

    /// Current merged value of `id`, trashed records included.
    pub fn record(&self, id: &RecordId) -> Option<Record> {
        let state = self.inner.snapshot();
        merge(&state.sources, state.overlay.records())
            .into_iter()
            .find(|record| &record.id == id)
    }

    fn require_record(&self, id: &RecordId) -> Result<Record> {
        self.record(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// Create a record, showing it optimistically until the remote confirms.
    ///
    /// Files in `input` are uploaded and attached after the create succeeds.
    pub async fn create(&self, input: NewRecord) -> Result<RecordId> {
        let owner = self.current_user()?;
        let (fields, files) = input.split_files();

        let (previews, handles) = register_previews(&self.inner.previews, &files);
        let optimistic = synthesize(&owner, &fields, previews, now_ms());
        let _cleanup = OptimisticCreate {
            inner: Arc::clone(&self.inner),
            id: optimistic.id.clone(),
            handles,
        };
        self.inner.transition(|state| {
            state.overlay = state.overlay.with(optimistic);
            true
        });

        let id = self.inner.backend.create(&owner, &fields).await?;
        tracing::debug!("Created {id}");
        if !files.is_empty() {
            self.upload_and_attach(&owner, &id, &files).await?;
        }
        Ok(id)
    }

    async fn upload_and_attach(
        &self,
        owner: &UserId,
        id: &RecordId,
        files: &[LocalFile],
    ) -> Result<Vec<AttachmentRef>> {
        let mut refs = Vec::with_capacity(files.len());
        for file in files {
            refs.push(self.inner.backend.upload_attachment(owner, id, file).await?);
        }
        self.inner.backend.add_attachments(owner, id, &refs).await?;
        Ok(refs)
    }

    pub async fn update(&self, id: &RecordId, patch: &RecordPatch) -> Result<()> {
        let owner = self.effective_owner(id)?;
        self.inner.backend.update(&owner, id, patch).await
    }

    /// Copy a record into its owner's partition and space.
    pub async fn duplicate(&self, id: &RecordId) -> Result<RecordId> {
        let owner = self.effective_owner(id)?;
        let source = self.require_record(id)?;
        self.inner
            .backend
            .create(&owner, &source.duplicate_input())
            .await
    }

    pub async fn toggle_pin(&self, id: &RecordId) -> Result<()> {
        let owner = self.effective_owner(id)?;
        let pinned = self.require_record(id)?.pinned;
        self.inner.backend.set_pinned(&owner, id, !pinned).await
    }

    pub async fn toggle_archive(&self, id: &RecordId) -> Result<()> {
        let owner = self.effective_owner(id)?;
        let archived = self.require_record(id)?.archived;
        self.inner.backend.set_archived(&owner, id, !archived).await
    }

    /// Upload `files` and attach them to an existing record.
    pub async fn attach_files(
        &self,
        id: &RecordId,
        files: &[LocalFile],
    ) -> Result<Vec<AttachmentRef>> {
        let owner = self.effective_owner(id)?;
        if files.is_empty() {
            return Ok(Vec::new());
        }
        self.upload_and_attach(&owner, id, files).await
    }

    /// Delete the stored object, then detach it from the record.
    pub async fn remove_attachment(&self, id: &RecordId, attachment: &Attachment) -> Result<()> {
        let owner = self.effective_owner(id)?;
        let Some(reference) = attachment.to_ref() else {
            return Err(Error::InvalidInput(format!(
                "attachment {} has not been uploaded",
                attachment.name
            )));
        };
        self.inner.backend.delete_attachment(&reference.path).await?;
        self.inner
            .backend
            .remove_attachments(&owner, id, std::slice::from_ref(&reference))
            .await
    }

    /// Move a record to trash. It disappears immediately and comes back if
    /// the remote call fails.
    pub async fn delete(&self, id: &RecordId) -> Result<()> {
        let owner = self.effective_owner(id)?;
        self.inner.transition(|state| state.pending_deletes.insert(id.clone()));

        match self.inner.backend.soft_delete(&owner, id).await {
            Ok(()) => {
                self.inner.transition(|state| {
                    let before = state.pending_deletes.len();
                    state.prune_pending_deletes();
                    state.pending_deletes.len() != before
                });
                Ok(())
            }
            Err(error) => {
                tracing::warn!("Delete of {id} failed, restoring it: {error}");
                self.inner
                    .transition(|state| state.pending_deletes.remove(id));
                Err(error)
            }
        }
    }

    pub async fn restore(&self, id: &RecordId) -> Result<()> {
        let owner = self.effective_owner(id)?;
        self.inner.backend.restore(&owner, id).await
    }

    pub async fn permanently_delete(&self, id: &RecordId) -> Result<()> {
        let owner = self.effective_owner(id)?;
        self.inner.backend.permanently_delete(&owner, id).await
    }

    /// Permanently delete everything currently in trash.
    ///
    /// Deletes run in parallel and are not atomic. Returns how many records
    /// were removed; if any delete fails the result is a partial failure.
    pub async fn destroy_all_trashed(&self) -> Result<usize> {
        let user = self.current_user()?;
        let owners = self.inner.snapshot().owners.clone();
        let trashed = self.view().trashed.clone();
        let attempted = trashed.len();

        let mut deletes = JoinSet::new();
        for record in trashed {
            let backend = Arc::clone(&self.inner.backend);
            let owner = owners.resolve(&record.id, &user);
            deletes.spawn(async move {
                let result = backend.permanently_delete(&owner, &record.id).await;
                (record.id, result)
            });
        }

        let mut removed = 0;
        let mut failures: Vec<String> = Vec::new();
        while let Some(joined) = deletes.join_next().await {
            match joined {
                Ok((_, Ok(()))) => removed += 1,
                Ok((id, Err(error))) => failures.push(format!("{id}: {error}")),
                Err(error) => failures.push(format!("delete task failed: {error}")),
            }
        }

        if failures.is_empty() {
            tracing::debug!("Emptied trash ({removed} records)");
            return Ok(removed);
        }
        tracing::warn!("Emptying trash failed for {} of {attempted} records", failures.len());
        Err(Error::PartialFailure {
            attempted,
            failures,
        })
    }
}
