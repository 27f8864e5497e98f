//! Optimistic overlay: records shown before the remote create confirms them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::models::{Attachment, LocalFile, NewRecord, PreviewHandle, Record, RecordId, UserId};

/// Holds local file bytes behind preview handles until they are released.
#[derive(Debug, Default)]
pub struct PreviewRegistry {
    entries: Mutex<HashMap<PreviewHandle, Arc<Vec<u8>>>>,
}

impl PreviewRegistry {
    fn entries(&self) -> MutexGuard<'_, HashMap<PreviewHandle, Arc<Vec<u8>>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Keep a copy of `file`'s bytes and hand out a handle to them.
    pub fn register(&self, file: &LocalFile) -> PreviewHandle {
        let handle = PreviewHandle::new();
        self.entries()
            .insert(handle.clone(), Arc::new(file.bytes.clone()));
        handle
    }

    /// Bytes behind a live handle, for rendering the preview.
    pub fn resolve(&self, handle: &PreviewHandle) -> Option<Arc<Vec<u8>>> {
        self.entries().get(handle).cloned()
    }

    /// Drop the bytes behind `handle`. Returns `false` if it was already gone.
    pub fn release(&self, handle: &PreviewHandle) -> bool {
        self.entries().remove(handle).is_some()
    }

    /// Number of handles not yet released.
    pub fn live_count(&self) -> usize {
        self.entries().len()
    }
}

/// The set of in-flight optimistic records.
///
/// Transitions return a new overlay; the previous value stays valid for
/// anyone still holding it.
#[derive(Debug, Clone, Default)]
pub struct OptimisticOverlay {
    records: Arc<Vec<Record>>,
}

impl OptimisticOverlay {
    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: &RecordId) -> bool {
        self.records.iter().any(|record| &record.id == id)
    }

    #[must_use]
    pub fn with(&self, record: Record) -> Self {
        let mut records = self.records.as_ref().clone();
        records.retain(|existing| existing.id != record.id);
        records.push(record);
        Self {
            records: Arc::new(records),
        }
    }

    #[must_use]
    pub fn without(&self, id: &RecordId) -> Self {
        let records = self
            .records
            .iter()
            .filter(|record| &record.id != id)
            .cloned()
            .collect();
        Self {
            records: Arc::new(records),
        }
    }
}

/// Build the optimistic stand-in for a record about to be created.
///
/// The record gets a temporary identity, the caller's fields, creation
/// defaults and `previews` as its attachments.
#[must_use]
pub fn synthesize(owner: &UserId, input: &NewRecord, previews: Vec<Attachment>, now: i64) -> Record {
    let mut record = Record::from_new(RecordId::temporary(), owner.clone(), input, now);
    record.attachments = previews;
    record
}

/// Register a preview for each file; returns the attachments and their handles.
pub fn register_previews(
    registry: &PreviewRegistry,
    files: &[LocalFile],
) -> (Vec<Attachment>, Vec<PreviewHandle>) {
    files
        .iter()
        .map(|file| {
            let handle = registry.register(file);
            (Attachment::local_preview(file, handle.clone()), handle)
        })
        .unzip()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RecordKind, DEFAULT_COLOR};

    fn file(name: &str) -> LocalFile {
        LocalFile::new(name, "image/png", vec![0xAB; 4]).unwrap()
    }

    #[test]
    fn registry_tracks_live_handles() {
        let registry = PreviewRegistry::default();
        let handle = registry.register(&file("a.png"));
        assert_eq!(registry.live_count(), 1);
        assert_eq!(registry.resolve(&handle).unwrap().len(), 4);

        assert!(registry.release(&handle));
        assert!(!registry.release(&handle));
        assert_eq!(registry.live_count(), 0);
        assert!(registry.resolve(&handle).is_none());
    }

    #[test]
    fn synthesized_record_is_temporary_with_defaults() {
        let registry = PreviewRegistry::default();
        let (previews, handles) = register_previews(&registry, &[file("a.png"), file("b.png")]);
        let record = synthesize(&UserId::from("alice"), &NewRecord::new("Trip"), previews, 42);

        assert!(record.id.is_temporary());
        assert_eq!(record.owner_id.as_str(), "alice");
        assert_eq!(record.color, DEFAULT_COLOR);
        assert_eq!(record.kind, RecordKind::Text);
        assert!(record.checklist.is_empty());
        assert_eq!((record.created_at, record.updated_at), (42, 42));
        assert_eq!(record.attachments.len(), 2);
        assert!(record.attachments.iter().all(Attachment::is_local_preview));
        assert_eq!(handles.len(), 2);
        assert_eq!(registry.live_count(), 2);
    }

    #[test]
    fn overlay_transitions_leave_previous_value_intact() {
        let record = synthesize(&UserId::from("u"), &NewRecord::new("x"), Vec::new(), 1);
        let empty = OptimisticOverlay::default();
        let one = empty.with(record.clone());

        assert!(empty.is_empty());
        assert_eq!(one.len(), 1);
        assert!(one.contains(&record.id));

        let none = one.without(&record.id);
        assert!(none.is_empty());
        assert_eq!(one.len(), 1);
    }
}
