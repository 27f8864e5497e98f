//! Source subscription set: the Owned, Shared and Space snapshots.
//!
//! Each source keeps its own "delivered at least once" flag and a
//! generation counter. Re-keying a source bumps its generation, so a
//! delivery from a torn-down subscription is recognised and dropped.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::backend::SourceUpdate;
use crate::error::Result;
use crate::models::{Record, RecordId, UserId};

/// Which of the three live subscriptions a snapshot came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Owned,
    Shared,
    Space,
}

impl SourceKind {
    /// Merge order: later kinds overwrite earlier ones.
    pub const ALL: [Self; 3] = [Self::Owned, Self::Shared, Self::Space];

    const fn index(self) -> usize {
        match self {
            Self::Owned => 0,
            Self::Shared => 1,
            Self::Space => 2,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Owned => "owned",
            Self::Shared => "shared",
            Self::Space => "space",
        };
        f.write_str(name)
    }
}

/// Latest snapshot of each source plus its delivery bookkeeping
#[derive(Debug, Clone, Default)]
pub struct SourceSnapshots {
    records: [Arc<Vec<Record>>; 3],
    delivered: [bool; 3],
    generations: [u64; 3],
}

impl SourceSnapshots {
    #[must_use]
    pub fn records(&self, kind: SourceKind) -> &[Record] {
        &self.records[kind.index()]
    }

    #[must_use]
    pub const fn delivered(&self, kind: SourceKind) -> bool {
        self.delivered[kind.index()]
    }

    #[must_use]
    pub const fn generation(&self, kind: SourceKind) -> u64 {
        self.generations[kind.index()]
    }

    /// True until every source has delivered at least once.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.delivered.iter().any(|delivered| !delivered)
    }

    /// Forget a source's data ahead of re-subscribing it.
    ///
    /// Returns the generation the new subscription must deliver under.
    /// Sources that will not be subscribed at all pass `delivered = true`.
    pub fn reset(&mut self, kind: SourceKind, delivered: bool) -> u64 {
        let index = kind.index();
        self.records[index] = Arc::new(Vec::new());
        self.delivered[index] = delivered;
        self.generations[index] += 1;
        self.generations[index]
    }

    /// Apply a delivery. Returns `false` when it belongs to a stale generation.
    ///
    /// Errors keep the previous data but still count as delivered, so a
    /// failing source never holds the whole view in its loading state.
    pub fn accept(&mut self, kind: SourceKind, generation: u64, update: SourceUpdate) -> bool {
        let index = kind.index();
        if self.generations[index] != generation {
            return false;
        }
        match update {
            Ok(records) => {
                tracing::debug!("{kind} source delivered {} records", records.len());
                self.records[index] = Arc::new(records);
            }
            Err(error) => {
                tracing::warn!("{kind} source subscription failed: {error}");
            }
        }
        self.delivered[index] = true;
        true
    }

    /// Records of all three sources, in merge order.
    pub fn iter_merge_order(&self) -> impl Iterator<Item = &Record> {
        SourceKind::ALL
            .into_iter()
            .flat_map(move |kind| self.records(kind).iter())
    }
}

/// Identity → owner lookup over the merged sources.
#[derive(Debug, Clone, Default)]
pub struct OwnerIndex(Arc<HashMap<RecordId, UserId>>);

impl OwnerIndex {
    /// Index the snapshots; later sources win like they do in the merge.
    #[must_use]
    pub fn build(snapshots: &SourceSnapshots) -> Self {
        let owners = snapshots
            .iter_merge_order()
            .map(|record| (record.id.clone(), record.owner_id.clone()))
            .collect();
        Self(Arc::new(owners))
    }

    #[must_use]
    pub fn owner_of(&self, id: &RecordId) -> Option<&UserId> {
        self.0.get(id)
    }

    /// Owner partition a write to `id` must be addressed to.
    #[must_use]
    pub fn resolve(&self, id: &RecordId, fallback: &UserId) -> UserId {
        self.owner_of(id).unwrap_or(fallback).clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Decode a raw JSON snapshot, skipping entries that do not fit the schema.
///
/// Unknown fields on otherwise valid entries are ignored.
pub fn decode_snapshot(payload: &str) -> Result<Vec<Record>> {
    let entries: Vec<serde_json::Value> = serde_json::from_str(payload)?;
    let total = entries.len();
    let records: Vec<Record> = entries
        .into_iter()
        .enumerate()
        .filter_map(
            |(position, entry)| match serde_json::from_value::<Record>(entry) {
                Ok(record) => Some(record),
                Err(error) => {
                    tracing::warn!("Skipping malformed record at position {position}: {error}");
                    None
                }
            },
        )
        .collect();
    if records.len() < total {
        tracing::warn!("Decoded {} of {} snapshot records", records.len(), total);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::models::{NewRecord, MAX_INDENT};

    fn record(id: &str, owner: &str) -> Record {
        Record::from_new(
            RecordId::from(id),
            UserId::from(owner),
            &NewRecord::new(id),
            1,
        )
    }

    #[test]
    fn snapshots_start_loading() {
        let snapshots = SourceSnapshots::default();
        assert!(snapshots.is_loading());
    }

    #[test]
    fn loading_clears_only_after_every_source_delivers() {
        let mut snapshots = SourceSnapshots::default();
        let owned = snapshots.reset(SourceKind::Owned, false);
        let shared = snapshots.reset(SourceKind::Shared, false);
        snapshots.reset(SourceKind::Space, true);

        assert!(snapshots.accept(SourceKind::Owned, owned, Ok(vec![record("a", "u")])));
        assert!(snapshots.is_loading());

        assert!(snapshots.accept(
            SourceKind::Shared,
            shared,
            Err(Error::Backend("permission denied".to_string()))
        ));
        assert!(!snapshots.is_loading());
        assert!(snapshots.records(SourceKind::Shared).is_empty());
    }

    #[test]
    fn errors_keep_previous_snapshot() {
        let mut snapshots = SourceSnapshots::default();
        let generation = snapshots.reset(SourceKind::Owned, false);
        snapshots.accept(SourceKind::Owned, generation, Ok(vec![record("a", "u")]));
        snapshots.accept(
            SourceKind::Owned,
            generation,
            Err(Error::Backend("network".to_string())),
        );
        assert_eq!(snapshots.records(SourceKind::Owned).len(), 1);
    }

    #[test]
    fn stale_generation_is_ignored() {
        let mut snapshots = SourceSnapshots::default();
        let old = snapshots.reset(SourceKind::Space, false);
        let current = snapshots.reset(SourceKind::Space, false);
        assert_ne!(old, current);

        assert!(!snapshots.accept(SourceKind::Space, old, Ok(vec![record("x", "u")])));
        assert!(snapshots.records(SourceKind::Space).is_empty());
        assert!(!snapshots.delivered(SourceKind::Space));
    }

    #[test]
    fn owner_index_prefers_later_sources() {
        let mut snapshots = SourceSnapshots::default();
        let owned = snapshots.reset(SourceKind::Owned, false);
        let space = snapshots.reset(SourceKind::Space, false);
        snapshots.accept(SourceKind::Owned, owned, Ok(vec![record("a", "alice")]));
        snapshots.accept(
            SourceKind::Space,
            space,
            Ok(vec![record("a", "alice"), record("b", "bob")]),
        );

        let index = OwnerIndex::build(&snapshots);
        assert_eq!(index.len(), 2);
        let fallback = UserId::from("me");
        assert_eq!(index.resolve(&RecordId::from("b"), &fallback).as_str(), "bob");
        assert_eq!(index.resolve(&RecordId::from("zzz"), &fallback).as_str(), "me");
    }

    #[test]
    fn decode_snapshot_skips_malformed_entries() {
        let payload = r#"[
            {"id": "r1", "owner_id": "alice", "title": "ok", "created_at": 1, "updated_at": 1, "extra": 5},
            {"id": "r2", "title": "missing owner"},
            {"id": "r3", "owner_id": "bob", "created_at": 2, "updated_at": 3, "priority": "urgent"}
        ]"#;
        let records = decode_snapshot(payload).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id.as_str(), "r1");
    }

    #[test]
    fn decode_snapshot_bounds_checklist_indent() {
        let payload = r#"[
            {"id": "r1", "owner_id": "alice", "created_at": 1, "updated_at": 1,
             "checklist": [{"text": "p", "indent": 255}, {"text": "c", "indent": 4}]}
        ]"#;
        let records = decode_snapshot(payload).unwrap();
        let checklist = &records[0].checklist;
        assert_eq!(checklist[0].indent, MAX_INDENT);
        assert_eq!(checklist[1].indent, MAX_INDENT);
        assert!(crate::hierarchy::children_of(checklist, 0).is_empty());
    }

    #[test]
    fn decode_snapshot_rejects_non_array_payload() {
        assert!(decode_snapshot(r#"{"id": "r1"}"#).is_err());
    }
}
