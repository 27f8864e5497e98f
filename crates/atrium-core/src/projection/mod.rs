//! Aggregation of sources and overlay into the filtered, sorted, paged view.
//!
//! Everything here is a pure function of its input; the store decides when
//! to recompute.

mod pagination;

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};

use serde::Serialize;

use crate::models::{
    priority_rank, Record, RecordId, SortConfig, SortDirection, SortField, SpaceScope,
    StructuredFilter,
};
use crate::sources::SourceSnapshots;

pub use pagination::DisplayWindow;

/// User-controlled view state the projection filters and sorts by
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewQuery {
    pub search: String,
    pub active_label: Option<String>,
    pub filter: StructuredFilter,
    pub sort: SortConfig,
    pub scope: SpaceScope,
}

impl ViewQuery {
    /// Lowercased query when it is long enough to filter by.
    fn search_needle(&self, min_chars: usize) -> Option<String> {
        let trimmed = self.search.trim();
        (trimmed.chars().count() >= min_chars).then(|| trimmed.to_lowercase())
    }

    fn wanted_labels(&self) -> BTreeSet<&str> {
        self.filter
            .labels
            .iter()
            .map(String::as_str)
            .chain(self.active_label.as_deref())
            .collect()
    }
}

/// Everything a projection is derived from
#[derive(Debug, Clone, Copy)]
pub struct ProjectionInput<'a> {
    pub sources: &'a SourceSnapshots,
    pub optimistic: &'a [Record],
    pub pending_deletes: &'a HashSet<RecordId>,
    pub query: &'a ViewQuery,
    pub display_limit: usize,
    pub min_search_chars: usize,
}

/// The derived view handed to consumers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Projection {
    /// Pinned then displayed unpinned
    pub active: Vec<Record>,
    pub pinned: Vec<Record>,
    pub unpinned: Vec<Record>,
    pub displayed_unpinned: Vec<Record>,
    pub trashed: Vec<Record>,
    pub archived: Vec<Record>,
    /// Every non-trashed, non-pending record before filtering
    pub all_active: Vec<Record>,
    pub loading: bool,
    pub has_more: bool,
    /// Filtered active records, pinned and unpinned, before truncation
    pub total_count: usize,
}

/// Merge by identity in source order, then the overlay; later wins, first
/// position is kept.
#[must_use]
pub fn merge(sources: &SourceSnapshots, optimistic: &[Record]) -> Vec<Record> {
    let mut merged: Vec<Record> = Vec::new();
    let mut positions: HashMap<RecordId, usize> = HashMap::new();
    for record in sources.iter_merge_order().chain(optimistic) {
        match positions.get(&record.id) {
            Some(&position) => merged[position] = record.clone(),
            None => {
                positions.insert(record.id.clone(), merged.len());
                merged.push(record.clone());
            }
        }
    }
    merged
}

#[must_use]
pub fn project(input: &ProjectionInput<'_>) -> Projection {
    let merged = merge(input.sources, input.optimistic);
    let (mut trashed, all_active): (Vec<Record>, Vec<Record>) =
        merged.into_iter().partition(Record::is_trashed);
    trashed.sort_by(compare_trashed);

    let all_active: Vec<Record> = all_active
        .into_iter()
        .filter(|record| !input.pending_deletes.contains(&record.id))
        .collect();

    let query = input.query;
    let mut archived: Vec<Record> = all_active
        .iter()
        .filter(|record| record.archived && query.scope.contains(record))
        .cloned()
        .collect();
    archived.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

    let needle = query.search_needle(input.min_search_chars);
    let labels = query.wanted_labels();
    let (mut pinned, mut unpinned): (Vec<Record>, Vec<Record>) = all_active
        .iter()
        .filter(|record| !record.archived)
        .filter(|record| query.scope.contains(record))
        .filter(|record| matches_filter(record, &query.filter, &labels))
        .filter(|record| needle.as_deref().map_or(true, |needle| record.matches_text(needle)))
        .cloned()
        .partition(|record| record.pinned);

    pinned.sort_by(compare_pinned);
    unpinned.sort_by(|a, b| compare_by_sort(a, b, query.sort));

    let total_count = pinned.len() + unpinned.len();
    let has_more = unpinned.len() > input.display_limit;
    let displayed_unpinned: Vec<Record> = unpinned
        .iter()
        .take(input.display_limit)
        .cloned()
        .collect();
    let active = pinned
        .iter()
        .chain(&displayed_unpinned)
        .cloned()
        .collect();

    Projection {
        active,
        pinned,
        unpinned,
        displayed_unpinned,
        trashed,
        archived,
        all_active,
        loading: input.sources.is_loading(),
        has_more,
        total_count,
    }
}

fn matches_filter(record: &Record, filter: &StructuredFilter, labels: &BTreeSet<&str>) -> bool {
    if filter.kind.is_some_and(|kind| record.kind != kind) {
        return false;
    }
    if !labels.is_empty() && !record.labels.iter().any(|label| labels.contains(label.as_str())) {
        return false;
    }
    if !filter.colors.is_empty() && !filter.colors.contains(&record.color) {
        return false;
    }
    match filter.date_range {
        Some(range) => filter
            .date_field
            .value(record)
            .is_some_and(|timestamp| range.contains(timestamp)),
        None => true,
    }
}

fn trash_time(record: &Record) -> i64 {
    record.deleted_at.unwrap_or(record.updated_at)
}

fn compare_trashed(a: &Record, b: &Record) -> Ordering {
    trash_time(b)
        .cmp(&trash_time(a))
        .then_with(|| b.created_at.cmp(&a.created_at))
}

fn compare_pinned(a: &Record, b: &Record) -> Ordering {
    priority_rank(a.priority)
        .cmp(&priority_rank(b.priority))
        .then_with(|| b.updated_at.cmp(&a.updated_at))
        .then_with(|| b.created_at.cmp(&a.created_at))
}

/// Caseless title order with the raw text as tiebreak.
pub fn compare_titles(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

fn compare_by_sort(a: &Record, b: &Record, sort: SortConfig) -> Ordering {
    let ordering = match sort.field {
        SortField::Title => compare_titles(&a.title, &b.title),
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        SortField::RecordDate => {
            // Undated records stay at the end in either direction.
            return match (a.record_date, b.record_date) {
                (Some(x), Some(y)) => directed(x.cmp(&y), sort.direction),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
        }
    };
    directed(ordering, sort.direction)
}

const fn directed(ordering: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Ascending => ordering,
        SortDirection::Descending => ordering.reverse(),
    }
}
