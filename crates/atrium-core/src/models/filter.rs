//! Filter and sort state for record projections

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::record::{Record, RecordKind};

/// Which timestamp the date-range filter and date sorts read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DateField {
    CreatedAt,
    #[default]
    UpdatedAt,
    RecordDate,
}

impl DateField {
    /// Value of this field on `record`; records without a record date yield `None`
    #[must_use]
    pub const fn value(self, record: &Record) -> Option<i64> {
        match self {
            Self::CreatedAt => Some(record.created_at),
            Self::UpdatedAt => Some(record.updated_at),
            Self::RecordDate => record.record_date,
        }
    }
}

/// Inclusive timestamp bounds (Unix ms); an open side is unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct DateRange {
    #[serde(default)]
    pub start: Option<i64>,
    #[serde(default)]
    pub end: Option<i64>,
}

impl DateRange {
    #[must_use]
    pub fn contains(&self, timestamp: i64) -> bool {
        self.start.map_or(true, |start| timestamp >= start)
            && self.end.map_or(true, |end| timestamp <= end)
    }
}

/// Structured filter stack applied after scope filtering
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct StructuredFilter {
    /// Record matches when it carries any of these labels
    #[serde(default)]
    pub labels: BTreeSet<String>,
    #[serde(default)]
    pub colors: BTreeSet<String>,
    #[serde(default)]
    pub date_range: Option<DateRange>,
    #[serde(default)]
    pub date_field: DateField,
    #[serde(default)]
    pub kind: Option<RecordKind>,
}

impl StructuredFilter {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
            && self.colors.is_empty()
            && self.date_range.is_none()
            && self.kind.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Title,
    CreatedAt,
    #[default]
    UpdatedAt,
    RecordDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

/// Ordering applied to unpinned records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct SortConfig {
    #[serde(default)]
    pub field: SortField,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortConfig {
    #[must_use]
    pub const fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_range_is_inclusive() {
        let range = DateRange {
            start: Some(10),
            end: Some(20),
        };
        assert!(range.contains(10));
        assert!(range.contains(20));
        assert!(!range.contains(9));
        assert!(!range.contains(21));
        assert!(DateRange::default().contains(i64::MIN));
    }

    #[test]
    fn default_sort_is_newest_update_first() {
        let sort = SortConfig::default();
        assert_eq!(sort.field, SortField::UpdatedAt);
        assert_eq!(sort.direction, SortDirection::Descending);
    }

    #[test]
    fn structured_filter_emptiness_ignores_date_field() {
        let filter = StructuredFilter {
            date_field: DateField::RecordDate,
            ..StructuredFilter::default()
        };
        assert!(filter.is_empty());
    }
}
