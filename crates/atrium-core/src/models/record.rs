//! Record model (notes, tables and docs share one shape)

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

use super::attachment::{Attachment, LocalFile};
use super::checklist::ChecklistItem;
use super::space::SpaceId;

/// Color tag given to records created without one
pub const DEFAULT_COLOR: &str = "default";

const TEMPORARY_PREFIX: &str = "temp-";

/// Identity of a record: remote-assigned, or a `temp-` id for optimistic records
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Create a new remote-style record ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Create a temporary ID for a record that only exists locally
    #[must_use]
    pub fn temporary() -> Self {
        Self(format!("{TEMPORARY_PREFIX}{}", Uuid::now_v7()))
    }

    #[must_use]
    pub fn is_temporary(&self) -> bool {
        self.0.starts_with(TEMPORARY_PREFIX)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Identity of a user (owner, sharee or the signed-in account)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// What the record's content is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    #[default]
    Text,
    Checklist,
    Spreadsheet,
}

/// Priority level shared by records and checklist items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Sort rank, lower sorts first
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
        }
    }
}

/// Sort rank of an optional priority; no priority ranks last (4).
#[must_use]
pub fn priority_rank(priority: Option<Priority>) -> u8 {
    priority.map_or(4, Priority::rank)
}

/// A record as delivered by a source subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub owner_id: UserId,
    /// `None` or the personal sentinel means the personal scope
    #[serde(default)]
    pub space_id: Option<SpaceId>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub kind: RecordKind,
    #[serde(default)]
    pub checklist: Vec<ChecklistItem>,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub labels: BTreeSet<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
    /// Record-specific date (Unix ms), e.g. a calendar or journal day
    #[serde(default)]
    pub record_date: Option<i64>,
    /// Soft delete timestamp (Unix ms)
    #[serde(default)]
    pub deleted_at: Option<i64>,
    /// Users the record is explicitly shared with
    #[serde(default)]
    pub shared_with: Vec<UserId>,
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

impl Record {
    /// Build a record from creation input, as the write side stores it.
    #[must_use]
    pub fn from_new(id: RecordId, owner_id: UserId, input: &NewRecord, now: i64) -> Self {
        Self {
            id,
            owner_id,
            space_id: input.space_id.clone(),
            title: input.title.clone(),
            body: input.body.clone(),
            kind: input.kind,
            checklist: input.checklist.clone(),
            color: input
                .color
                .clone()
                .unwrap_or_else(default_color),
            pinned: input.pinned,
            archived: false,
            priority: input.priority,
            labels: input.labels.clone(),
            attachments: Vec::new(),
            created_at: now,
            updated_at: now,
            record_date: input.record_date,
            deleted_at: None,
            shared_with: input.shared_with.clone(),
        }
    }

    #[must_use]
    pub const fn is_trashed(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Case-insensitive substring match over title, body and checklist text.
    ///
    /// `needle` must already be lowercase.
    #[must_use]
    pub fn matches_text(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.body.to_lowercase().contains(needle)
            || self
                .checklist
                .iter()
                .any(|item| item.text.to_lowercase().contains(needle))
    }

    /// Creation input for a copy of this record
    #[must_use]
    pub fn duplicate_input(&self) -> NewRecord {
        NewRecord {
            title: format!("{} (Copy)", self.title),
            body: self.body.clone(),
            kind: self.kind,
            checklist: self.checklist.iter().map(ChecklistItem::duplicate).collect(),
            color: Some(self.color.clone()),
            pinned: self.pinned,
            priority: self.priority,
            labels: self.labels.clone(),
            space_id: self.space_id.clone(),
            record_date: self.record_date,
            shared_with: self.shared_with.clone(),
            files: Vec::new(),
        }
    }
}

/// Input for creating a record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewRecord {
    pub title: String,
    pub body: String,
    pub kind: RecordKind,
    pub checklist: Vec<ChecklistItem>,
    pub color: Option<String>,
    pub pinned: bool,
    pub priority: Option<Priority>,
    pub labels: BTreeSet<String>,
    pub space_id: Option<SpaceId>,
    pub record_date: Option<i64>,
    pub shared_with: Vec<UserId>,
    /// Local files to upload and attach once the record exists
    pub files: Vec<LocalFile>,
}

impl NewRecord {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn with_checklist(mut self, items: Vec<ChecklistItem>) -> Self {
        self.kind = RecordKind::Checklist;
        self.checklist = items;
        self
    }

    #[must_use]
    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn in_space(mut self, space_id: SpaceId) -> Self {
        self.space_id = Some(space_id);
        self
    }

    #[must_use]
    pub fn with_files(mut self, files: Vec<LocalFile>) -> Self {
        self.files = files;
        self
    }

    /// Separate the files to upload from the fields sent to the create call
    #[must_use]
    pub fn split_files(mut self) -> (Self, Vec<LocalFile>) {
        let files = std::mem::take(&mut self.files);
        (self, files)
    }
}

/// Partial update of a record; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<RecordKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checklist: Option<Vec<ChecklistItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeSet<String>>,
    /// `Some(None)` clears the priority
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_clearable"
    )]
    pub priority: Option<Option<Priority>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_clearable"
    )]
    pub record_date: Option<Option<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_with: Option<Vec<UserId>>,
}

/// A present field, `null` included, is a change; an absent one is not.
fn deserialize_clearable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl RecordPatch {
    #[must_use]
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn checklist(items: Vec<ChecklistItem>) -> Self {
        Self {
            checklist: Some(items),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Apply every set field to `record` and bump its update time.
    pub fn apply(&self, record: &mut Record, now: i64) {
        if let Some(title) = &self.title {
            record.title.clone_from(title);
        }
        if let Some(body) = &self.body {
            record.body.clone_from(body);
        }
        if let Some(kind) = self.kind {
            record.kind = kind;
        }
        if let Some(checklist) = &self.checklist {
            record.checklist.clone_from(checklist);
        }
        if let Some(color) = &self.color {
            record.color.clone_from(color);
        }
        if let Some(labels) = &self.labels {
            record.labels.clone_from(labels);
        }
        if let Some(priority) = self.priority {
            record.priority = priority;
        }
        if let Some(record_date) = self.record_date {
            record.record_date = record_date;
        }
        if let Some(shared_with) = &self.shared_with {
            record.shared_with.clone_from(shared_with);
        }
        record.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Record {
        Record::from_new(
            RecordId::from("r1"),
            UserId::from("alice"),
            &NewRecord::new("Groceries")
                .with_body("Weekly run")
                .with_checklist(vec![ChecklistItem::new("Oat milk")]),
            1_000,
        )
    }

    #[test]
    fn test_temporary_ids_are_prefixed() {
        let id = RecordId::temporary();
        assert!(id.is_temporary());
        assert!(!RecordId::new().is_temporary());
    }

    #[test]
    fn test_priority_rank_orders_none_last() {
        assert_eq!(priority_rank(Some(Priority::High)), 1);
        assert_eq!(priority_rank(Some(Priority::Low)), 3);
        assert_eq!(priority_rank(None), 4);
    }

    #[test]
    fn test_from_new_applies_defaults() {
        let record = sample();
        assert_eq!(record.color, DEFAULT_COLOR);
        assert_eq!(record.created_at, 1_000);
        assert_eq!(record.updated_at, 1_000);
        assert!(!record.archived);
        assert!(!record.is_trashed());
        assert_eq!(record.kind, RecordKind::Checklist);
    }

    #[test]
    fn test_matches_text_checks_checklist_items() {
        let record = sample();
        assert!(record.matches_text("oat"));
        assert!(record.matches_text("weekly"));
        assert!(!record.matches_text("bread"));
    }

    #[test]
    fn test_duplicate_input_suffixes_title_and_renews_items() {
        let record = sample();
        let copy = record.duplicate_input();
        assert_eq!(copy.title, "Groceries (Copy)");
        assert_eq!(copy.checklist.len(), 1);
        assert_ne!(copy.checklist[0].id, record.checklist[0].id);
        assert_eq!(copy.checklist[0].text, "Oat milk");
    }

    #[test]
    fn test_patch_apply_sets_only_given_fields() {
        let mut record = sample();
        let patch = RecordPatch {
            priority: Some(Some(Priority::High)),
            ..RecordPatch::title("Errands")
        };
        patch.apply(&mut record, 2_000);
        assert_eq!(record.title, "Errands");
        assert_eq!(record.body, "Weekly run");
        assert_eq!(record.priority, Some(Priority::High));
        assert_eq!(record.updated_at, 2_000);
        assert!(RecordPatch::default().is_empty());
    }

    #[test]
    fn test_record_ignores_unknown_fields() {
        let payload = r#"{
            "id": "r9",
            "owner_id": "bob",
            "title": "Plan",
            "created_at": 1,
            "updated_at": 2,
            "legacy_flag": true
        }"#;
        let record: Record = serde_json::from_str(payload).unwrap();
        assert_eq!(record.id.as_str(), "r9");
        assert_eq!(record.color, DEFAULT_COLOR);
        assert!(record.labels.is_empty());
    }

    #[test]
    fn test_patch_null_clears_field() {
        let patch = RecordPatch {
            priority: Some(None),
            record_date: Some(None),
            ..RecordPatch::default()
        };
        let json = serde_json::to_string(&patch).unwrap();
        assert_eq!(json, r#"{"priority":null,"record_date":null}"#);

        let back: RecordPatch = serde_json::from_str(&json).unwrap();
        assert_eq!(back, patch);

        let untouched: RecordPatch = serde_json::from_str("{}").unwrap();
        assert!(untouched.is_empty());

        let mut record = sample();
        record.priority = Some(Priority::Low);
        record.record_date = Some(5);
        back.apply(&mut record, 3_000);
        assert_eq!(record.priority, None);
        assert_eq!(record.record_date, None);
    }
}
