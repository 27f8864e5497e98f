//! Checklist item model

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

use super::record::Priority;

/// Deepest nesting level a checklist item may have.
pub const MAX_INDENT: u8 = 3;

/// A unique identifier for a checklist item, using UUID v7.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChecklistItemId(String);

impl ChecklistItemId {
    /// Create a new unique checklist item ID
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ChecklistItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ChecklistItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChecklistItemId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// One row of a checklist. Nesting is encoded only by `indent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    #[serde(default)]
    pub id: ChecklistItemId,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    /// Nesting level, `0..=MAX_INDENT`
    #[serde(default, deserialize_with = "deserialize_indent")]
    pub indent: u8,
    /// Hides descendants; only meaningful when the item has children
    #[serde(default)]
    pub collapsed: bool,
    #[serde(default)]
    pub priority: Option<Priority>,
    /// Due date (Unix ms)
    #[serde(default)]
    pub due_date: Option<i64>,
}

fn deserialize_indent<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    u8::deserialize(deserializer).map(|indent| indent.min(MAX_INDENT))
}

impl ChecklistItem {
    /// Create a top-level, incomplete item
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: ChecklistItemId::new(),
            text: text.into(),
            completed: false,
            indent: 0,
            collapsed: false,
            priority: None,
            due_date: None,
        }
    }

    /// Set the nesting level, clamped to `MAX_INDENT`
    #[must_use]
    pub fn with_indent(mut self, indent: u8) -> Self {
        self.indent = indent.min(MAX_INDENT);
        self
    }

    #[must_use]
    pub const fn with_completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }

    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    #[must_use]
    pub const fn with_due_date(mut self, due_date: i64) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Copy of this item under a fresh identity
    #[must_use]
    pub fn duplicate(&self) -> Self {
        Self {
            id: ChecklistItemId::new(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_indent_clamps() {
        let item = ChecklistItem::new("deep").with_indent(9);
        assert_eq!(item.indent, MAX_INDENT);
    }

    #[test]
    fn test_duplicate_assigns_new_id() {
        let item = ChecklistItem::new("milk").with_completed(true);
        let copy = item.duplicate();
        assert_ne!(item.id, copy.id);
        assert_eq!(copy.text, "milk");
        assert!(copy.completed);
    }

    #[test]
    fn test_deserialize_defaults_missing_fields() {
        let item: ChecklistItem = serde_json::from_str(r#"{"text":"eggs"}"#).unwrap();
        assert_eq!(item.indent, 0);
        assert!(!item.completed);
        assert!(!item.id.as_str().is_empty());
    }

    #[test]
    fn test_deserialize_clamps_indent() {
        let item: ChecklistItem =
            serde_json::from_str(r#"{"text":"deep","indent":255}"#).unwrap();
        assert_eq!(item.indent, MAX_INDENT);
    }
}
