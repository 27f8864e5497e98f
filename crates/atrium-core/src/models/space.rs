//! Space scope model

use serde::{Deserialize, Serialize};
use std::fmt;

use super::record::Record;

/// Sentinel space id some writers store for personal records
pub const PERSONAL_SPACE: &str = "personal";

/// Identity of a shared collaboration space
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpaceId(String);

impl SpaceId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_personal(&self) -> bool {
        self.0 == PERSONAL_SPACE
    }
}

impl fmt::Display for SpaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SpaceId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// The scope the user currently has open
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "scope", content = "space_id", rename_all = "snake_case")]
pub enum SpaceScope {
    #[default]
    Personal,
    Space(SpaceId),
}

impl SpaceScope {
    /// Scope for an optional space id; empty or the sentinel maps to personal.
    #[must_use]
    pub fn from_space_id(space_id: Option<&str>) -> Self {
        match space_id.map(str::trim) {
            None | Some("" | PERSONAL_SPACE) => Self::Personal,
            Some(id) => Self::Space(SpaceId::from(id)),
        }
    }

    /// Collapse a `Space` naming the personal sentinel (or nothing) to `Personal`.
    #[must_use]
    pub fn normalized(self) -> Self {
        match self {
            Self::Space(id) => Self::from_space_id(Some(id.as_str())),
            Self::Personal => Self::Personal,
        }
    }

    /// Named space, `None` for the personal scope
    #[must_use]
    pub const fn space_id(&self) -> Option<&SpaceId> {
        match self {
            Self::Personal => None,
            Self::Space(id) => Some(id),
        }
    }

    /// Whether `record` is visible in this scope
    #[must_use]
    pub fn contains(&self, record: &Record) -> bool {
        match (self, &record.space_id) {
            (Self::Personal, None) => true,
            (Self::Personal, Some(space)) => space.is_personal(),
            (Self::Space(_), None) => false,
            (Self::Space(wanted), Some(space)) => wanted == space,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewRecord, RecordId, UserId};

    fn record_in(space: Option<&str>) -> Record {
        let mut input = NewRecord::new("x");
        input.space_id = space.map(SpaceId::from);
        Record::from_new(RecordId::new(), UserId::from("u"), &input, 1)
    }

    #[test]
    fn personal_scope_accepts_missing_and_sentinel() {
        let scope = SpaceScope::Personal;
        assert!(scope.contains(&record_in(None)));
        assert!(scope.contains(&record_in(Some(PERSONAL_SPACE))));
        assert!(!scope.contains(&record_in(Some("team"))));
    }

    #[test]
    fn named_scope_requires_exact_match() {
        let scope = SpaceScope::Space(SpaceId::from("team"));
        assert!(scope.contains(&record_in(Some("team"))));
        assert!(!scope.contains(&record_in(Some("team-2"))));
        assert!(!scope.contains(&record_in(None)));
    }

    #[test]
    fn from_space_id_normalizes_sentinel() {
        assert_eq!(SpaceScope::from_space_id(None), SpaceScope::Personal);
        assert_eq!(
            SpaceScope::from_space_id(Some(PERSONAL_SPACE)),
            SpaceScope::Personal
        );
        assert_eq!(
            SpaceScope::from_space_id(Some(" team ")),
            SpaceScope::Space(SpaceId::from("team"))
        );
    }

    #[test]
    fn normalized_maps_sentinel_space_to_personal() {
        assert_eq!(
            SpaceScope::Space(SpaceId::from(PERSONAL_SPACE)).normalized(),
            SpaceScope::Personal
        );
        assert_eq!(
            SpaceScope::Space(SpaceId::from(" ")).normalized(),
            SpaceScope::Personal
        );
        let team = SpaceScope::Space(SpaceId::from("team"));
        assert_eq!(team.clone().normalized(), team);
    }
}
