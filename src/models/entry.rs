use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single changelog line item.
///
/// Every entry belongs to exactly one release and one feature category of the
/// same project. Removing either parent removes the entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEntry {
    pub id: Uuid,
    pub release_id: Uuid,
    pub feature_id: Uuid,
    pub change_type: ChangeType,
    pub title: String,
    /// Long-form details in markdown.
    pub details_md: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// How an entry changed the product.
///
/// Serialized as `ADDED`, `CHANGED` or `REMOVED`, which is also the stored form.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeType {
    Added,
    Changed,
    Removed,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "ADDED",
            Self::Changed => "CHANGED",
            Self::Removed => "REMOVED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "ADDED" => Some(Self::Added),
            "CHANGED" => Some(Self::Changed),
            "REMOVED" => Some(Self::Removed),
            _ => None,
        }
    }
}

/// Input for adding an entry to a release.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateChangeEntryInput {
    /// Feature category the entry is filed under. Must belong to the release's project.
    pub feature_id: Uuid,
    pub change_type: ChangeType,
    pub title: String,
    pub details_md: Option<String>,
}

/// Input for updating an entry. All fields are optional for partial updates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateChangeEntryInput {
    /// Refile the entry under a different category of the same project.
    pub feature_id: Option<Uuid>,
    pub change_type: Option<ChangeType>,
    pub title: Option<String>,
    pub details_md: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_type_round_trips_through_storage_form() {
        for ty in [ChangeType::Added, ChangeType::Changed, ChangeType::Removed] {
            assert_eq!(ChangeType::from_str(ty.as_str()), Some(ty));
        }
    }

    #[test]
    fn change_type_rejects_unknown_and_lowercase_values() {
        assert_eq!(ChangeType::from_str("FIXED"), None);
        assert_eq!(ChangeType::from_str("added"), None);
    }

    #[test]
    fn change_type_serializes_in_upper_case() {
        let json = serde_json::to_string(&ChangeType::Removed).unwrap();
        assert_eq!(json, "\"REMOVED\"");

        let parsed: ChangeType = serde_json::from_str("\"CHANGED\"").unwrap();
        assert_eq!(parsed, ChangeType::Changed);
    }
}
