use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named grouping of related changes within a project (e.g. "Authentication").
///
/// Categories are listed by `sort_order` first and `name` second, which is
/// also the order in which they appear as sections of a release changelog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureCategory {
    pub id: Uuid,
    pub project_id: Uuid,
    /// Unique within the parent project.
    pub name: String,
    pub sort_order: i64,
}

/// Input for creating a feature category under a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFeatureCategoryInput {
    pub name: String,
    /// Display position. Defaults to `0` if not specified.
    #[serde(default)]
    pub sort_order: Option<i64>,
}

/// Input for updating a feature category. All fields are optional for partial updates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateFeatureCategoryInput {
    pub name: Option<String>,
    pub sort_order: Option<i64>,
}
