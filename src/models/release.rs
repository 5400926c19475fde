use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A published version of a project, e.g. `1.4.0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseVersion {
    pub id: Uuid,
    pub project_id: Uuid,
    /// Unique within the parent project.
    pub version_label: String,
    pub title: Option<String>,
    /// Free-text release notes shown above the grouped entries.
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a release under a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReleaseInput {
    pub version_label: String,
    pub title: Option<String>,
    pub summary: Option<String>,
}

/// Input for updating a release. All fields are optional for partial updates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateReleaseInput {
    pub version_label: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,
}
