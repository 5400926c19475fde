use serde::{Deserialize, Serialize};

use super::{ChangeEntry, FeatureCategory, ReleaseVersion};

/// A release together with its entries grouped by feature category.
///
/// Only categories with at least one entry in the release produce a section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseChangelog {
    pub release: ReleaseVersion,
    pub sections: Vec<ChangelogSection>,
}

/// The entries of one release filed under one feature category.
///
/// The `feature` fields are flattened into the JSON response, with an additional
/// `entries` array in insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangelogSection {
    #[serde(flatten)]
    pub feature: FeatureCategory,
    pub entries: Vec<ChangeEntry>,
}
