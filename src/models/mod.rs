//! Domain models for the changelog server.
//!
//! # Core Concepts
//!
//! - [`Project`]: Top-level container for a product's changelog.
//! - [`FeatureCategory`]: Named grouping of related changes within a project.
//! - [`ReleaseVersion`]: A published version of a project.
//! - [`ChangeEntry`]: A single line item, tied to one release and one category.
//!
//! [`ReleaseChangelog`] is a read model that groups a release's entries by
//! category for display.

mod changelog;
mod entry;
mod feature;
mod project;
mod release;

pub use changelog::*;
pub use entry::*;
pub use feature::*;
pub use project::*;
pub use release::*;
