//! SQLite data-access layer.
//!
//! A single connection is shared behind a mutex. Every public operation takes
//! the lock once and runs all of its statements under it, so existence checks
//! and the write that depends on them cannot interleave with other requests.

mod clock;
mod error;
mod schema;

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::models::*;

use clock::Clock;
pub use error::{DbError, Result};

const PROJECT_COLUMNS: &str = "id, name, description, created_at";
const FEATURE_COLUMNS: &str = "id, project_id, name, sort_order";
const RELEASE_COLUMNS: &str = "id, project_id, version_label, title, summary, created_at";
const ENTRY_COLUMNS: &str =
    "id, release_id, feature_id, change_type, title, details_md, created_at";

struct Store {
    conn: Connection,
    clock: Clock,
}

#[derive(Clone)]
pub struct Database {
    store: Arc<Mutex<Store>>,
}

impl Database {
    /// Open (or create) a database file, creating parent directories as needed.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::from_connection(conn)
    }

    pub fn open_memory() -> anyhow::Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> anyhow::Result<Self> {
        // Cascading deletes rely on this; SQLite defaults it to off per connection
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            store: Arc::new(Mutex::new(Store {
                conn,
                clock: Clock::default(),
            })),
        })
    }

    pub fn migrate(&self) -> anyhow::Result<()> {
        let store = self.lock()?;
        schema::run_migrations(&store.conn)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Store>> {
        self.store.lock().map_err(|_| DbError::LockPoisoned)
    }

    // ============================================================
    // Project operations
    // ============================================================

    pub fn get_all_projects(&self) -> Result<Vec<Project>> {
        let store = self.lock()?;
        let mut stmt = store.conn.prepare(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY name"
        ))?;
        let projects = stmt
            .query_map([], project_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(projects)
    }

    pub fn get_project(&self, id: Uuid) -> Result<Option<Project>> {
        let store = self.lock()?;
        fetch_project(&store.conn, id)
    }

    pub fn create_project(&self, input: CreateProjectInput) -> Result<Project> {
        let mut store = self.lock()?;
        let id = Uuid::new_v4();
        let now = store.clock.now();

        store
            .conn
            .execute(
                "INSERT INTO projects (id, name, description, created_at) VALUES (?, ?, ?, ?)",
                (id.to_string(), &input.name, &input.description, timestamp(now)),
            )
            .map_err(|e| {
                DbError::from(e)
                    .conflict_as(|| format!("Project named '{}' already exists", input.name))
            })?;

        tracing::debug!(project_id = %id, name = %input.name, "Created project");

        Ok(Project {
            id,
            name: input.name,
            description: input.description,
            created_at: now,
        })
    }

    pub fn update_project(&self, id: Uuid, input: UpdateProjectInput) -> Result<Option<Project>> {
        let store = self.lock()?;
        let Some(existing) = fetch_project(&store.conn, id)? else {
            return Ok(None);
        };

        let name = input.name.unwrap_or(existing.name);
        let description = input.description.or(existing.description);

        store
            .conn
            .execute(
                "UPDATE projects SET name = ?, description = ? WHERE id = ?",
                (&name, &description, id.to_string()),
            )
            .map_err(|e| {
                DbError::from(e).conflict_as(|| format!("Project named '{}' already exists", name))
            })?;

        Ok(Some(Project {
            id,
            name,
            description,
            created_at: existing.created_at,
        }))
    }

    /// Delete a project together with its categories, releases and entries.
    pub fn delete_project(&self, id: Uuid) -> Result<bool> {
        let store = self.lock()?;
        let rows = store
            .conn
            .execute("DELETE FROM projects WHERE id = ?", [id.to_string()])?;
        Ok(rows > 0)
    }

    // ============================================================
    // Feature category operations
    // ============================================================

    pub fn get_feature_categories_by_project(
        &self,
        project_id: Uuid,
    ) -> Result<Vec<FeatureCategory>> {
        let store = self.lock()?;
        let mut stmt = store.conn.prepare(&format!(
            "SELECT {FEATURE_COLUMNS} FROM feature_categories
             WHERE project_id = ? ORDER BY sort_order, name"
        ))?;
        let features = stmt
            .query_map([project_id.to_string()], feature_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(features)
    }

    pub fn get_feature_category(&self, id: Uuid) -> Result<Option<FeatureCategory>> {
        let store = self.lock()?;
        fetch_feature(&store.conn, id)
    }

    pub fn create_feature_category(
        &self,
        project_id: Uuid,
        input: CreateFeatureCategoryInput,
    ) -> Result<FeatureCategory> {
        let store = self.lock()?;
        fetch_project(&store.conn, project_id)?.ok_or(DbError::NotFound("Project"))?;

        let id = Uuid::new_v4();
        let sort_order = input.sort_order.unwrap_or(0);

        store
            .conn
            .execute(
                "INSERT INTO feature_categories (id, project_id, name, sort_order)
                 VALUES (?, ?, ?, ?)",
                (id.to_string(), project_id.to_string(), &input.name, sort_order),
            )
            .map_err(|e| {
                DbError::from(e).conflict_as(|| {
                    format!("Feature category '{}' already exists in project", input.name)
                })
            })?;

        Ok(FeatureCategory {
            id,
            project_id,
            name: input.name,
            sort_order,
        })
    }

    pub fn update_feature_category(
        &self,
        id: Uuid,
        input: UpdateFeatureCategoryInput,
    ) -> Result<Option<FeatureCategory>> {
        let store = self.lock()?;
        let Some(existing) = fetch_feature(&store.conn, id)? else {
            return Ok(None);
        };

        let name = input.name.unwrap_or(existing.name);
        let sort_order = input.sort_order.unwrap_or(existing.sort_order);

        store
            .conn
            .execute(
                "UPDATE feature_categories SET name = ?, sort_order = ? WHERE id = ?",
                (&name, sort_order, id.to_string()),
            )
            .map_err(|e| {
                DbError::from(e)
                    .conflict_as(|| format!("Feature category '{}' already exists in project", name))
            })?;

        Ok(Some(FeatureCategory {
            id,
            project_id: existing.project_id,
            name,
            sort_order,
        }))
    }

    /// Delete a feature category and every entry filed under it.
    pub fn delete_feature_category(&self, id: Uuid) -> Result<bool> {
        let store = self.lock()?;
        let rows = store.conn.execute(
            "DELETE FROM feature_categories WHERE id = ?",
            [id.to_string()],
        )?;
        Ok(rows > 0)
    }

    // ============================================================
    // Release operations
    // ============================================================

    /// Releases of a project, newest first.
    pub fn get_releases_by_project(&self, project_id: Uuid) -> Result<Vec<ReleaseVersion>> {
        let store = self.lock()?;
        let mut stmt = store.conn.prepare(&format!(
            "SELECT {RELEASE_COLUMNS} FROM release_versions
             WHERE project_id = ? ORDER BY created_at DESC, rowid DESC"
        ))?;
        let releases = stmt
            .query_map([project_id.to_string()], release_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(releases)
    }

    pub fn get_release(&self, id: Uuid) -> Result<Option<ReleaseVersion>> {
        let store = self.lock()?;
        fetch_release(&store.conn, id)
    }

    pub fn create_release(
        &self,
        project_id: Uuid,
        input: CreateReleaseInput,
    ) -> Result<ReleaseVersion> {
        let mut store = self.lock()?;
        fetch_project(&store.conn, project_id)?.ok_or(DbError::NotFound("Project"))?;

        let id = Uuid::new_v4();
        let now = store.clock.now();

        store
            .conn
            .execute(
                "INSERT INTO release_versions (id, project_id, version_label, title, summary, created_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
                (
                    id.to_string(),
                    project_id.to_string(),
                    &input.version_label,
                    &input.title,
                    &input.summary,
                    timestamp(now),
                ),
            )
            .map_err(|e| {
                DbError::from(e).conflict_as(|| {
                    format!("Release '{}' already exists in project", input.version_label)
                })
            })?;

        tracing::debug!(release_id = %id, %project_id, label = %input.version_label, "Created release");

        Ok(ReleaseVersion {
            id,
            project_id,
            version_label: input.version_label,
            title: input.title,
            summary: input.summary,
            created_at: now,
        })
    }

    pub fn update_release(
        &self,
        id: Uuid,
        input: UpdateReleaseInput,
    ) -> Result<Option<ReleaseVersion>> {
        let store = self.lock()?;
        let Some(existing) = fetch_release(&store.conn, id)? else {
            return Ok(None);
        };

        let version_label = input.version_label.unwrap_or(existing.version_label);
        let title = input.title.or(existing.title);
        let summary = input.summary.or(existing.summary);

        store
            .conn
            .execute(
                "UPDATE release_versions SET version_label = ?, title = ?, summary = ? WHERE id = ?",
                (&version_label, &title, &summary, id.to_string()),
            )
            .map_err(|e| {
                DbError::from(e)
                    .conflict_as(|| format!("Release '{}' already exists in project", version_label))
            })?;

        Ok(Some(ReleaseVersion {
            id,
            project_id: existing.project_id,
            version_label,
            title,
            summary,
            created_at: existing.created_at,
        }))
    }

    /// Delete a release and every entry recorded in it.
    pub fn delete_release(&self, id: Uuid) -> Result<bool> {
        let store = self.lock()?;
        let rows = store
            .conn
            .execute("DELETE FROM release_versions WHERE id = ?", [id.to_string()])?;
        Ok(rows > 0)
    }

    // ============================================================
    // Change entry operations
    // ============================================================

    pub fn get_change_entry(&self, id: Uuid) -> Result<Option<ChangeEntry>> {
        let store = self.lock()?;
        fetch_entry(&store.conn, id)
    }

    /// Entries of a release in insertion order.
    pub fn get_entries_by_release(&self, release_id: Uuid) -> Result<Vec<ChangeEntry>> {
        let store = self.lock()?;
        let mut stmt = store.conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM change_entries
             WHERE release_id = ? ORDER BY created_at, rowid"
        ))?;
        let entries = stmt
            .query_map([release_id.to_string()], entry_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    /// Entries filed under a feature category, across all releases, in insertion order.
    pub fn get_entries_by_feature(&self, feature_id: Uuid) -> Result<Vec<ChangeEntry>> {
        let store = self.lock()?;
        let mut stmt = store.conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM change_entries
             WHERE feature_id = ? ORDER BY created_at, rowid"
        ))?;
        let entries = stmt
            .query_map([feature_id.to_string()], entry_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    /// Record an entry in a release.
    ///
    /// The release and the feature category must both exist and belong to the
    /// same project.
    pub fn create_change_entry(
        &self,
        release_id: Uuid,
        input: CreateChangeEntryInput,
    ) -> Result<ChangeEntry> {
        let mut store = self.lock()?;
        let release = fetch_release(&store.conn, release_id)?.ok_or(DbError::NotFound("Release"))?;
        ensure_feature_in_project(&store.conn, input.feature_id, release.project_id)?;

        let id = Uuid::new_v4();
        let now = store.clock.now();

        store.conn.execute(
            "INSERT INTO change_entries (id, release_id, feature_id, change_type, title, details_md, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                release_id.to_string(),
                input.feature_id.to_string(),
                input.change_type.as_str(),
                &input.title,
                &input.details_md,
                timestamp(now),
            ),
        )?;

        Ok(ChangeEntry {
            id,
            release_id,
            feature_id: input.feature_id,
            change_type: input.change_type,
            title: input.title,
            details_md: input.details_md,
            created_at: now,
        })
    }

    pub fn update_change_entry(
        &self,
        id: Uuid,
        input: UpdateChangeEntryInput,
    ) -> Result<Option<ChangeEntry>> {
        let store = self.lock()?;
        let Some(existing) = fetch_entry(&store.conn, id)? else {
            return Ok(None);
        };

        let feature_id = match input.feature_id {
            Some(feature_id) if feature_id != existing.feature_id => {
                let release = fetch_release(&store.conn, existing.release_id)?
                    .ok_or(DbError::NotFound("Release"))?;
                ensure_feature_in_project(&store.conn, feature_id, release.project_id)?;
                feature_id
            }
            _ => existing.feature_id,
        };
        let change_type = input.change_type.unwrap_or(existing.change_type);
        let title = input.title.unwrap_or(existing.title);
        let details_md = input.details_md.or(existing.details_md);

        store.conn.execute(
            "UPDATE change_entries SET feature_id = ?, change_type = ?, title = ?, details_md = ?
             WHERE id = ?",
            (
                feature_id.to_string(),
                change_type.as_str(),
                &title,
                &details_md,
                id.to_string(),
            ),
        )?;

        Ok(Some(ChangeEntry {
            id,
            release_id: existing.release_id,
            feature_id,
            change_type,
            title,
            details_md,
            created_at: existing.created_at,
        }))
    }

    pub fn delete_change_entry(&self, id: Uuid) -> Result<bool> {
        let store = self.lock()?;
        let rows = store
            .conn
            .execute("DELETE FROM change_entries WHERE id = ?", [id.to_string()])?;
        Ok(rows > 0)
    }

    // ============================================================
    // Changelog
    // ============================================================

    /// Build the grouped changelog of a release.
    ///
    /// Sections follow the categories' `sort_order`, then `name`. Categories
    /// without entries in this release are left out.
    pub fn get_release_changelog(&self, release_id: Uuid) -> Result<Option<ReleaseChangelog>> {
        let store = self.lock()?;
        let Some(release) = fetch_release(&store.conn, release_id)? else {
            return Ok(None);
        };

        let mut stmt = store.conn.prepare(
            "SELECT e.id, e.release_id, e.feature_id, e.change_type, e.title, e.details_md, e.created_at,
                    f.id, f.project_id, f.name, f.sort_order
             FROM change_entries e
             JOIN feature_categories f ON f.id = e.feature_id
             WHERE e.release_id = ?
             ORDER BY f.sort_order, f.name, e.created_at, e.rowid",
        )?;

        let rows = stmt
            .query_map([release_id.to_string()], |row| {
                let entry = entry_from_row(row)?;
                let feature = FeatureCategory {
                    id: uuid_column(row, 7)?,
                    project_id: uuid_column(row, 8)?,
                    name: row.get(9)?,
                    sort_order: row.get(10)?,
                };
                Ok((feature, entry))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut sections: Vec<ChangelogSection> = Vec::new();
        for (feature, entry) in rows {
            match sections.last_mut() {
                Some(section) if section.feature.id == feature.id => section.entries.push(entry),
                _ => sections.push(ChangelogSection {
                    feature,
                    entries: vec![entry],
                }),
            }
        }

        Ok(Some(ReleaseChangelog { release, sections }))
    }
}

// ============================================================
// Lookups shared by operations holding the lock
// ============================================================

fn fetch_project(conn: &Connection, id: Uuid) -> Result<Option<Project>> {
    let project = conn
        .query_row(
            &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?"),
            [id.to_string()],
            project_from_row,
        )
        .optional()?;
    Ok(project)
}

fn fetch_feature(conn: &Connection, id: Uuid) -> Result<Option<FeatureCategory>> {
    let feature = conn
        .query_row(
            &format!("SELECT {FEATURE_COLUMNS} FROM feature_categories WHERE id = ?"),
            [id.to_string()],
            feature_from_row,
        )
        .optional()?;
    Ok(feature)
}

fn fetch_release(conn: &Connection, id: Uuid) -> Result<Option<ReleaseVersion>> {
    let release = conn
        .query_row(
            &format!("SELECT {RELEASE_COLUMNS} FROM release_versions WHERE id = ?"),
            [id.to_string()],
            release_from_row,
        )
        .optional()?;
    Ok(release)
}

fn fetch_entry(conn: &Connection, id: Uuid) -> Result<Option<ChangeEntry>> {
    let entry = conn
        .query_row(
            &format!("SELECT {ENTRY_COLUMNS} FROM change_entries WHERE id = ?"),
            [id.to_string()],
            entry_from_row,
        )
        .optional()?;
    Ok(entry)
}

fn ensure_feature_in_project(conn: &Connection, feature_id: Uuid, project_id: Uuid) -> Result<()> {
    let feature = fetch_feature(conn, feature_id)?.ok_or(DbError::NotFound("Feature category"))?;
    if feature.project_id != project_id {
        return Err(DbError::Invalid(
            "Feature category belongs to a different project than the release".to_string(),
        ));
    }
    Ok(())
}

// ============================================================
// Row mapping
// ============================================================

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: uuid_column(row, 0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: datetime_column(row, 3)?,
    })
}

fn feature_from_row(row: &Row<'_>) -> rusqlite::Result<FeatureCategory> {
    Ok(FeatureCategory {
        id: uuid_column(row, 0)?,
        project_id: uuid_column(row, 1)?,
        name: row.get(2)?,
        sort_order: row.get(3)?,
    })
}

fn release_from_row(row: &Row<'_>) -> rusqlite::Result<ReleaseVersion> {
    Ok(ReleaseVersion {
        id: uuid_column(row, 0)?,
        project_id: uuid_column(row, 1)?,
        version_label: row.get(2)?,
        title: row.get(3)?,
        summary: row.get(4)?,
        created_at: datetime_column(row, 5)?,
    })
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<ChangeEntry> {
    let change_type: String = row.get(3)?;
    let change_type = ChangeType::from_str(&change_type).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            Type::Text,
            format!("unknown change type: {change_type}").into(),
        )
    })?;

    Ok(ChangeEntry {
        id: uuid_column(row, 0)?,
        release_id: uuid_column(row, 1)?,
        feature_id: uuid_column(row, 2)?,
        change_type,
        title: row.get(4)?,
        details_md: row.get(5)?,
        created_at: datetime_column(row, 6)?,
    })
}

fn uuid_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn datetime_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Fixed-width UTC form, so text ordering in SQL matches time ordering.
fn timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}
