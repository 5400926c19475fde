use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::db::{Database, DbError};
use crate::models::*;
use crate::render::render_changelog_markdown;

type ApiResult<T> = Result<T, (StatusCode, String)>;

// ============================================================
// Error Handling
// ============================================================

/// Translate a data-access error into a response.
///
/// Constraint and lookup failures are the caller's fault and are returned
/// as-is. Anything else is logged server-side and the client only sees a
/// generic message.
fn db_error(e: DbError) -> (StatusCode, String) {
    match e {
        DbError::NotFound(_) => (StatusCode::NOT_FOUND, e.to_string()),
        DbError::Conflict(msg) => {
            tracing::warn!("Conflict: {}", msg);
            (StatusCode::CONFLICT, msg)
        }
        DbError::Invalid(msg) => {
            tracing::warn!("Validation error: {}", msg);
            (StatusCode::BAD_REQUEST, msg)
        }
        DbError::LockPoisoned | DbError::Sqlite(_) => {
            tracing::error!("Internal error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

fn not_found(entity: &str) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, format!("{} not found", entity))
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true }))
}

// ============================================================
// Projects
// ============================================================

pub async fn list_projects(State(db): State<Database>) -> ApiResult<Json<Vec<Project>>> {
    db.get_all_projects().map(Json).map_err(db_error)
}

pub async fn get_project(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Project>> {
    db.get_project(id)
        .map_err(db_error)?
        .map(Json)
        .ok_or_else(|| not_found("Project"))
}

pub async fn create_project(
    State(db): State<Database>,
    Json(input): Json<CreateProjectInput>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    db.create_project(input)
        .map(|p| (StatusCode::CREATED, Json(p)))
        .map_err(db_error)
}

pub async fn update_project(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateProjectInput>,
) -> ApiResult<Json<Project>> {
    db.update_project(id, input)
        .map_err(db_error)?
        .map(Json)
        .ok_or_else(|| not_found("Project"))
}

pub async fn delete_project(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if db.delete_project(id).map_err(db_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Project"))
    }
}

// ============================================================
// Feature categories
// ============================================================

pub async fn list_project_features(
    State(db): State<Database>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<Vec<FeatureCategory>>> {
    // An unknown project is a 404, not an empty list
    db.get_project(project_id)
        .map_err(db_error)?
        .ok_or_else(|| not_found("Project"))?;

    db.get_feature_categories_by_project(project_id)
        .map(Json)
        .map_err(db_error)
}

pub async fn create_feature(
    State(db): State<Database>,
    Path(project_id): Path<Uuid>,
    Json(input): Json<CreateFeatureCategoryInput>,
) -> ApiResult<(StatusCode, Json<FeatureCategory>)> {
    db.create_feature_category(project_id, input)
        .map(|f| (StatusCode::CREATED, Json(f)))
        .map_err(db_error)
}

pub async fn get_feature(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<FeatureCategory>> {
    db.get_feature_category(id)
        .map_err(db_error)?
        .map(Json)
        .ok_or_else(|| not_found("Feature category"))
}

pub async fn update_feature(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateFeatureCategoryInput>,
) -> ApiResult<Json<FeatureCategory>> {
    db.update_feature_category(id, input)
        .map_err(db_error)?
        .map(Json)
        .ok_or_else(|| not_found("Feature category"))
}

pub async fn delete_feature(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if db.delete_feature_category(id).map_err(db_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Feature category"))
    }
}

pub async fn list_feature_entries(
    State(db): State<Database>,
    Path(feature_id): Path<Uuid>,
) -> ApiResult<Json<Vec<ChangeEntry>>> {
    db.get_feature_category(feature_id)
        .map_err(db_error)?
        .ok_or_else(|| not_found("Feature category"))?;

    db.get_entries_by_feature(feature_id)
        .map(Json)
        .map_err(db_error)
}

// ============================================================
// Releases
// ============================================================

pub async fn list_project_releases(
    State(db): State<Database>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<Vec<ReleaseVersion>>> {
    db.get_project(project_id)
        .map_err(db_error)?
        .ok_or_else(|| not_found("Project"))?;

    db.get_releases_by_project(project_id)
        .map(Json)
        .map_err(db_error)
}

pub async fn create_release(
    State(db): State<Database>,
    Path(project_id): Path<Uuid>,
    Json(input): Json<CreateReleaseInput>,
) -> ApiResult<(StatusCode, Json<ReleaseVersion>)> {
    db.create_release(project_id, input)
        .map(|r| (StatusCode::CREATED, Json(r)))
        .map_err(db_error)
}

pub async fn get_release(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ReleaseVersion>> {
    db.get_release(id)
        .map_err(db_error)?
        .map(Json)
        .ok_or_else(|| not_found("Release"))
}

pub async fn update_release(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateReleaseInput>,
) -> ApiResult<Json<ReleaseVersion>> {
    db.update_release(id, input)
        .map_err(db_error)?
        .map(Json)
        .ok_or_else(|| not_found("Release"))
}

pub async fn delete_release(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if db.delete_release(id).map_err(db_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Release"))
    }
}

pub async fn get_changelog(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ReleaseChangelog>> {
    db.get_release_changelog(id)
        .map_err(db_error)?
        .map(Json)
        .ok_or_else(|| not_found("Release"))
}

pub async fn get_changelog_markdown(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let changelog = db
        .get_release_changelog(id)
        .map_err(db_error)?
        .ok_or_else(|| not_found("Release"))?;

    Ok((
        [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
        render_changelog_markdown(&changelog),
    ))
}

// ============================================================
// Change entries
// ============================================================

pub async fn list_release_entries(
    State(db): State<Database>,
    Path(release_id): Path<Uuid>,
) -> ApiResult<Json<Vec<ChangeEntry>>> {
    db.get_release(release_id)
        .map_err(db_error)?
        .ok_or_else(|| not_found("Release"))?;

    db.get_entries_by_release(release_id)
        .map(Json)
        .map_err(db_error)
}

pub async fn create_entry(
    State(db): State<Database>,
    Path(release_id): Path<Uuid>,
    Json(input): Json<CreateChangeEntryInput>,
) -> ApiResult<(StatusCode, Json<ChangeEntry>)> {
    db.create_change_entry(release_id, input)
        .map(|e| (StatusCode::CREATED, Json(e)))
        .map_err(db_error)
}

pub async fn get_entry(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ChangeEntry>> {
    db.get_change_entry(id)
        .map_err(db_error)?
        .map(Json)
        .ok_or_else(|| not_found("Change entry"))
}

pub async fn update_entry(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateChangeEntryInput>,
) -> ApiResult<Json<ChangeEntry>> {
    db.update_change_entry(id, input)
        .map_err(db_error)?
        .map(Json)
        .ok_or_else(|| not_found("Change entry"))
}

pub async fn delete_entry(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if db.delete_change_entry(id).map_err(db_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Change entry"))
    }
}
