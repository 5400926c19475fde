use axum::http::{header, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::json;
use uuid::Uuid;
use versions::api::{create_router, create_router_with_cors};
use versions::db::Database;
use versions::models::*;

fn setup() -> TestServer {
    let db = Database::open_memory().expect("Failed to create database");
    db.migrate().expect("Failed to migrate");
    let app = create_router(db);
    TestServer::new(app).expect("Failed to create test server")
}

async fn create_test_project(server: &TestServer, name: &str) -> Project {
    server
        .post("/api/v1/projects")
        .json(&CreateProjectInput {
            name: name.to_string(),
            description: None,
        })
        .await
        .json::<Project>()
}

async fn create_test_feature(server: &TestServer, project_id: Uuid, name: &str) -> FeatureCategory {
    server
        .post(&format!("/api/v1/projects/{}/features", project_id))
        .json(&json!({ "name": name }))
        .await
        .json::<FeatureCategory>()
}

async fn create_test_release(server: &TestServer, project_id: Uuid, label: &str) -> ReleaseVersion {
    server
        .post(&format!("/api/v1/projects/{}/releases", project_id))
        .json(&json!({ "version_label": label }))
        .await
        .json::<ReleaseVersion>()
}

async fn create_test_entry(
    server: &TestServer,
    release_id: Uuid,
    feature_id: Uuid,
    change_type: &str,
    title: &str,
) -> ChangeEntry {
    server
        .post(&format!("/api/v1/releases/{}/entries", release_id))
        .json(&json!({
            "feature_id": feature_id,
            "change_type": change_type,
            "title": title,
        }))
        .await
        .json::<ChangeEntry>()
}

mod health {
    use super::*;

    #[tokio::test]
    async fn reports_ok() {
        let server = setup();

        for _ in 0..3 {
            let response = server.get("/health").await;
            response.assert_status_ok();
            response.assert_json(&json!({ "ok": true }));
        }
    }

    #[tokio::test]
    async fn has_no_side_effects() {
        let server = setup();
        server.get("/health").await;

        let projects: Vec<Project> = server.get("/api/v1/projects").await.json();
        assert!(projects.is_empty());
    }
}

mod projects {
    use super::*;

    #[tokio::test]
    async fn creates_and_fetches_a_project() {
        let server = setup();

        let response = server
            .post("/api/v1/projects")
            .json(&json!({ "name": "Atlas", "description": "Launch tooling" }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let project: Project = response.json();
        assert_eq!(project.description, Some("Launch tooling".to_string()));

        let fetched: Project = server
            .get(&format!("/api/v1/projects/{}", project.id))
            .await
            .json();
        assert_eq!(fetched, project);
    }

    #[tokio::test]
    async fn ignores_caller_supplied_id_and_timestamp() {
        let server = setup();
        let supplied_id = Uuid::new_v4();

        let project: Project = server
            .post("/api/v1/projects")
            .json(&json!({
                "id": supplied_id,
                "name": "Sneaky",
                "created_at": "2001-01-01T00:00:00Z",
            }))
            .await
            .json();

        assert_ne!(project.id, supplied_id);
        assert!(project.created_at.timestamp() > 978_307_200);
    }

    #[tokio::test]
    async fn rejects_duplicate_name_with_conflict() {
        let server = setup();
        create_test_project(&server, "Atlas").await;

        let response = server
            .post("/api/v1/projects")
            .json(&json!({ "name": "Atlas" }))
            .await;

        response.assert_status(StatusCode::CONFLICT);
        assert!(response.text().contains("Atlas"));
    }

    #[tokio::test]
    async fn returns_404_for_unknown_project() {
        let server = setup();

        server
            .get(&format!("/api/v1/projects/{}", Uuid::new_v4()))
            .await
            .assert_status_not_found();
        server
            .delete(&format!("/api/v1/projects/{}", Uuid::new_v4()))
            .await
            .assert_status_not_found();
        server
            .get(&format!("/api/v1/projects/{}/features", Uuid::new_v4()))
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn updates_a_project() {
        let server = setup();
        let project = create_test_project(&server, "Old").await;

        let response = server
            .put(&format!("/api/v1/projects/{}", project.id))
            .json(&json!({ "name": "New" }))
            .await;

        response.assert_status_ok();
        let updated: Project = response.json();
        assert_eq!(updated.name, "New");
        assert_eq!(updated.created_at, project.created_at);
    }

    #[tokio::test]
    async fn delete_cascades_to_everything_below() {
        let server = setup();
        let project = create_test_project(&server, "Doomed").await;
        let feature = create_test_feature(&server, project.id, "Auth").await;
        let release = create_test_release(&server, project.id, "1.0.0").await;
        let entry = create_test_entry(&server, release.id, feature.id, "ADDED", "Login").await;

        server
            .delete(&format!("/api/v1/projects/{}", project.id))
            .await
            .assert_status(StatusCode::NO_CONTENT);

        server
            .get(&format!("/api/v1/features/{}", feature.id))
            .await
            .assert_status_not_found();
        server
            .get(&format!("/api/v1/releases/{}", release.id))
            .await
            .assert_status_not_found();
        server
            .get(&format!("/api/v1/entries/{}", entry.id))
            .await
            .assert_status_not_found();
    }
}

mod features {
    use super::*;

    #[tokio::test]
    async fn duplicate_name_conflicts_only_within_a_project() {
        let server = setup();
        let first = create_test_project(&server, "First").await;
        let second = create_test_project(&server, "Second").await;
        create_test_feature(&server, first.id, "Auth").await;

        server
            .post(&format!("/api/v1/projects/{}/features", first.id))
            .json(&json!({ "name": "Auth" }))
            .await
            .assert_status(StatusCode::CONFLICT);

        server
            .post(&format!("/api/v1/projects/{}/features", second.id))
            .json(&json!({ "name": "Auth" }))
            .await
            .assert_status(StatusCode::CREATED);
    }

    #[tokio::test]
    async fn lists_categories_in_sort_order() {
        let server = setup();
        let project = create_test_project(&server, "P").await;

        for (name, order) in [("Billing", 2), ("Auth", 1), ("Search", 0)] {
            server
                .post(&format!("/api/v1/projects/{}/features", project.id))
                .json(&json!({ "name": name, "sort_order": order }))
                .await
                .assert_status(StatusCode::CREATED);
        }

        let features: Vec<FeatureCategory> = server
            .get(&format!("/api/v1/projects/{}/features", project.id))
            .await
            .json();
        let names: Vec<&str> = features.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Search", "Auth", "Billing"]);
    }

    #[tokio::test]
    async fn creating_under_unknown_project_is_404() {
        let server = setup();

        server
            .post(&format!("/api/v1/projects/{}/features", Uuid::new_v4()))
            .json(&json!({ "name": "Orphan" }))
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn delete_removes_only_its_entries() {
        let server = setup();
        let project = create_test_project(&server, "P").await;
        let auth = create_test_feature(&server, project.id, "Auth").await;
        let billing = create_test_feature(&server, project.id, "Billing").await;
        let release = create_test_release(&server, project.id, "1.0.0").await;
        create_test_entry(&server, release.id, auth.id, "ADDED", "Login").await;
        let kept = create_test_entry(&server, release.id, billing.id, "CHANGED", "Invoices").await;

        server
            .delete(&format!("/api/v1/features/{}", auth.id))
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let entries: Vec<ChangeEntry> = server
            .get(&format!("/api/v1/releases/{}/entries", release.id))
            .await
            .json();
        assert_eq!(entries, vec![kept]);
    }

    #[tokio::test]
    async fn lists_entries_of_a_category_across_releases() {
        let server = setup();
        let project = create_test_project(&server, "P").await;
        let auth = create_test_feature(&server, project.id, "Auth").await;
        let v1 = create_test_release(&server, project.id, "1.0.0").await;
        let v2 = create_test_release(&server, project.id, "2.0.0").await;
        let login = create_test_entry(&server, v1.id, auth.id, "ADDED", "Login").await;
        let sso = create_test_entry(&server, v2.id, auth.id, "ADDED", "SSO").await;

        let entries: Vec<ChangeEntry> = server
            .get(&format!("/api/v1/features/{}/entries", auth.id))
            .await
            .json();
        assert_eq!(entries, vec![login, sso]);
    }
}

mod releases {
    use super::*;

    #[tokio::test]
    async fn duplicate_label_conflicts_only_within_a_project() {
        let server = setup();
        let first = create_test_project(&server, "First").await;
        let second = create_test_project(&server, "Second").await;
        create_test_release(&server, first.id, "1.0.0").await;

        server
            .post(&format!("/api/v1/projects/{}/releases", first.id))
            .json(&json!({ "version_label": "1.0.0" }))
            .await
            .assert_status(StatusCode::CONFLICT);

        server
            .post(&format!("/api/v1/projects/{}/releases", second.id))
            .json(&json!({ "version_label": "1.0.0" }))
            .await
            .assert_status(StatusCode::CREATED);
    }

    #[tokio::test]
    async fn rejects_overlong_title() {
        let server = setup();
        let project = create_test_project(&server, "P").await;

        server
            .post(&format!("/api/v1/projects/{}/releases", project.id))
            .json(&json!({ "version_label": "1.0.0", "title": "t".repeat(141) }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn updates_a_release() {
        let server = setup();
        let project = create_test_project(&server, "P").await;
        let release = create_test_release(&server, project.id, "1.0.0").await;

        let updated: ReleaseVersion = server
            .put(&format!("/api/v1/releases/{}", release.id))
            .json(&json!({ "title": "Launch" }))
            .await
            .json();

        assert_eq!(updated.version_label, "1.0.0");
        assert_eq!(updated.title, Some("Launch".to_string()));
    }

    #[tokio::test]
    async fn delete_removes_only_its_entries() {
        let server = setup();
        let project = create_test_project(&server, "P").await;
        let auth = create_test_feature(&server, project.id, "Auth").await;
        let v1 = create_test_release(&server, project.id, "1.0.0").await;
        let v2 = create_test_release(&server, project.id, "2.0.0").await;
        create_test_entry(&server, v1.id, auth.id, "ADDED", "Login").await;
        let kept = create_test_entry(&server, v2.id, auth.id, "REMOVED", "Basic auth").await;

        server
            .delete(&format!("/api/v1/releases/{}", v1.id))
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let entries: Vec<ChangeEntry> = server
            .get(&format!("/api/v1/features/{}/entries", auth.id))
            .await
            .json();
        assert_eq!(entries, vec![kept]);

        let releases: Vec<ReleaseVersion> = server
            .get(&format!("/api/v1/projects/{}/releases", project.id))
            .await
            .json();
        assert_eq!(releases, vec![v2]);
    }
}

mod entries {
    use super::*;

    #[tokio::test]
    async fn creates_an_entry() {
        let server = setup();
        let project = create_test_project(&server, "P").await;
        let feature = create_test_feature(&server, project.id, "Auth").await;
        let release = create_test_release(&server, project.id, "1.0.0").await;

        let response = server
            .post(&format!("/api/v1/releases/{}/entries", release.id))
            .json(&json!({
                "feature_id": feature.id,
                "change_type": "CHANGED",
                "title": "Longer sessions",
                "details_md": "Now *30* days.",
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let entry: ChangeEntry = response.json();
        assert_eq!(entry.change_type, ChangeType::Changed);
        assert_eq!(entry.details_md, Some("Now *30* days.".to_string()));

        let body: serde_json::Value = server
            .get(&format!("/api/v1/entries/{}", entry.id))
            .await
            .json();
        assert_eq!(body["change_type"], "CHANGED");
    }

    #[tokio::test]
    async fn rejects_unknown_change_type() {
        let server = setup();
        let project = create_test_project(&server, "P").await;
        let feature = create_test_feature(&server, project.id, "Auth").await;
        let release = create_test_release(&server, project.id, "1.0.0").await;

        let response = server
            .post(&format!("/api/v1/releases/{}/entries", release.id))
            .json(&json!({
                "feature_id": feature.id,
                "change_type": "FIXED",
                "title": "Typo",
            }))
            .await;

        assert!(response.status_code().is_client_error());
    }

    #[tokio::test]
    async fn rejects_category_from_another_project() {
        let server = setup();
        let project = create_test_project(&server, "P").await;
        let other = create_test_project(&server, "Other").await;
        let foreign = create_test_feature(&server, other.id, "Auth").await;
        let release = create_test_release(&server, project.id, "1.0.0").await;

        server
            .post(&format!("/api/v1/releases/{}/entries", release.id))
            .json(&json!({
                "feature_id": foreign.id,
                "change_type": "ADDED",
                "title": "Cross",
            }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_parents_are_404() {
        let server = setup();
        let project = create_test_project(&server, "P").await;
        let release = create_test_release(&server, project.id, "1.0.0").await;

        server
            .post(&format!("/api/v1/releases/{}/entries", release.id))
            .json(&json!({
                "feature_id": Uuid::new_v4(),
                "change_type": "ADDED",
                "title": "Orphan",
            }))
            .await
            .assert_status_not_found();

        server
            .get(&format!("/api/v1/releases/{}/entries", Uuid::new_v4()))
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn updates_and_deletes_an_entry() {
        let server = setup();
        let project = create_test_project(&server, "P").await;
        let feature = create_test_feature(&server, project.id, "Auth").await;
        let release = create_test_release(&server, project.id, "1.0.0").await;
        let entry = create_test_entry(&server, release.id, feature.id, "ADDED", "Login").await;

        let updated: ChangeEntry = server
            .put(&format!("/api/v1/entries/{}", entry.id))
            .json(&json!({ "title": "Passkey login" }))
            .await
            .json();
        assert_eq!(updated.title, "Passkey login");
        assert_eq!(updated.change_type, ChangeType::Added);

        server
            .delete(&format!("/api/v1/entries/{}", entry.id))
            .await
            .assert_status(StatusCode::NO_CONTENT);
        server
            .get(&format!("/api/v1/entries/{}", entry.id))
            .await
            .assert_status_not_found();
    }
}

mod changelog {
    use super::*;

    #[tokio::test]
    async fn groups_entries_by_category() {
        let server = setup();
        let project = create_test_project(&server, "P").await;
        let auth = create_test_feature(&server, project.id, "Auth").await;
        let billing = create_test_feature(&server, project.id, "Billing").await;
        create_test_feature(&server, project.id, "Empty").await;
        let release = create_test_release(&server, project.id, "1.0.0").await;
        create_test_entry(&server, release.id, billing.id, "ADDED", "Invoices").await;
        create_test_entry(&server, release.id, auth.id, "ADDED", "Login").await;

        let response = server
            .get(&format!("/api/v1/releases/{}/changelog", release.id))
            .await;
        response.assert_status_ok();

        let changelog: ReleaseChangelog = response.json();
        assert_eq!(changelog.release.id, release.id);
        let names: Vec<&str> = changelog
            .sections
            .iter()
            .map(|s| s.feature.name.as_str())
            .collect();
        assert_eq!(names, vec!["Auth", "Billing"]);
        assert_eq!(changelog.sections[0].entries[0].title, "Login");
    }

    #[tokio::test]
    async fn renders_markdown() {
        let server = setup();
        let project = create_test_project(&server, "P").await;
        let auth = create_test_feature(&server, project.id, "Auth").await;
        let release: ReleaseVersion = server
            .post(&format!("/api/v1/projects/{}/releases", project.id))
            .json(&json!({ "version_label": "1.0.0", "title": "Launch" }))
            .await
            .json();
        create_test_entry(&server, release.id, auth.id, "ADDED", "Login").await;

        let response = server
            .get(&format!("/api/v1/releases/{}/changelog/markdown", release.id))
            .await;

        response.assert_status_ok();
        assert_eq!(
            response.header(header::CONTENT_TYPE),
            "text/markdown; charset=utf-8"
        );
        assert_eq!(
            response.text(),
            "## 1.0.0 - Launch\n\n### Auth\n\n- **ADDED** Login\n"
        );
    }

    #[tokio::test]
    async fn unknown_release_is_404() {
        let server = setup();

        server
            .get(&format!("/api/v1/releases/{}/changelog", Uuid::new_v4()))
            .await
            .assert_status_not_found();
        server
            .get(&format!("/api/v1/releases/{}/changelog/markdown", Uuid::new_v4()))
            .await
            .assert_status_not_found();
    }
}

mod cors {
    use super::*;

    #[tokio::test]
    async fn restricted_router_still_serves_requests() {
        let db = Database::open_memory().expect("Failed to create database");
        db.migrate().expect("Failed to migrate");
        let origins = vec!["https://changelog.example".to_string()];
        let server = TestServer::new(create_router_with_cors(db, Some(origins.as_slice())))
            .expect("Failed to create test server");

        let response = server
            .get("/health")
            .add_header(header::ORIGIN, HeaderValue::from_static("https://changelog.example"))
            .await;

        response.assert_status_ok();
        assert_eq!(
            response.header(header::ACCESS_CONTROL_ALLOW_ORIGIN),
            "https://changelog.example"
        );
    }
}
