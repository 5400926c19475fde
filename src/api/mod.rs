mod handlers;

use axum::{
    http::HeaderValue,
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::db::Database;

/// Build the router with permissive CORS.
pub fn create_router(db: Database) -> Router {
    build_router(db, CorsLayer::permissive())
}

/// Build the router, restricting CORS to `origins` when given.
pub fn create_router_with_cors(db: Database, origins: Option<&[String]>) -> Router {
    build_router(db, cors_layer(origins))
}

fn build_router(db: Database, cors: CorsLayer) -> Router {
    let api = Router::new()
        // Projects
        .route(
            "/projects",
            get(handlers::list_projects).post(handlers::create_project),
        )
        .route(
            "/projects/{id}",
            get(handlers::get_project)
                .put(handlers::update_project)
                .delete(handlers::delete_project),
        )
        .route(
            "/projects/{id}/features",
            get(handlers::list_project_features).post(handlers::create_feature),
        )
        .route(
            "/projects/{id}/releases",
            get(handlers::list_project_releases).post(handlers::create_release),
        )
        // Feature categories
        .route(
            "/features/{id}",
            get(handlers::get_feature)
                .put(handlers::update_feature)
                .delete(handlers::delete_feature),
        )
        .route("/features/{id}/entries", get(handlers::list_feature_entries))
        // Releases
        .route(
            "/releases/{id}",
            get(handlers::get_release)
                .put(handlers::update_release)
                .delete(handlers::delete_release),
        )
        .route(
            "/releases/{id}/entries",
            get(handlers::list_release_entries).post(handlers::create_entry),
        )
        .route("/releases/{id}/changelog", get(handlers::get_changelog))
        .route(
            "/releases/{id}/changelog/markdown",
            get(handlers::get_changelog_markdown),
        )
        // Change entries
        .route(
            "/entries/{id}",
            get(handlers::get_entry)
                .put(handlers::update_entry)
                .delete(handlers::delete_entry),
        );

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api/v1", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(db)
}

fn cors_layer(origins: Option<&[String]>) -> CorsLayer {
    let Some(origins) = origins else {
        return CorsLayer::permissive();
    };

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}
