use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::api::state::AppState;

use super::handlers;
use super::middleware::v1_auth_middleware;

pub fn v1_router(state: AppState) -> Router<AppState> {
    let documents = Router::new()
        .route("/", get(handlers::documents::list_documents))
        .route("/{documentId}", get(handlers::documents::get_document));

    let imports = Router::new()
        .route("/google-docs", post(handlers::imports::import_google_docs))
        .route("/notion", post(handlers::imports::import_notion))
        .route("/obsidian", post(handlers::imports::import_obsidian))
        .route("/gmail/validate", post(handlers::imports::validate_gmail));

    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/openapi.json", get(super::openapi::openapi_json))
        .merge(super::openapi::redoc_router());

    let protected_routes = Router::new()
        .nest("/imports", imports)
        .route("/search", post(handlers::search::search))
        .route("/ask", post(handlers::ask::ask))
        .nest("/documents", documents)
        .route_layer(middleware::from_fn_with_state(state, v1_auth_middleware));

    Router::new().merge(public_routes).merge(protected_routes)
}
