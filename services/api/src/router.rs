//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the REST API, WebSocket endpoint, and OpenAPI documentation.

use crate::{
    handlers,
    models::{ErrorResponse, Lesson, SubjectSummary},
    state::AppState,
    ws::ws_handler,
};

use axum::{Router, routing::get};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(handlers::list_subjects, handlers::get_lesson),
    components(schemas(SubjectSummary, Lesson, ErrorResponse)),
    tags(
        (name = "Affect Tutor API", description = "Lesson content and the adaptive tutoring socket")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route("/subjects", get(handlers::list_subjects))
        .route(
            "/subjects/{subject}/lessons/{index}",
            get(handlers::get_lesson),
        )
        .route("/ws", get(ws_handler))
        .with_state(app_state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_content_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/subjects"));
        assert!(
            doc.paths
                .paths
                .contains_key("/subjects/{subject}/lessons/{index}")
        );
    }
}
