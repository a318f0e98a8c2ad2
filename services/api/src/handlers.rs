//! Axum Handlers for the REST API
//!
//! Read-only access to the lesson content, documented with `utoipa` for
//! OpenAPI generation.

use affect_tutor_core::{ContentError, Subject};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::error;

use crate::{
    models::{ErrorResponse, Lesson, SubjectSummary},
    state::AppState,
};

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    InternalServerError(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(ErrorResponse { message })).into_response()
            }
            ApiError::InternalServerError(err) => {
                error!("Internal Server Error: {:?}", err);
                let message = "An internal server error occurred.".to_string();
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse { message }),
                )
                    .into_response()
            }
        }
    }
}

impl From<ContentError> for ApiError {
    fn from(err: ContentError) -> Self {
        match err {
            ContentError::UnknownSubject(_) => Self::NotFound(err.to_string()),
            other => Self::InternalServerError(other.into()),
        }
    }
}

/// List the subjects a learner can choose.
#[utoipa::path(
    get,
    path = "/subjects",
    responses(
        (status = 200, description = "Available subjects", body = [SubjectSummary])
    )
)]
pub async fn list_subjects(State(state): State<Arc<AppState>>) -> Json<Vec<SubjectSummary>> {
    let subjects = Subject::ALL
        .into_iter()
        .map(|subject| SubjectSummary::new(&state.content, subject))
        .collect();
    Json(subjects)
}

/// Get one lesson of a subject. The index wraps around the lesson sequence.
#[utoipa::path(
    get,
    path = "/subjects/{subject}/lessons/{index}",
    responses(
        (status = 200, description = "Lesson text", body = Lesson),
        (status = 404, description = "Unknown subject", body = ErrorResponse)
    ),
    params(
        ("subject" = String, Path, description = "Subject id: os, adsa or java"),
        ("index" = usize, Path, description = "Lesson index, wrapped modulo the lesson count")
    )
)]
pub async fn get_lesson(
    State(state): State<Arc<AppState>>,
    Path((subject, index)): Path<(String, usize)>,
) -> Result<impl IntoResponse, ApiError> {
    let subject = subject.parse::<Subject>()?;
    Ok((StatusCode::OK, Json(Lesson::new(&state.content, subject, index))))
}
