use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::errors::RepoError;

/// Error half of every handler result. Missing documents answer with a
/// `{message}` body; everything else answers with `{error}`.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            RepoError::Validation(_) | RepoError::InvalidRequest { .. } => ApiError::BadRequest(err.to_string()),
            RepoError::UniqueConstraintViolation { ref fields, .. } => {
                ApiError::Conflict(format!("{} already taken", fields.join(", ")))
            }
            RepoError::Redis(_) | RepoError::Other { .. } => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::NotFound(message) => json!({ "message": message }),
            ApiError::BadRequest(error) | ApiError::Conflict(error) => json!({ "error": error }),
            ApiError::Internal(error) => {
                log::error!("request failed: {error}");
                json!({ "error": error })
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{EntityKind, ValidationError};

    #[test]
    fn repository_errors_map_to_statuses() {
        let cases = [
            (RepoError::not_found(EntityKind::Post, "p1"), StatusCode::NOT_FOUND),
            (
                ValidationError::single("content", "validation.required", "value must not be empty").into(),
                StatusCode::BAD_REQUEST,
            ),
            (
                RepoError::UniqueConstraintViolation {
                    fields: vec!["email".into()],
                    values: vec!["a@b.c".into()],
                    existing_entity_id: "u1".into(),
                },
                StatusCode::CONFLICT,
            ),
            (RepoError::other("boom"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn not_found_keeps_entity_message() {
        let ApiError::NotFound(message) = ApiError::from(RepoError::not_found(EntityKind::Post, "p1")) else {
            panic!("expected not found");
        };
        assert_eq!(message, "Post not found");
    }
}
