use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::database::is_duplicate_key;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] bson::ser::Error),

    #[error("Password hashing error: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

impl AppError {
    pub fn login_required() -> Self {
        AppError::Unauthorized("Unauthorized: login required")
    }

    pub fn insufficient_role() -> Self {
        AppError::Forbidden("Forbidden: insufficient role")
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            AppError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m.to_string()),
            AppError::Forbidden(m) => (StatusCode::FORBIDDEN, m.to_string()),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::Database(err) if is_duplicate_key(err) => (
                StatusCode::CONFLICT,
                "Duplicate value for a unique field".to_string(),
            ),
            AppError::Database(_)
            | AppError::Session(_)
            | AppError::Serialize(_)
            | AppError::Hash(_) => {
                error!("Internal error: {self}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string())
            }
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    use super::AppError;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::BadRequest("bad".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::login_required().into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::insufficient_role().into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::NotFound("Video").into_response().status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_not_found_message() {
        assert_eq!(AppError::NotFound("Video").to_string(), "Video not found");
    }
}
