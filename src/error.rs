use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Internal(String),
    #[error("{0}")]
    Dependency(String),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) | Self::Dependency(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_error) = error {
            if db_error.code().as_deref() == Some("23505") {
                return Self::Conflict("Duplicate value violates a unique constraint.".to_string());
            }
            if db_error.code().as_deref() == Some("23503") {
                return Self::Conflict("Record is still referenced by other records.".to_string());
            }
        }
        if matches!(error, sqlx::Error::RowNotFound) {
            return Self::NotFound("Record not found.".to_string());
        }
        tracing::error!(db_error = %error, "Database query failed");
        match error {
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
                Self::Dependency("Database operation failed.".to_string())
            }
            _ => Self::Internal("Unexpected database failure.".to_string()),
        }
    }
}
