use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// AppError
///
/// The single error type surfaced by services and handlers. Each variant maps to one
/// HTTP status; nothing is retried or recovered internally.
#[derive(Error, Debug)]
pub enum AppError {
    /// Uniqueness violation (username, email, tag name).
    #[error("{0}")]
    Conflict(String),
    /// Missing, malformed, expired, or otherwise unusable credentials.
    #[error("{0}")]
    Unauthorized(String),
    /// Authenticated, but not the owner of the resource.
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("database error: {0}")]
    Database(sqlx::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Message for a unique violation on `constraint`, worded like the pre-insert checks.
/// Names are the Postgres defaults for the `UNIQUE` columns in the schema.
pub fn unique_violation_detail(constraint: Option<&str>) -> String {
    match constraint {
        Some("users_username_key") => "Username already registered",
        Some("users_email_key") => "Email already registered",
        Some("tags_name_key") => "Tag name already exists",
        _ => "Resource already exists",
    }
    .to_string()
}

impl From<sqlx::Error> for AppError {
    /// A unique violation means a concurrent request won the race between our
    /// existence check and the insert, so it surfaces as a conflict.
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return AppError::Conflict(unique_violation_detail(db_err.constraint()));
            }
        }
        AppError::Database(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match &self {
            AppError::Database(_) | AppError::Internal(_) => {
                tracing::error!(error = %self, "request failed");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let mut response = (status, Json(serde_json::json!({ "detail": detail }))).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}
