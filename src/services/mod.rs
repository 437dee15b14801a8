//! Business rules sitting between the HTTP handlers and the repository.
//!
//! Every function takes the repository as `&dyn Repository` so it can run against
//! Postgres in production and the in-memory store in tests.

pub mod accounts;
pub mod articles;
pub mod tags;

use crate::error::AppError;

/// Rejects blank values and values longer than `max` characters.
pub(crate) fn require_text(field: &str, value: &str, max: usize) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{field} must not be empty")));
    }
    if value.chars().count() > max {
        return Err(AppError::BadRequest(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}
