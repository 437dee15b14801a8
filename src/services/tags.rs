//! Tag management.
//!
//! Tag names are unique (case-sensitive exact match). Any authenticated user may
//! create, rename, recolor or delete any tag; there is no per-tag owner.

use crate::{
    error::AppError,
    models::{Tag, TagRequest},
    repository::Repository,
};

use super::require_text;

const NAME_MAX: usize = 50;

fn not_found() -> AppError {
    AppError::NotFound("Tag not found".to_string())
}

fn name_taken(name: &str) -> AppError {
    AppError::Conflict(format!("Tag '{name}' already exists"))
}

/// Rewords a conflict raised by the unique index so it names the tag.
fn conflict_names_tag(err: sqlx::Error, name: &str) -> AppError {
    match AppError::from(err) {
        AppError::Conflict(_) => name_taken(name),
        other => other,
    }
}

/// Accepts `#RRGGBB` hex colors only.
pub fn is_valid_color(color: &str) -> bool {
    color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit())
}

fn validate(req: &TagRequest) -> Result<(), AppError> {
    require_text("name", &req.name, NAME_MAX)?;
    if !is_valid_color(&req.color) {
        return Err(AppError::BadRequest(
            "color must be a hex value like #3B82F6".to_string(),
        ));
    }
    Ok(())
}

pub async fn list(repo: &dyn Repository) -> Result<Vec<Tag>, AppError> {
    Ok(repo.list_tags().await?)
}

pub async fn get(repo: &dyn Repository, id: i64) -> Result<Tag, AppError> {
    repo.get_tag(id).await?.ok_or_else(not_found)
}

/// create
///
/// Fails with `Conflict` if a tag with exactly this name exists.
pub async fn create(repo: &dyn Repository, req: TagRequest) -> Result<Tag, AppError> {
    validate(&req)?;
    if repo.get_tag_by_name(&req.name).await?.is_some() {
        return Err(name_taken(&req.name));
    }

    let tag = repo
        .create_tag(&req.name, &req.color)
        .await
        .map_err(|e| conflict_names_tag(e, &req.name))?;
    tracing::info!(tag_id = tag.id, name = %tag.name, "tag created");
    Ok(tag)
}

/// update
///
/// Uniqueness is re-checked only when the name actually changes. Both name and
/// color are then overwritten.
pub async fn update(repo: &dyn Repository, id: i64, req: TagRequest) -> Result<Tag, AppError> {
    let current = get(repo, id).await?;
    validate(&req)?;

    if req.name != current.name && repo.get_tag_by_name(&req.name).await?.is_some() {
        return Err(name_taken(&req.name));
    }

    let tag = repo
        .update_tag(id, &req.name, &req.color)
        .await
        .map_err(|e| conflict_names_tag(e, &req.name))?
        .ok_or_else(not_found)?;
    tracing::info!(tag_id = id, name = %tag.name, "tag updated");
    Ok(tag)
}

/// delete
///
/// Removes the tag and detaches it from every article.
pub async fn delete(repo: &dyn Repository, id: i64) -> Result<(), AppError> {
    get(repo, id).await?;
    if !repo.delete_tag(id).await? {
        return Err(not_found());
    }
    tracing::info!(tag_id = id, "tag deleted");
    Ok(())
}
