//! Article authorization and lifecycle.
//!
//! Every single-article operation runs its checks in a fixed order: the article
//! must exist (`NotFound`), then the actor must be entitled (`Forbidden`), and only
//! then is anything written. Ownership is the only entitlement: the author may do
//! everything, everyone else may only read Published articles.

use std::collections::HashMap;

use crate::{
    auth::AuthUser,
    error::AppError,
    models::{
        Article, ArticleChanges, ArticleListItem, ArticleResponse, ArticleState,
        CreateArticleRequest, Tag, UserResponse,
    },
    repository::{ArticleQuery, Repository},
};

use super::require_text;

const TITLE_MAX: usize = 200;

/// create
///
/// Persists a new Draft article owned by `actor`. Tag ids that match no tag are
/// dropped and duplicates collapse.
pub async fn create(
    repo: &dyn Repository,
    actor: &AuthUser,
    req: CreateArticleRequest,
) -> Result<ArticleResponse, AppError> {
    require_text("title", &req.title, TITLE_MAX)?;

    let tag_ids = dedup_ids(&req.tag_ids);
    let article = repo
        .create_article(actor.id, &req.title, &req.content, &tag_ids)
        .await?;

    tracing::info!(article_id = article.id, author_id = actor.id, "article created");
    single(repo, article).await
}

/// view
///
/// Returns the article to its owner in any state and to everyone else once Published.
pub async fn view(
    repo: &dyn Repository,
    actor: &AuthUser,
    id: i64,
) -> Result<ArticleResponse, AppError> {
    let article = load(repo, id).await?;
    if !article.is_owned_by(actor.id) && !article.state().is_published() {
        return Err(AppError::Forbidden(
            "Not allowed to view this article".to_string(),
        ));
    }
    single(repo, article).await
}

/// update
///
/// Applies only the supplied fields. A supplied tag list replaces the association set
/// wholesale (empty clears it); an absent one leaves tags untouched. Supplying nothing
/// is a no-op.
pub async fn update(
    repo: &dyn Repository,
    actor: &AuthUser,
    id: i64,
    mut changes: ArticleChanges,
) -> Result<ArticleResponse, AppError> {
    let article = load_owned(repo, actor, id, "edit").await?;

    if let Some(title) = &changes.title {
        require_text("title", title, TITLE_MAX)?;
    }
    if changes.is_empty() {
        return single(repo, article).await;
    }

    if let Some(tag_ids) = changes.tag_ids.as_mut() {
        *tag_ids = dedup_ids(tag_ids);
    }

    let updated = repo
        .update_article(id, &changes)
        .await?
        .ok_or_else(not_found)?;

    tracing::info!(
        article_id = id,
        tags_replaced = changes.tag_ids.is_some(),
        "article updated"
    );
    single(repo, updated).await
}

/// delete
///
/// Removes the article and its tag associations.
pub async fn delete(repo: &dyn Repository, actor: &AuthUser, id: i64) -> Result<(), AppError> {
    load_owned(repo, actor, id, "delete").await?;

    if !repo.delete_article(id).await? {
        return Err(not_found());
    }
    tracing::info!(article_id = id, "article deleted");
    Ok(())
}

/// publish
///
/// Moves the article to Published. Publishing a Published article changes nothing.
pub async fn publish(
    repo: &dyn Repository,
    actor: &AuthUser,
    id: i64,
) -> Result<ArticleResponse, AppError> {
    transition(repo, actor, id, ArticleState::Published).await
}

/// unpublish
///
/// Moves the article back to Draft. Unpublishing a Draft changes nothing.
pub async fn unpublish(
    repo: &dyn Repository,
    actor: &AuthUser,
    id: i64,
) -> Result<ArticleResponse, AppError> {
    transition(repo, actor, id, ArticleState::Draft).await
}

/// list_owned
///
/// Every article owned by `actor` in any state, optionally only those carrying `tag_id`.
pub async fn list_owned(
    repo: &dyn Repository,
    actor: &AuthUser,
    tag_id: Option<i64>,
) -> Result<Vec<ArticleListItem>, AppError> {
    let query = ArticleQuery {
        author_id: Some(actor.id),
        published_only: false,
        tag_id,
    };
    list(repo, query).await
}

/// list_public
///
/// Every Published article, optionally only those carrying `tag_id`.
pub async fn list_public(
    repo: &dyn Repository,
    tag_id: Option<i64>,
) -> Result<Vec<ArticleListItem>, AppError> {
    let query = ArticleQuery {
        author_id: None,
        published_only: true,
        tag_id,
    };
    list(repo, query).await
}

// --- Internals ---

fn not_found() -> AppError {
    AppError::NotFound("Article not found".to_string())
}

async fn load(repo: &dyn Repository, id: i64) -> Result<Article, AppError> {
    repo.get_article(id).await?.ok_or_else(not_found)
}

/// Existence check followed by the ownership check.
async fn load_owned(
    repo: &dyn Repository,
    actor: &AuthUser,
    id: i64,
    action: &str,
) -> Result<Article, AppError> {
    let article = load(repo, id).await?;
    if !article.is_owned_by(actor.id) {
        tracing::warn!(article_id = id, actor_id = actor.id, action, "ownership check failed");
        return Err(AppError::Forbidden(format!(
            "Not allowed to {action} this article"
        )));
    }
    Ok(article)
}

async fn transition(
    repo: &dyn Repository,
    actor: &AuthUser,
    id: i64,
    target: ArticleState,
) -> Result<ArticleResponse, AppError> {
    let action = match target {
        ArticleState::Published => "publish",
        ArticleState::Draft => "unpublish",
    };
    let article = load_owned(repo, actor, id, action).await?;

    if article.state() == target {
        return single(repo, article).await;
    }

    let updated = repo
        .set_article_published(id, target.is_published())
        .await?
        .ok_or_else(not_found)?;

    tracing::info!(article_id = id, state = ?target, "article state changed");
    single(repo, updated).await
}

async fn list(
    repo: &dyn Repository,
    query: ArticleQuery,
) -> Result<Vec<ArticleListItem>, AppError> {
    let articles = repo.list_articles(query).await?;
    Ok(with_relations(repo, articles)
        .await?
        .into_iter()
        .map(ArticleListItem::from)
        .collect())
}

async fn single(repo: &dyn Repository, article: Article) -> Result<ArticleResponse, AppError> {
    with_relations(repo, vec![article])
        .await?
        .pop()
        .ok_or_else(not_found)
}

/// Attaches authors and tags to a batch of articles with one query each.
async fn with_relations(
    repo: &dyn Repository,
    articles: Vec<Article>,
) -> Result<Vec<ArticleResponse>, AppError> {
    if articles.is_empty() {
        return Ok(Vec::new());
    }

    let article_ids: Vec<i64> = articles.iter().map(|a| a.id).collect();
    let author_ids = dedup_ids(&articles.iter().map(|a| a.author_id).collect::<Vec<_>>());

    let authors: HashMap<i64, UserResponse> = repo
        .get_users(&author_ids)
        .await?
        .into_iter()
        .map(|user| (user.id, UserResponse::from(user)))
        .collect();

    let mut tags: HashMap<i64, Vec<Tag>> = HashMap::new();
    for row in repo.get_article_tags(&article_ids).await? {
        tags.entry(row.article_id).or_default().push(row.tag);
    }

    articles
        .into_iter()
        .map(|article| {
            let author = authors.get(&article.author_id).cloned().ok_or_else(|| {
                AppError::Internal(format!("author {} of article {} missing", article.author_id, article.id))
            })?;
            let article_tags = tags.remove(&article.id).unwrap_or_default();
            Ok(ArticleResponse::new(article, author, article_tags))
        })
        .collect()
}

/// Removes repeated ids, keeping first occurrences in order.
fn dedup_ids(ids: &[i64]) -> Vec<i64> {
    let mut seen = Vec::with_capacity(ids.len());
    for id in ids {
        if !seen.contains(id) {
            seen.push(*id);
        }
    }
    seen
}
