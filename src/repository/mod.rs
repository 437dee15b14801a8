use crate::models::{Article, ArticleChanges, ArticleTag, NewUser, Tag, User};
use async_trait::async_trait;
use std::sync::Arc;

mod memory;
mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

/// Result type of every persistence call. Errors are surfaced to the caller unchanged.
pub type RepoResult<T> = Result<T, sqlx::Error>;

/// ArticleQuery
///
/// Filters for article listings. All set filters must match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArticleQuery {
    /// Only articles owned by this user.
    pub author_id: Option<i64>,
    /// Only articles in the Published state.
    pub published_only: bool,
    /// Only articles associated with this tag.
    pub tag_id: Option<i64>,
}

/// Repository Trait
///
/// The persistence contract consumed by the services. Lookups are keyed by primary id
/// or by a unique column (username, email, tag name). Multi-row writes run inside a
/// single transaction in every implementation.
///
/// **Send + Sync + async_trait** make `Arc<dyn Repository>` shareable across axum tasks.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Creates the schema if it does not exist yet. Idempotent, run once before serving.
    async fn ensure_schema(&self) -> RepoResult<()>;

    // --- Users ---
    async fn get_user(&self, id: i64) -> RepoResult<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    async fn get_user_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    async fn get_users(&self, ids: &[i64]) -> RepoResult<Vec<User>>;
    async fn create_user(&self, user: NewUser) -> RepoResult<User>;

    // --- Articles ---
    async fn get_article(&self, id: i64) -> RepoResult<Option<Article>>;
    /// Newest first.
    async fn list_articles(&self, query: ArticleQuery) -> RepoResult<Vec<Article>>;
    /// Inserts a Draft article and associates the ids that resolve to existing tags.
    async fn create_article(
        &self,
        author_id: i64,
        title: &str,
        content: &str,
        tag_ids: &[i64],
    ) -> RepoResult<Article>;
    /// Applies `changes` and bumps `updated_at`. A supplied tag list replaces the
    /// association set wholesale. Returns `None` if the article does not exist.
    async fn update_article(&self, id: i64, changes: &ArticleChanges)
    -> RepoResult<Option<Article>>;
    async fn set_article_published(&self, id: i64, is_published: bool)
    -> RepoResult<Option<Article>>;
    /// Removes the article and its tag associations. Returns false if nothing was deleted.
    async fn delete_article(&self, id: i64) -> RepoResult<bool>;
    /// Association rows (joined with their tag) for the given articles, ordered by tag name.
    async fn get_article_tags(&self, article_ids: &[i64]) -> RepoResult<Vec<ArticleTag>>;

    // --- Tags ---
    /// Ordered by name.
    async fn list_tags(&self) -> RepoResult<Vec<Tag>>;
    async fn get_tag(&self, id: i64) -> RepoResult<Option<Tag>>;
    async fn get_tag_by_name(&self, name: &str) -> RepoResult<Option<Tag>>;
    async fn create_tag(&self, name: &str, color: &str) -> RepoResult<Tag>;
    async fn update_tag(&self, id: i64, name: &str, color: &str) -> RepoResult<Option<Tag>>;
    /// Removes the tag and its article associations.
    async fn delete_tag(&self, id: i64) -> RepoResult<bool>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;
